//! Record filter for raw access-log lines
//!
//! This module turns the raw lines of a month into the validated
//! [`LogRecord`]s of one day, and narrows month rollups to a day range.
//!
//! A line is accepted when it has the field count of the active log format,
//! falls on the selected day, requests a media file, and did not fail. Every
//! other line is dropped silently: access logs are noisy and a short or
//! garbled line is not an error.
//!
//! # Examples
//!
//! ```
//! use vodstat::filters::{RecordFilter, distinct_client_ids};
//! use vodstat_core::config::AggregationConfig;
//! use vodstat_core::timezone::TimezoneConfig;
//! use vodstat_core::types::DaySelector;
//!
//! let filter = RecordFilter::new(AggregationConfig::default(), TimezoneConfig::default());
//! let lines = vec![
//!     r#"10.0.0.1 - - [06/Jun/2016:14:23:05 +0200] "GET /vod/video.mp4 HTTP/1.1" 200 1000 1200 "-""#,
//!     r#"10.0.0.1 - - [06/Jun/2016:14:23:09 +0200] "GET /vod/video.mp4 HTTP/1.1" 404 0 120 "-""#,
//!     r#"10.0.0.2 - - [07/Jun/2016:09:00:00 +0200] "GET /vod/video.mp4 HTTP/1.1" 200 1000 1200 "-""#,
//! ];
//!
//! let day = DaySelector::new(2016, 6, 6).unwrap();
//! let accepted = filter.filter_day(day, &lines);
//! assert_eq!(accepted.records.len(), 1);
//! assert_eq!(distinct_client_ids(&accepted.records).len(), 1);
//! ```

use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::{debug, trace, warn};
use vodstat_core::config::AggregationConfig;
use vodstat_core::timezone::TimezoneConfig;
use vodstat_core::types::{ClientId, DaySelector, LogRecord};

/// Apache `%t` format without the bracket and zone offset
pub const LOG_TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S";

const CLIENT_FIELD: usize = 0;
const TIMESTAMP_FIELD: usize = 3;
const PATH_FIELD: usize = 6;
const STATUS_FIELD: usize = 8;
const BYTES_FIELD: usize = 10;

/// Records accepted for one day
#[derive(Debug, Clone, Default)]
pub struct DayRecords {
    /// Accepted records in file order
    pub records: Vec<LogRecord>,
    /// Lines dropped only because their timestamp was unusable
    pub skipped_timestamps: usize,
}

/// Why a line was not turned into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    FieldCount,
    OtherDay,
    NotMedia,
    ExcludedStatus,
    Malformed,
    Timestamp,
}

/// Selects the trackable records of a day
#[derive(Debug, Clone)]
pub struct RecordFilter {
    config: AggregationConfig,
    timezone: TimezoneConfig,
}

impl RecordFilter {
    pub fn new(config: AggregationConfig, timezone: TimezoneConfig) -> Self {
        Self { config, timezone }
    }

    pub fn timezone(&self) -> &TimezoneConfig {
        &self.timezone
    }

    /// Accepted records of `day`, in the order the lines were given
    ///
    /// Lines with an unparseable timestamp are skipped and counted in
    /// [`DayRecords::skipped_timestamps`]; all other rejections are silent.
    pub fn filter_day<S: AsRef<str>>(&self, day: DaySelector, lines: &[S]) -> DayRecords {
        let day_prefix = format!("{}:", day.date_token());
        let mut accepted = DayRecords::default();

        for line in lines {
            match self.parse_line(line.as_ref(), &day_prefix) {
                Ok(record) => accepted.records.push(record),
                Err(Rejection::Timestamp) => {
                    warn!("Skipping line with unusable timestamp: {}", line.as_ref());
                    accepted.skipped_timestamps += 1;
                }
                Err(reason) => trace!("Dropped line ({:?})", reason),
            }
        }

        debug!(
            "Accepted {} of {} lines for {}",
            accepted.records.len(),
            lines.len(),
            day
        );
        accepted
    }

    /// Validate a single line against a `dd/Mon/yyyy:` day prefix
    pub fn parse_line(&self, line: &str, day_prefix: &str) -> Result<LogRecord, Rejection> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != self.config.format.field_count() {
            return Err(Rejection::FieldCount);
        }

        let raw_time = fields[TIMESTAMP_FIELD].trim_start_matches('[');
        if !raw_time.starts_with(day_prefix) {
            return Err(Rejection::OtherDay);
        }

        let path = fields[PATH_FIELD];
        if !path.contains(self.config.media_extension.as_str()) {
            return Err(Rejection::NotMedia);
        }

        let status = fields[STATUS_FIELD]
            .parse::<u16>()
            .map_err(|_| Rejection::Malformed)?;
        if self.config.excluded_statuses.contains(&status) {
            return Err(Rejection::ExcludedStatus);
        }

        let bytes_out = if self.config.format.has_bytes() {
            Some(parse_byte_count(fields[BYTES_FIELD]).ok_or(Rejection::Malformed)?)
        } else {
            None
        };

        let timestamp = NaiveDateTime::parse_from_str(raw_time, LOG_TIMESTAMP_FORMAT)
            .ok()
            .and_then(|local| self.timezone.to_utc(&local))
            .ok_or(Rejection::Timestamp)?;

        Ok(LogRecord {
            client_id: ClientId::new(fields[CLIENT_FIELD]),
            timestamp,
            resource_path: path.to_string(),
            asset: asset_basename(path, &self.config.media_extension).to_string(),
            status,
            bytes_out,
        })
    }
}

/// `%O`/`%b` value, where `-` means nothing was sent
fn parse_byte_count(field: &str) -> Option<u64> {
    if field == "-" {
        Some(0)
    } else {
        field.parse().ok()
    }
}

/// Media asset a request path refers to
///
/// Picks the last path segment containing `extension`, so chunked streaming
/// requests such as `/vod/mp4:video.mp4/media_1.ts` resolve to the video. A
/// `scheme:` prefix and any query string are removed.
///
/// ```
/// use vodstat::filters::asset_basename;
///
/// assert_eq!(asset_basename("/media/2016/video.mp4", "mp4"), "video.mp4");
/// assert_eq!(asset_basename("/vod/mp4:video.mp4/chunk_3.ts", "mp4"), "video.mp4");
/// assert_eq!(asset_basename("/video.mp4?start=30", "mp4"), "video.mp4");
/// ```
pub fn asset_basename<'a>(path: &'a str, extension: &str) -> &'a str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let segment = path
        .rsplit('/')
        .find(|s| s.contains(extension))
        .or_else(|| path.rsplit('/').find(|s| !s.is_empty()))
        .unwrap_or(path);
    segment.rsplit(':').next().unwrap_or(segment)
}

/// Distinct clients of `records` in first-seen order
pub fn distinct_client_ids(records: &[LogRecord]) -> Vec<ClientId> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(&r.client_id))
        .map(|r| r.client_id.clone())
        .collect()
}

/// Day-of-month range for month rollups
///
/// # Example
///
/// ```
/// use vodstat::filters::DayRangeFilter;
/// use vodstat_core::types::DaySelector;
///
/// let filter = DayRangeFilter::new().with_since(5).with_until(20);
/// assert!(filter.matches(&DaySelector::new(2016, 6, 5).unwrap()));
/// assert!(!filter.matches(&DaySelector::new(2016, 6, 21).unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DayRangeFilter {
    /// First day included
    pub since: Option<u32>,
    /// Last day included
    pub until: Option<u32>,
}

impl DayRangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_since(mut self, day: u32) -> Self {
        self.since = Some(day);
        self
    }

    pub fn with_until(mut self, day: u32) -> Self {
        self.until = Some(day);
        self
    }

    pub fn matches(&self, day: &DaySelector) -> bool {
        let d = day.day();
        self.since.is_none_or(|since| d >= since) && self.until.is_none_or(|until| d <= until)
    }

    /// Keep only the days inside the range
    pub fn apply(&self, days: Vec<DaySelector>) -> Vec<DaySelector> {
        days.into_iter().filter(|d| self.matches(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vodstat_core::types::LogFormat;

    fn direct_line(ip: &str, time: &str, path: &str, status: u16, bytes: &str) -> String {
        format!(r#"{ip} - - [{time} +0200] "GET {path} HTTP/1.1" {status} 512 {bytes} "-""#)
    }

    fn estimated_line(ip: &str, time: &str, path: &str, status: u16) -> String {
        format!(r#"{ip} - - [{time} +0200] "GET {path} HTTP/1.1" {status} 512 "-""#)
    }

    fn june_6() -> DaySelector {
        DaySelector::new(2016, 6, 6).unwrap()
    }

    fn filter() -> RecordFilter {
        RecordFilter::new(AggregationConfig::default(), TimezoneConfig::default())
    }

    #[test]
    fn test_accepts_well_formed_media_line() {
        let line = direct_line("10.0.0.1", "06/Jun/2016:14:23:05", "/vod/video.mp4", 206, "4096");
        let day = filter().filter_day(june_6(), &[line]);

        assert_eq!(day.records.len(), 1);
        let record = &day.records[0];
        assert_eq!(record.client_id.as_str(), "10.0.0.1");
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2016, 6, 6, 14, 23, 5).unwrap());
        assert_eq!(record.asset, "video.mp4");
        assert_eq!(record.status, 206);
        assert_eq!(record.bytes_out, Some(4096));
    }

    #[test]
    fn test_rejections() {
        let f = filter();
        let prefix = format!("{}:", june_6().date_token());

        let other_day = direct_line("a", "07/Jun/2016:00:00:00", "/v.mp4", 200, "1");
        assert_eq!(f.parse_line(&other_day, &prefix), Err(Rejection::OtherDay));

        let other_year = direct_line("a", "06/Jun/2015:00:00:00", "/v.mp4", 200, "1");
        assert_eq!(f.parse_line(&other_year, &prefix), Err(Rejection::OtherDay));

        let not_media = direct_line("a", "06/Jun/2016:00:00:00", "/index.html", 200, "1");
        assert_eq!(f.parse_line(&not_media, &prefix), Err(Rejection::NotMedia));

        let not_found = direct_line("a", "06/Jun/2016:00:00:00", "/v.mp4", 404, "1");
        assert_eq!(f.parse_line(&not_found, &prefix), Err(Rejection::ExcludedStatus));

        let bad_bytes = direct_line("a", "06/Jun/2016:00:00:00", "/v.mp4", 200, "lots");
        assert_eq!(f.parse_line(&bad_bytes, &prefix), Err(Rejection::Malformed));

        let short = "a - - [06/Jun/2016:00:00:00 +0200] \"GET /v.mp4\" 200";
        assert_eq!(f.parse_line(short, &prefix), Err(Rejection::FieldCount));
    }

    #[test]
    fn test_dash_bytes_count_as_zero() {
        let line = direct_line("a", "06/Jun/2016:10:00:00", "/v.mp4", 304, "-");
        let day = filter().filter_day(june_6(), &[line]);
        assert_eq!(day.records[0].bytes_out, Some(0));
    }

    #[test]
    fn test_bad_timestamp_is_skipped_and_counted() {
        let line = direct_line("a", "06/Jun/2016:25:61:00", "/v.mp4", 200, "1");
        let good = direct_line("b", "06/Jun/2016:10:00:00", "/v.mp4", 200, "1");
        let day = filter().filter_day(june_6(), &[line, good]);
        assert_eq!(day.records.len(), 1);
        assert_eq!(day.skipped_timestamps, 1);
    }

    #[test]
    fn test_estimated_format_expects_eleven_fields() {
        let config = AggregationConfig::default().with_format(LogFormat::Estimated);
        let f = RecordFilter::new(config, TimezoneConfig::default());

        let eleven = estimated_line("a", "06/Jun/2016:10:00:00", "/v.mp4", 200);
        let twelve = direct_line("a", "06/Jun/2016:10:00:00", "/v.mp4", 200, "1");
        let day = f.filter_day(june_6(), &[eleven, twelve]);

        assert_eq!(day.records.len(), 1);
        assert_eq!(day.records[0].bytes_out, None);
    }

    #[test]
    fn test_timezone_is_applied() {
        let tz = TimezoneConfig::from_cli(Some("Europe/Bratislava"), false).unwrap();
        let f = RecordFilter::new(AggregationConfig::default(), tz);
        let line = direct_line("a", "06/Jun/2016:14:00:00", "/v.mp4", 200, "1");
        let day = f.filter_day(june_6(), &[line]);
        assert_eq!(
            day.records[0].timestamp,
            Utc.with_ymd_and_hms(2016, 6, 6, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_distinct_client_ids_first_seen_order() {
        let lines = vec![
            direct_line("b", "06/Jun/2016:10:00:00", "/v.mp4", 200, "1"),
            direct_line("a", "06/Jun/2016:10:00:01", "/v.mp4", 200, "1"),
            direct_line("b", "06/Jun/2016:10:00:02", "/v.mp4", 200, "1"),
        ];
        let day = filter().filter_day(june_6(), &lines);
        let ids: Vec<_> = distinct_client_ids(&day.records)
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_asset_basename_fallbacks() {
        assert_eq!(asset_basename("/stream/playlist.m3u8", "mp4"), "playlist.m3u8");
        assert_eq!(asset_basename("/dir/", "mp4"), "dir");
        assert_eq!(asset_basename("video.mp4", "mp4"), "video.mp4");
    }

    #[test]
    fn test_day_range_filter() {
        let days = vodstat_core::types::MonthSelector::new(2016, 6)
            .unwrap()
            .days(vodstat_core::calendar::DayTable::Fixed);
        assert_eq!(DayRangeFilter::new().apply(days.clone()).len(), 30);
        assert_eq!(DayRangeFilter::new().with_since(29).apply(days.clone()).len(), 2);
        assert_eq!(DayRangeFilter::new().with_until(3).apply(days).len(), 3);
    }
}
