//! Session aggregation for visit reports
//!
//! This module reconstructs viewer visits from the accepted records of a day
//! and rolls the per-day totals up into month and year reports.
//!
//! # Visits
//!
//! A client's hits are walked in order. A hit less than or exactly
//! `session_gap_seconds` after the last hit extends the open visit; a larger
//! gap closes it and opens a new one. A hit that is not later than the last
//! hit (same second or out of order) changes nothing. The last open visit is
//! always closed, so a lone hit is a visit of zero seconds.
//!
//! Clients in the ignore set go through the same reconstruction but are
//! tallied in a separate cohort that never reaches the primary totals.
//!
//! # Parallelism
//!
//! Days are independent, so the rollups fan out one task per day over rayon
//! and merge the per-day totals afterwards. A cancellation token is checked
//! before each day and each month is started.
//!
//! # Examples
//!
//! ```
//! use vodstat::aggregation::Aggregator;
//! use vodstat_bitrate::ByteAccounting;
//! use vodstat_core::config::AggregationConfig;
//! use vodstat_core::timezone::TimezoneConfig;
//! use vodstat_core::types::DaySelector;
//!
//! let aggregator = Aggregator::new(
//!     AggregationConfig::default(),
//!     TimezoneConfig::default(),
//!     ByteAccounting::Direct,
//! )
//! .unwrap();
//!
//! let lines = vec![
//!     r#"10.0.0.1 - - [06/Jun/2016:00:00:00 +0000] "GET /video.mp4 HTTP/1.1" 200 512 1000 "-""#,
//!     r#"10.0.0.1 - - [06/Jun/2016:01:00:00 +0000] "GET /video.mp4 HTTP/1.1" 206 512 2000 "-""#,
//!     r#"10.0.0.1 - - [06/Jun/2016:03:00:00 +0000] "GET /video.mp4 HTTP/1.1" 206 512 3000 "-""#,
//! ];
//!
//! let stats = aggregator.aggregate_day(DaySelector::new(2016, 6, 6).unwrap(), &lines);
//! assert_eq!(stats.totals.visit_count, 2);
//! assert_eq!(stats.totals.total_seconds, 3600);
//! assert_eq!(stats.totals.total_bytes, 6000);
//! ```

use crate::filters::{DayRangeFilter, DayRecords, RecordFilter, distinct_client_ids};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vodstat_bitrate::ByteAccounting;
use vodstat_core::aggregation_types::{DailyStats, MonthlyStats, PeriodTotals, Visit, YearlyStats};
use vodstat_core::config::AggregationConfig;
use vodstat_core::source::LogSource;
use vodstat_core::timezone::TimezoneConfig;
use vodstat_core::types::{ClientId, DaySelector, IgnoreSet, LogRecord, MonthSelector, VisitOrdering};
use vodstat_core::{Result, VodstatError};

struct OpenVisit<'a> {
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    asset: &'a str,
}

/// Sessionizer state for the hits of one client
struct VisitAccumulator<'a> {
    client_id: &'a ClientId,
    gap_seconds: i64,
    accounting: &'a ByteAccounting,
    open: Option<OpenVisit<'a>>,
    visits: Vec<Visit>,
}

impl<'a> VisitAccumulator<'a> {
    fn new(client_id: &'a ClientId, gap_seconds: i64, accounting: &'a ByteAccounting) -> Self {
        Self {
            client_id,
            gap_seconds,
            accounting,
            open: None,
            visits: Vec::new(),
        }
    }

    fn add_hit(&mut self, record: &'a LogRecord) {
        let Some(open) = self.open.as_mut() else {
            self.open_visit(record);
            return;
        };

        let delta = (record.timestamp - open.last_seen).num_seconds();
        if delta > self.gap_seconds {
            self.close_visit();
            self.open_visit(record);
        } else if delta > 0 {
            open.last_seen = record.timestamp;
        }
    }

    fn open_visit(&mut self, record: &'a LogRecord) {
        self.open = Some(OpenVisit {
            first_seen: record.timestamp,
            last_seen: record.timestamp,
            asset: &record.asset,
        });
    }

    fn close_visit(&mut self) {
        if let Some(open) = self.open.take() {
            let duration_seconds = (open.last_seen - open.first_seen).num_seconds().max(0) as u64;
            self.visits.push(Visit {
                client_id: self.client_id.clone(),
                first_seen: open.first_seen,
                last_seen: open.last_seen,
                duration_seconds,
                asset: open.asset.to_string(),
                estimated_bytes: self.accounting.visit_bytes(open.asset, duration_seconds),
            });
        }
    }

    fn finish(mut self) -> Vec<Visit> {
        self.close_visit();
        self.visits
    }
}

/// Reconstruct the visits of one client from its hits, in the order given
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vodstat::aggregation::sessionize;
/// use vodstat_bitrate::ByteAccounting;
/// use vodstat_core::types::{ClientId, LogRecord};
///
/// let client = ClientId::new("10.0.0.1");
/// let hit = |h: u32, m: u32| LogRecord {
///     client_id: client.clone(),
///     timestamp: Utc.with_ymd_and_hms(2016, 6, 6, h, m, 0).unwrap(),
///     resource_path: "/video.mp4".into(),
///     asset: "video.mp4".into(),
///     status: 200,
///     bytes_out: Some(0),
/// };
/// let hits = [hit(10, 0), hit(11, 30), hit(13, 1)];
/// let refs: Vec<&LogRecord> = hits.iter().collect();
///
/// let visits = sessionize(&client, &refs, 5400, &ByteAccounting::Direct);
/// assert_eq!(visits.len(), 2);
/// assert_eq!(visits[0].duration_seconds, 5400);
/// assert_eq!(visits[1].duration_seconds, 0);
/// ```
pub fn sessionize(
    client_id: &ClientId,
    hits: &[&LogRecord],
    gap_seconds: i64,
    accounting: &ByteAccounting,
) -> Vec<Visit> {
    let mut accumulator = VisitAccumulator::new(client_id, gap_seconds, accounting);
    for hit in hits {
        accumulator.add_hit(hit);
    }
    accumulator.finish()
}

/// Running totals of one cohort (primary or ignored) for one day
#[derive(Default)]
struct CohortTally {
    clients: usize,
    visit_count: u64,
    seconds: u64,
    bytes: u64,
    visits: Vec<Visit>,
}

impl CohortTally {
    fn add_client(&mut self, visits: Vec<Visit>, hits: &[&LogRecord], accounting: &ByteAccounting) {
        self.clients += 1;
        self.visit_count += visits.len() as u64;
        for visit in &visits {
            self.seconds += visit.duration_seconds;
            self.bytes += visit.estimated_bytes;
        }
        self.bytes += hits.iter().map(|r| accounting.record_bytes(r)).sum::<u64>();
        self.visits.extend(visits);
    }
}

/// Main aggregation engine
pub struct Aggregator {
    config: AggregationConfig,
    filter: RecordFilter,
    accounting: ByteAccounting,
    ignore: Option<Arc<IgnoreSet>>,
    detailed: bool,
    show_progress: bool,
    cancel: Option<CancellationToken>,
}

impl Aggregator {
    /// Create a new Aggregator
    ///
    /// # Errors
    ///
    /// `Config` when the settings are invalid or the byte accounting model
    /// does not match the configured log format.
    pub fn new(
        config: AggregationConfig,
        timezone_config: TimezoneConfig,
        accounting: ByteAccounting,
    ) -> Result<Self> {
        config.validate()?;
        if accounting.format() != config.format {
            return Err(VodstatError::Config(format!(
                "{} byte accounting cannot be used with {} logs",
                accounting.format(),
                config.format
            )));
        }

        Ok(Self {
            filter: RecordFilter::new(config.clone(), timezone_config),
            config,
            accounting,
            ignore: None,
            detailed: false,
            show_progress: false,
            cancel: None,
        })
    }

    /// Tally these clients in the ignored cohort
    pub fn with_ignore_set(mut self, ignore: Arc<IgnoreSet>) -> Self {
        self.ignore = Some(ignore);
        self
    }

    /// Keep one row per visit in the daily stats
    pub fn with_detail(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Abort rollups once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    /// Get the timezone configuration
    pub fn timezone_config(&self) -> &TimezoneConfig {
        self.filter.timezone()
    }

    fn is_ignored(&self, client_id: &ClientId) -> bool {
        self.ignore.as_ref().is_some_and(|set| set.contains(client_id))
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            Err(VodstatError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn progress_bar(&self, len: u64, message: String) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{elapsed_precise}] {pos}/{len} days processed")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    }

    /// Reconstruct and tally the visits of already filtered records
    pub fn aggregate_records(&self, day: DaySelector, accepted: &DayRecords) -> DailyStats {
        let client_ids = distinct_client_ids(&accepted.records);

        let mut hits_by_client: HashMap<&ClientId, Vec<&LogRecord>> =
            HashMap::with_capacity(client_ids.len());
        for record in &accepted.records {
            hits_by_client.entry(&record.client_id).or_default().push(record);
        }

        let mut primary = CohortTally::default();
        let mut ignored = CohortTally::default();

        for client_id in &client_ids {
            let Some(mut hits) = hits_by_client.remove(client_id) else {
                continue;
            };
            if self.config.ordering == VisitOrdering::Chronological {
                hits.sort_by_key(|r| r.timestamp);
            }

            let visits = sessionize(
                client_id,
                &hits,
                self.config.session_gap_seconds,
                &self.accounting,
            );
            let cohort = if self.is_ignored(client_id) {
                &mut ignored
            } else {
                &mut primary
            };
            cohort.add_client(visits, &hits, &self.accounting);
        }

        debug!(
            "{}: {} visits from {} clients, {} ignored visits from {} clients",
            day, primary.visit_count, primary.clients, ignored.visit_count, ignored.clients
        );

        let mut stats = DailyStats::empty(day);
        stats.totals.visit_count = primary.visit_count;
        stats.totals.total_seconds = primary.seconds;
        stats.totals.total_bytes = primary.bytes;
        stats.totals.ignored_visit_count = ignored.visit_count;
        stats.totals.ignored_seconds = ignored.seconds;
        stats.totals.ignored_bytes = ignored.bytes;
        stats.client_count = primary.clients;
        stats.ignored_client_count = ignored.clients;
        stats.skipped_timestamps = accepted.skipped_timestamps;
        if self.detailed {
            stats.visits = Some(primary.visits);
            if self.ignore.is_some() {
                stats.ignored_visits = Some(ignored.visits);
            }
        }
        stats
    }

    /// Filter the lines of a month down to `day` and aggregate them
    pub fn aggregate_day<S: AsRef<str>>(&self, day: DaySelector, lines: &[S]) -> DailyStats {
        let accepted = self.filter.filter_day(day, lines);
        self.aggregate_records(day, &accepted)
    }

    fn checked_day<S: AsRef<str>>(&self, day: DaySelector, lines: &[S]) -> Result<DailyStats> {
        self.check_cancelled()?;
        Ok(self.aggregate_day(day, lines))
    }

    /// Aggregate several days of the same line set in parallel
    ///
    /// The result is in the order of `days`.
    pub fn aggregate_days<S: AsRef<str> + Sync>(
        &self,
        days: &[DaySelector],
        lines: &[S],
    ) -> Result<Vec<DailyStats>> {
        let progress = self.progress_bar(days.len() as u64, "Aggregating days".to_string());

        let result = days
            .par_iter()
            .map(|day| {
                let stats = self.checked_day(*day, lines);
                if let Some(ref pb) = progress {
                    pb.inc(1);
                }
                stats
            })
            .collect::<Result<Vec<_>>>();

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        result
    }

    /// Sum of the per-day totals of `days`
    ///
    /// Each rayon worker folds its own days and the partial totals are
    /// merged at the end.
    pub fn aggregate_period<S: AsRef<str> + Sync>(
        &self,
        days: &[DaySelector],
        lines: &[S],
    ) -> Result<PeriodTotals> {
        days.par_iter()
            .map(|day| self.checked_day(*day, lines).map(|stats| stats.totals))
            .try_reduce(PeriodTotals::default, |a, b| Ok(a + b))
    }

    /// Per-day rows and totals for the days of `month` inside `range`
    pub fn aggregate_month<S: AsRef<str> + Sync>(
        &self,
        month: MonthSelector,
        range: &DayRangeFilter,
        lines: &[S],
    ) -> Result<MonthlyStats> {
        let days = range.apply(month.days(self.config.day_table));
        let daily = self.aggregate_days(&days, lines)?;
        Ok(MonthlyStats::from_days(month, daily))
    }

    /// Read the month's log from `source` and aggregate it
    pub async fn load_month(
        &self,
        month: MonthSelector,
        range: &DayRangeFilter,
        source: &dyn LogSource,
    ) -> Result<MonthlyStats> {
        self.check_cancelled()?;
        let lines = source.month_lines(month).await?;
        info!("Read {} lines for {}", lines.len(), month);
        self.aggregate_month(month, range, &lines)
    }

    /// Aggregate a single day, reading its month's log from `source`
    pub async fn load_day(&self, day: DaySelector, source: &dyn LogSource) -> Result<DailyStats> {
        let lines = source.month_lines(day.month_selector()).await?;
        info!("Read {} lines for {}", lines.len(), day.month_selector());
        Ok(self.aggregate_day(day, &lines))
    }

    /// Aggregate all twelve months of `year`
    ///
    /// A missing month log fails the whole report.
    pub async fn aggregate_year(&self, year: i32, source: &dyn LogSource) -> Result<YearlyStats> {
        let everything = DayRangeFilter::default();
        let mut months = Vec::with_capacity(12);
        for month in MonthSelector::all_in_year(year) {
            months.push(self.load_month(month, &everything, source).await?);
        }
        Ok(YearlyStats::from_months(year, months))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use vodstat_bitrate::BitrateTable;
    use vodstat_core::types::LogFormat;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 6, 6, 0, 0, 0).unwrap()
    }

    fn record(ip: &str, offset_secs: i64, asset: &str, bytes: u64) -> LogRecord {
        LogRecord {
            client_id: ClientId::new(ip),
            timestamp: base() + Duration::seconds(offset_secs),
            resource_path: format!("/vod/{asset}"),
            asset: asset.to_string(),
            status: 200,
            bytes_out: Some(bytes),
        }
    }

    fn day() -> DaySelector {
        DaySelector::new(2016, 6, 6).unwrap()
    }

    fn direct() -> Aggregator {
        Aggregator::new(
            AggregationConfig::default(),
            TimezoneConfig::default(),
            ByteAccounting::Direct,
        )
        .unwrap()
    }

    fn estimated(table: BitrateTable) -> Aggregator {
        Aggregator::new(
            AggregationConfig::default().with_format(LogFormat::Estimated),
            TimezoneConfig::default(),
            ByteAccounting::Estimated(Arc::new(table)),
        )
        .unwrap()
    }

    fn accepted(records: Vec<LogRecord>) -> DayRecords {
        DayRecords {
            records,
            skipped_timestamps: 0,
        }
    }

    fn durations(offsets: &[i64]) -> Vec<u64> {
        let records: Vec<_> = offsets.iter().map(|o| record("a", *o, "v.mp4", 0)).collect();
        let refs: Vec<&LogRecord> = records.iter().collect();
        sessionize(&ClientId::new("a"), &refs, 5400, &ByteAccounting::Direct)
            .into_iter()
            .map(|v| v.duration_seconds)
            .collect()
    }

    #[test]
    fn test_gap_boundary() {
        assert_eq!(durations(&[0, 5400]), vec![5400]);
        assert_eq!(durations(&[0, 5401]), vec![0, 0]);
    }

    #[test]
    fn test_single_hit_is_zero_second_visit() {
        assert_eq!(durations(&[42]), vec![0]);
    }

    #[test]
    fn test_out_of_order_hits_are_absorbed() {
        // The 1800 hit neither extends nor splits the visit opened at 3600
        assert_eq!(durations(&[3600, 1800, 3660]), vec![60]);
        assert_eq!(durations(&[100, 100, 100]), vec![0]);
    }

    #[test]
    fn test_three_hits_two_visits() {
        let stats = direct().aggregate_records(
            day(),
            &accepted(vec![
                record("10.0.0.1", 0, "v.mp4", 100),
                record("10.0.0.1", 3600, "v.mp4", 200),
                record("10.0.0.1", 3 * 3600, "v.mp4", 300),
            ]),
        );
        assert_eq!(stats.totals.visit_count, 2);
        assert_eq!(stats.totals.total_seconds, 3600);
        assert_eq!(stats.totals.total_bytes, 600);
        assert_eq!(stats.client_count, 1);
    }

    #[test]
    fn test_clients_are_sessionized_independently() {
        let stats = direct().aggregate_records(
            day(),
            &accepted(vec![
                record("a", 0, "v.mp4", 1),
                record("b", 100, "v.mp4", 1),
                record("a", 200, "v.mp4", 1),
                record("b", 10_000, "v.mp4", 1),
            ]),
        );
        assert_eq!(stats.totals.visit_count, 3);
        assert_eq!(stats.totals.total_seconds, 200);
        assert_eq!(stats.client_count, 2);
    }

    #[test]
    fn test_estimated_bytes_use_opening_asset() {
        let table: BitrateTable = [("video.mp4", 800_000u64)].into_iter().collect();
        let stats = estimated(table).aggregate_records(
            day(),
            &accepted(vec![
                record("a", 0, "video.mp4", 0),
                record("a", 100, "other.mp4", 0),
                record("b", 0, "unmapped.mp4", 0),
                record("b", 500, "video.mp4", 0),
            ]),
        );
        assert_eq!(stats.totals.visit_count, 2);
        assert_eq!(stats.totals.total_seconds, 600);
        assert_eq!(stats.totals.total_bytes, 10_000_000);
    }

    #[test]
    fn test_ignored_cohort_is_separate() {
        let ignore: IgnoreSet = ["bot"].into_iter().collect();
        let aggregator = direct().with_ignore_set(Arc::new(ignore)).with_detail(true);
        let stats = aggregator.aggregate_records(
            day(),
            &accepted(vec![
                record("viewer", 0, "v.mp4", 10),
                record("bot", 0, "v.mp4", 1000),
                record("viewer", 60, "v.mp4", 10),
                record("bot", 30, "v.mp4", 1000),
            ]),
        );

        assert_eq!(stats.totals.visit_count, 1);
        assert_eq!(stats.totals.total_seconds, 60);
        assert_eq!(stats.totals.total_bytes, 20);
        assert_eq!(stats.totals.ignored_visit_count, 1);
        assert_eq!(stats.totals.ignored_seconds, 30);
        assert_eq!(stats.totals.ignored_bytes, 2000);
        assert_eq!(stats.client_count, 1);
        assert_eq!(stats.ignored_client_count, 1);
        assert_eq!(stats.visits.as_ref().map(Vec::len), Some(1));
        assert_eq!(stats.ignored_visits.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_chronological_ordering_sorts_hits() {
        let config = AggregationConfig::default().with_ordering(VisitOrdering::Chronological);
        let aggregator =
            Aggregator::new(config, TimezoneConfig::default(), ByteAccounting::Direct).unwrap();
        let records = vec![
            record("a", 3600, "v.mp4", 0),
            record("a", 1800, "v.mp4", 0),
            record("a", 3660, "v.mp4", 0),
        ];
        let stats = aggregator.aggregate_records(day(), &accepted(records.clone()));
        assert_eq!(stats.totals.total_seconds, 1860);

        let scan = direct().aggregate_records(day(), &accepted(records));
        assert_eq!(scan.totals.total_seconds, 60);
    }

    #[test]
    fn test_detail_rows_follow_first_seen_order() {
        let stats = direct().with_detail(true).aggregate_records(
            day(),
            &accepted(vec![
                record("b", 0, "v.mp4", 0),
                record("a", 10, "v.mp4", 0),
                record("b", 20_000, "v.mp4", 0),
            ]),
        );
        let rows: Vec<_> = stats
            .visits
            .unwrap()
            .into_iter()
            .map(|v| v.client_id.to_string())
            .collect();
        assert_eq!(rows, vec!["b", "b", "a"]);
        assert!(stats.ignored_visits.is_none());
    }

    #[test]
    fn test_empty_day() {
        let stats = direct().aggregate_records(day(), &DayRecords::default());
        assert!(stats.totals.is_empty());
        assert_eq!(stats.client_count, 0);
    }

    #[test]
    fn test_mismatched_accounting_is_rejected() {
        let result = Aggregator::new(
            AggregationConfig::default().with_format(LogFormat::Estimated),
            TimezoneConfig::default(),
            ByteAccounting::Direct,
        );
        assert!(matches!(result, Err(VodstatError::Config(_))));
    }

    #[test]
    fn test_cancelled_period_fails() {
        let token = CancellationToken::new();
        token.cancel();
        let aggregator = direct().with_cancellation(token);
        let days = MonthSelector::new(2016, 6).unwrap().days(Default::default());
        let lines: Vec<String> = Vec::new();

        assert!(matches!(
            aggregator.aggregate_period(&days, &lines),
            Err(VodstatError::Cancelled)
        ));
        assert!(matches!(
            aggregator.aggregate_days(&days, &lines),
            Err(VodstatError::Cancelled)
        ));
    }
}
