//! Core domain types for vodstat
//!
//! This module contains the fundamental types used throughout the vodstat library:
//! client identifiers, validated log records, the log format variants, and the
//! day/month selectors that drive filtering and rollups.

use crate::calendar::DayTable;
use crate::error::{Result, VodstatError};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Three-letter month names as they appear in Apache `%t` timestamps
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Strongly-typed client identifier (the source address of a request)
///
/// # Examples
/// ```
/// use vodstat_core::types::ClientId;
///
/// let client = ClientId::new("10.0.0.1");
/// assert_eq!(client.as_str(), "10.0.0.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Create a new ClientId from any string-like type
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Access log variant, which also selects the byte accounting model
///
/// `Direct` logs carry `%O` (bytes sent) and have 12 whitespace-separated
/// fields. `Estimated` logs lack it (11 fields) and transferred bytes are
/// derived from watch time and a bitrate table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Direct,
    Estimated,
}

impl LogFormat {
    /// Number of whitespace-delimited fields a well-formed line must have
    pub fn field_count(&self) -> usize {
        match self {
            Self::Direct => 12,
            Self::Estimated => 11,
        }
    }

    /// Whether lines of this format carry a logged byte count
    pub fn has_bytes(&self) -> bool {
        matches!(self, Self::Direct)
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Estimated => write!(f, "estimated"),
        }
    }
}

/// Order in which a client's hits are fed to the sessionizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitOrdering {
    /// Filtered (file) order. Out-of-order hits are absorbed without
    /// extending the open visit, which matches historical reports.
    #[default]
    Scan,
    /// Each client's hits are stable-sorted by timestamp first
    Chronological,
}

/// One accepted access-log request
///
/// Only constructed by the record filter after the line passed the shape,
/// day, media, and status checks, so every instance is valid by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Source address, the sessionization key
    pub client_id: ClientId,
    /// Request time, linearized through the configured timezone
    pub timestamp: DateTime<Utc>,
    /// Request path as logged
    pub resource_path: String,
    /// Media asset basename used for bitrate lookup
    pub asset: String,
    /// HTTP status code
    pub status: u16,
    /// Bytes sent, present only for the direct log format
    pub bytes_out: Option<u64>,
}

/// Client identifiers excluded from the primary totals
///
/// # Examples
/// ```
/// use vodstat_core::types::{ClientId, IgnoreSet};
///
/// let ignored: IgnoreSet = ["66.249.66.1", "157.55.39.1"].into_iter().collect();
/// assert!(ignored.contains(&ClientId::new("66.249.66.1")));
/// assert_eq!(ignored.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet(HashSet<ClientId>);

impl IgnoreSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identifier, returning whether it was newly inserted
    pub fn insert(&mut self, id: ClientId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(ClientId::new).collect())
    }
}

/// A single calendar day to report on
///
/// # Examples
/// ```
/// use vodstat_core::types::DaySelector;
///
/// let day = DaySelector::new(2016, 6, 6).unwrap();
/// assert_eq!(day.date_token(), "06/Jun/2016");
/// assert!(DaySelector::new(2016, 13, 1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DaySelector(NaiveDate);

impl DaySelector {
    /// Create a selector, validating the date
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| {
                VodstatError::InvalidSelector(format!("{year:04}-{month:02}-{day:02}"))
            })
    }

    /// Get the inner NaiveDate
    pub fn date(&self) -> &NaiveDate {
        &self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// The month containing this day
    pub fn month_selector(&self) -> MonthSelector {
        MonthSelector {
            year: self.year(),
            month: self.month(),
        }
    }

    /// Date prefix of the `%t` field for this day, e.g. `06/Jun/2016`
    pub fn date_token(&self) -> String {
        format!(
            "{:02}/{}/{:04}",
            self.day(),
            self.month_selector().abbreviation(),
            self.year()
        )
    }

    /// Format using a chrono format string
    pub fn format(&self, fmt: &str) -> String {
        self.0.format(fmt).to_string()
    }
}

impl fmt::Display for DaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A calendar month to report on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthSelector {
    pub year: i32,
    pub month: u32,
}

impl MonthSelector {
    /// Create a selector, validating the month number
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(VodstatError::InvalidSelector(format!(
                "month must be between 1-12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// All twelve months of a year
    pub fn all_in_year(year: i32) -> Vec<Self> {
        (1..=12).map(|month| Self { year, month }).collect()
    }

    /// Three-letter month name, e.g. `Jun`
    pub fn abbreviation(&self) -> &'static str {
        MONTH_ABBREVIATIONS[(self.month - 1) as usize]
    }

    /// Name of the per-month log file, e.g. `Jun_2016.log`
    pub fn log_file_name(&self) -> String {
        format!("{}_{}.log", self.abbreviation(), self.year)
    }

    /// `YYYY-MM` label used in reports
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Every day of the month according to `table`
    pub fn days(&self, table: DayTable) -> Vec<DaySelector> {
        (1..=table.days_in_month(self.year, self.month))
            .filter_map(|day| NaiveDate::from_ymd_opt(self.year, self.month, day))
            .map(DaySelector)
            .collect()
    }
}

impl fmt::Display for MonthSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
