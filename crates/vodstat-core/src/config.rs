//! Aggregation settings
//!
//! Every knob of the filter and the sessionizer lives here with its
//! historical default, so a run is fully described by one value.

use crate::calendar::DayTable;
use crate::types::{LogFormat, VisitOrdering};
use serde::{Deserialize, Serialize};

/// Maximum inactivity between two hits of the same visit, in seconds
pub const SESSION_GAP_SECONDS: i64 = 5400;

/// Default media extension of trackable requests
pub const DEFAULT_MEDIA_EXTENSION: &str = "mp4";

/// Status codes whose requests are never counted
pub const DEFAULT_EXCLUDED_STATUSES: &[u16] = &[404];

/// Settings shared by the record filter and the session aggregator
///
/// # Examples
/// ```
/// use vodstat_core::config::AggregationConfig;
/// use vodstat_core::types::{LogFormat, VisitOrdering};
///
/// let config = AggregationConfig::default()
///     .with_format(LogFormat::Estimated)
///     .with_ordering(VisitOrdering::Chronological);
/// assert_eq!(config.session_gap_seconds, 5400);
/// assert_eq!(config.format.field_count(), 11);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Gap above which a new visit starts
    pub session_gap_seconds: i64,
    /// Log variant, selects field count and byte accounting
    pub format: LogFormat,
    /// Substring a request path must contain to be tracked
    pub media_extension: String,
    /// Requests with these statuses are dropped
    pub excluded_statuses: Vec<u16>,
    /// Order hits are sessionized in
    pub ordering: VisitOrdering,
    /// Month lengths for the rollups
    pub day_table: DayTable,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            session_gap_seconds: SESSION_GAP_SECONDS,
            format: LogFormat::default(),
            media_extension: DEFAULT_MEDIA_EXTENSION.to_string(),
            excluded_statuses: DEFAULT_EXCLUDED_STATUSES.to_vec(),
            ordering: VisitOrdering::default(),
            day_table: DayTable::default(),
        }
    }
}

impl AggregationConfig {
    pub fn with_session_gap(mut self, seconds: i64) -> Self {
        self.session_gap_seconds = seconds;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_media_extension(mut self, extension: impl Into<String>) -> Self {
        self.media_extension = extension.into();
        self
    }

    pub fn with_excluded_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.excluded_statuses = statuses;
        self
    }

    pub fn with_ordering(mut self, ordering: VisitOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_day_table(mut self, day_table: DayTable) -> Self {
        self.day_table = day_table;
        self
    }

    /// Reject settings that cannot produce meaningful visits
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.session_gap_seconds <= 0 {
            return Err(crate::error::VodstatError::Config(format!(
                "session gap must be positive, got {}",
                self.session_gap_seconds
            )));
        }
        if self.media_extension.trim().is_empty() {
            return Err(crate::error::VodstatError::Config(
                "media extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
