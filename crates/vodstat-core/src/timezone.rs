//! Timezone utilities for timestamp linearization
//!
//! Access-log timestamps are local wall-clock times. They are converted to
//! absolute instants through an explicitly configured timezone so that the
//! same logs produce the same durations on every machine. The default is UTC;
//! the ambient system timezone is never consulted.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

/// Configuration for timezone handling
#[derive(Debug, Clone)]
pub struct TimezoneConfig {
    /// The timezone log timestamps are interpreted in
    pub tz: Tz,
    /// Whether the timezone is UTC
    pub is_utc: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            is_utc: true,
        }
    }
}

impl TimezoneConfig {
    /// Create a new timezone configuration from CLI arguments
    pub fn from_cli(timezone_str: Option<&str>, use_utc: bool) -> crate::error::Result<Self> {
        if use_utc {
            return Ok(Self::default());
        }

        if let Some(tz_str) = timezone_str {
            let tz = Tz::from_str(tz_str).map_err(|_| {
                crate::error::VodstatError::InvalidTimezone(format!(
                    "'{}'. Use format like 'Europe/Bratislava', 'America/New_York', or 'UTC'",
                    tz_str
                ))
            })?;
            debug!("Interpreting log timestamps in {}", tz.name());
            Ok(Self {
                tz,
                is_utc: tz == Tz::UTC,
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Get the display name for the configured timezone
    pub fn display_name(&self) -> &str {
        if self.is_utc { "UTC" } else { self.tz.name() }
    }

    /// Convert a local wall-clock time to an absolute instant
    ///
    /// Ambiguous times (the repeated hour when clocks go back) resolve to the
    /// earlier instant. Returns `None` for times skipped by a forward shift.
    pub fn to_utc(&self, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
