//! CLI interface for vodstat
//!
//! This module defines the command-line interface using clap. Each report
//! scope is a subcommand; flags that change how logs are read are global.
//!
//! # Example
//!
//! ```bash
//! # Visits of one day, one row per visit
//! vodstat --log-dir /var/log/vod day 2016 6 6
//!
//! # June 2016 per day, with crawler traffic split out
//! vodstat --ignore ignore.txt month 2016 6
//!
//! # Whole year from logs without a byte count, as JSON
//! vodstat --bitrates video_bitrates.txt --json year 2016
//! ```

use crate::filters::DayRangeFilter;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vodstat_core::calendar::DayTable;
use vodstat_core::config::{
    AggregationConfig, DEFAULT_MEDIA_EXTENSION, SESSION_GAP_SECONDS,
};
use vodstat_core::error::{Result, VodstatError};
use vodstat_core::types::{LogFormat, VisitOrdering};

/// Reconstruct viewer visits from streaming-server access logs
#[derive(Parser, Debug, Clone)]
#[command(name = "vodstat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show informational output (default is quiet mode with only warnings and errors)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding the monthly `<Mon>_<YYYY>.log` files
    #[arg(long, short = 'd', env = "VODSTAT_LOG_DIR", default_value = ".", global = true)]
    pub log_dir: PathBuf,

    /// File of client addresses reported separately (one per line)
    #[arg(long, short = 'i', global = true)]
    pub ignore: Option<PathBuf>,

    /// Bitrate table; switches to logs without a byte count and estimates traffic
    #[arg(long, short = 'b', global = true)]
    pub bitrates: Option<PathBuf>,

    /// Seconds of inactivity after which a new visit starts
    #[arg(long, default_value_t = SESSION_GAP_SECONDS, global = true)]
    pub session_gap: i64,

    /// Only requests whose path contains this are tracked
    #[arg(long, default_value = DEFAULT_MEDIA_EXTENSION, global = true)]
    pub extension: String,

    /// HTTP status to drop (repeatable, default: 404)
    #[arg(long = "exclude-status", global = true)]
    pub exclude_status: Vec<u16>,

    /// Sort each client's hits by time before reconstructing visits
    #[arg(long, global = true)]
    pub chronological: bool,

    /// Include 29 February in leap-year rollups
    #[arg(long, global = true)]
    pub leap_years: bool,

    /// Timezone the log timestamps are in (e.g. "Europe/Bratislava"); default UTC
    #[arg(long, short = 'z', global = true)]
    pub timezone: Option<String>,

    /// Interpret timestamps as UTC (overrides --timezone)
    #[arg(long, global = true)]
    pub utc: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Report scopes
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Visits of a single day, one row per visit
    Day {
        year: i32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=31))]
        day: u32,
    },

    /// One row per day of a month
    Month {
        year: i32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,

        /// First day of the month to include
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
        since_day: Option<u32>,

        /// Last day of the month to include
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
        until_day: Option<u32>,

        /// Also list every visit of every day
        #[arg(long)]
        detailed: bool,
    },

    /// One row per month of a year
    Year { year: i32 },
}

impl Cli {
    /// Log format implied by the flags
    pub fn log_format(&self) -> LogFormat {
        if self.bitrates.is_some() {
            LogFormat::Estimated
        } else {
            LogFormat::Direct
        }
    }

    /// Aggregation settings from the global flags
    pub fn aggregation_config(&self) -> AggregationConfig {
        let mut config = AggregationConfig::default()
            .with_session_gap(self.session_gap)
            .with_format(self.log_format())
            .with_media_extension(self.extension.clone());

        if !self.exclude_status.is_empty() {
            config = config.with_excluded_statuses(self.exclude_status.clone());
        }
        if self.chronological {
            config = config.with_ordering(VisitOrdering::Chronological);
        }
        if self.leap_years {
            config = config.with_day_table(DayTable::Gregorian);
        }
        config
    }
}

/// Build the day range of a month report
///
/// # Errors
///
/// `InvalidSelector` when `since` is after `until`.
pub fn parse_day_range(since: Option<u32>, until: Option<u32>) -> Result<DayRangeFilter> {
    if let (Some(since), Some(until)) = (since, until) {
        if since > until {
            return Err(VodstatError::InvalidSelector(format!(
                "--since-day {since} is after --until-day {until}"
            )));
        }
    }

    let mut range = DayRangeFilter::new();
    if let Some(since) = since {
        range = range.with_since(since);
    }
    if let Some(until) = until {
        range = range.with_until(until);
    }
    Ok(range)
}
