//! vodstat - Reconstruct viewer visits from streaming-server access logs
//!
//! This library provides functionality to:
//! - Select the media requests of a day from Apache-style access logs
//! - Group each client's requests into visits separated by long inactivity
//! - Count visits, watch time, and transferred bytes (logged or estimated)
//! - Roll days up into month and year reports, with ignored clients apart
//!
//! # Examples
//!
//! ```no_run
//! use vodstat::{aggregation::Aggregator, data_loader::DataLoader};
//! use vodstat_bitrate::ByteAccounting;
//! use vodstat_core::config::AggregationConfig;
//! use vodstat_core::timezone::TimezoneConfig;
//!
//! #[tokio::main]
//! async fn main() -> vodstat::Result<()> {
//!     let loader = DataLoader::new("/var/log/vod")?;
//!     let aggregator = Aggregator::new(
//!         AggregationConfig::default(),
//!         TimezoneConfig::default(),
//!         ByteAccounting::Direct,
//!     )?;
//!
//!     let year = aggregator.aggregate_year(2016, &loader).await?;
//!     println!("{} visits", year.totals.visit_count);
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod cli;
pub mod data_loader;
pub mod filters;

// Re-export commonly used types
pub use vodstat_core::{ClientId, DaySelector, LogFormat, LogRecord, MonthSelector};
pub use vodstat_core::{Result, VodstatError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
