//! Core types, traits, and utilities for vodstat
//!
//! This crate provides the foundational types, error handling,
//! timezone configuration, and aggregation result types used
//! by all other vodstat crates.

pub mod aggregation_types;
pub mod calendar;
pub mod config;
pub mod error;
pub mod source;
pub mod timezone;
pub mod types;

// Re-export commonly used types
pub use error::{Result, VodstatError};
pub use types::{ClientId, DaySelector, IgnoreSet, LogFormat, LogRecord, MonthSelector};
