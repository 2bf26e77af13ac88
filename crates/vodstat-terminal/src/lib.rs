//! Terminal output formatting for vodstat
//!
//! This crate provides the table and JSON renderings of day, month, and
//! year reports.

pub mod output;

pub use output::{JsonFormatter, OutputFormatter, TableFormatter, get_formatter};
