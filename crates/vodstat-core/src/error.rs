//! Error types for vodstat
//!
//! This module defines the error types used throughout the vodstat library.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Only configuration problems surface as errors. Noisy log data (short lines,
//! unknown assets, unparseable timestamps) is tolerated by the record filter
//! and never reaches this type.
//!
//! # Example
//!
//! ```
//! use vodstat_core::error::{VodstatError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to VodstatError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vodstat operations
#[derive(Error, Debug)]
pub enum VodstatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The access log for a requested month does not exist
    #[error("Access log not found: {}", path.display())]
    MissingLogFile {
        /// Expected location of the log
        path: PathBuf,
    },

    /// Estimated byte accounting was requested but the bitrate table is missing
    #[error("Bitrate table not found: {}", path.display())]
    MissingBitrateFile {
        /// Expected location of the table
        path: PathBuf,
    },

    /// An ignore list was requested but the file is missing
    #[error("Ignore list not found: {}", path.display())]
    MissingIgnoreFile {
        /// Expected location of the list
        path: PathBuf,
    },

    /// A bitrate table line could not be understood
    #[error("Invalid bitrate entry on line {line}: '{content}'")]
    InvalidBitrateLine {
        /// 1-based line number
        line: usize,
        /// The offending text
        content: String,
    },

    /// Invalid date format
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Invalid timezone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Day, month, or year selector out of range
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rollup was cancelled between day boundaries
    #[error("Aggregation cancelled")]
    Cancelled,
}

/// Convenience type alias for Results in vodstat
pub type Result<T> = std::result::Result<T, VodstatError>;
