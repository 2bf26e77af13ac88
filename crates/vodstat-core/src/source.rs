//! Log source trait
//!
//! This module defines the `LogSource` trait through which the rollups obtain
//! raw access-log lines. Reading happens once per month, before any
//! aggregation fans out, and is the only I/O boundary of a run.

use crate::error::Result;
use crate::types::MonthSelector;
use async_trait::async_trait;

/// Supplier of the raw access-log lines of one month
///
/// The file-backed implementation lives in the `vodstat` crate; tests use
/// in-memory sources.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// All lines of the month's log, in file order
    ///
    /// A month whose log cannot be found is an error, not an empty month.
    async fn month_lines(&self, month: MonthSelector) -> Result<Vec<String>>;
}
