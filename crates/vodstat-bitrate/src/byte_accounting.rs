//! Byte accounting models
//!
//! Transferred bytes are either read straight from the log (`%O`) or, when
//! the log does not carry them, estimated from visit duration and the asset
//! bitrate. The two models are mutually exclusive and tied to the log format.

use crate::bitrate_table::BitrateTable;
use std::sync::Arc;
use tracing::debug;
use vodstat_core::types::{LogFormat, LogRecord};

/// How transferred bytes are counted
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vodstat_bitrate::{BitrateTable, ByteAccounting};
///
/// let table: BitrateTable = [("video.mp4", 800_000u64)].into_iter().collect();
/// let accounting = ByteAccounting::Estimated(Arc::new(table));
///
/// // 100 seconds at 800 kbit/s
/// assert_eq!(accounting.visit_bytes("video.mp4", 100), 10_000_000);
/// ```
#[derive(Debug, Clone, Default)]
pub enum ByteAccounting {
    /// Sum the logged byte count of every record
    #[default]
    Direct,
    /// Multiply each visit's duration by its asset's bitrate
    Estimated(Arc<BitrateTable>),
}

impl ByteAccounting {
    /// Log format this model needs
    pub fn format(&self) -> LogFormat {
        match self {
            Self::Direct => LogFormat::Direct,
            Self::Estimated(_) => LogFormat::Estimated,
        }
    }

    /// Bytes contributed by a single record, independent of visit boundaries
    pub fn record_bytes(&self, record: &LogRecord) -> u64 {
        match self {
            Self::Direct => record.bytes_out.unwrap_or(0),
            Self::Estimated(_) => 0,
        }
    }

    /// Bytes contributed by a closed visit
    pub fn visit_bytes(&self, asset: &str, duration_seconds: u64) -> u64 {
        match self {
            Self::Direct => 0,
            Self::Estimated(table) => estimate_bytes(table.bitrate_of(asset), duration_seconds),
        }
    }
}

/// `duration * (bitrate / 8)`, the byte rate truncated to whole bytes first
pub fn estimate_bytes(bits_per_second: u64, duration_seconds: u64) -> u64 {
    let bytes = duration_seconds.saturating_mul(bits_per_second / 8);
    debug!(
        "Estimated {} bytes for {}s at {} bit/s",
        bytes, duration_seconds, bits_per_second
    );
    bytes
}
