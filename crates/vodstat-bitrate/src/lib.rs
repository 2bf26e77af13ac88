//! Bitrate table and byte accounting for vodstat
//!
//! This crate loads the asset bitrate table and implements the two
//! transferred-bytes models: logged (direct) and estimated.

pub mod bitrate_table;
pub mod byte_accounting;

pub use bitrate_table::BitrateTable;
pub use byte_accounting::{ByteAccounting, estimate_bytes};
