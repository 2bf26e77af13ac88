//! Common test utilities and helpers for vodstat tests
//!
//! This module provides a builder for access-log lines, an in-memory log
//! source, and helpers that lay out a log directory on disk.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use vodstat::aggregation::Aggregator;
use vodstat_bitrate::ByteAccounting;
use vodstat_core::config::AggregationConfig;
use vodstat_core::error::{Result, VodstatError};
use vodstat_core::source::LogSource;
use vodstat_core::timezone::TimezoneConfig;
use vodstat_core::types::{LogFormat, MonthSelector};

/// Client addresses used across tests
pub const TEST_CLIENTS: &[&str] = &["10.0.0.1", "10.0.0.2", "192.168.1.20", "172.16.5.4"];

/// Crawler addresses used in ignore sets
pub const TEST_CRAWLERS: &[&str] = &["66.249.66.1", "157.55.39.1"];

/// Builder for Apache combined-style log lines
pub struct LogLineBuilder {
    client: String,
    time: NaiveDateTime,
    offset: String,
    path: String,
    status: u16,
    bytes: Option<String>,
}

impl LogLineBuilder {
    /// A 200 request for `/vod/video.mp4` at 2016-06-06 00:00:00
    pub fn new() -> Self {
        Self {
            client: TEST_CLIENTS[0].to_string(),
            time: june_6().and_hms_opt(0, 0, 0).unwrap(),
            offset: "+0000".to_string(),
            path: "/vod/video.mp4".to_string(),
            status: 200,
            bytes: Some("1000".to_string()),
        }
    }

    pub fn client(mut self, client: &str) -> Self {
        self.client = client.to_string();
        self
    }

    pub fn at(mut self, time: NaiveDateTime) -> Self {
        self.time = time;
        self
    }

    /// Shift the request time by `seconds`
    pub fn after(mut self, seconds: i64) -> Self {
        self.time += Duration::seconds(seconds);
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes.to_string());
        self
    }

    /// Drop the `%O` field, producing an 11-field line
    pub fn without_bytes(mut self) -> Self {
        self.bytes = None;
        self
    }

    pub fn build(self) -> String {
        let time = self.time.format("%d/%b/%Y:%H:%M:%S");
        let bytes = self.bytes.map(|b| format!(" {b}")).unwrap_or_default();
        format!(
            r#"{} - - [{} {}] "GET {} HTTP/1.1" {} 512{} "-""#,
            self.client, time, self.offset, self.path, self.status, bytes
        )
    }
}

impl Default for LogLineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn june_6() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 6, 6).unwrap()
}

/// In-memory [`LogSource`] keyed by month
#[derive(Default)]
pub struct MemorySource {
    months: HashMap<MonthSelector, Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_month(mut self, year: i32, month: u32, lines: Vec<String>) -> Self {
        self.months
            .insert(MonthSelector::new(year, month).unwrap(), lines);
        self
    }

    /// Every month of `year` present, all empty
    pub fn empty_year(year: i32) -> Self {
        let mut source = Self::new();
        for month in MonthSelector::all_in_year(year) {
            source.months.insert(month, Vec::new());
        }
        source
    }
}

#[async_trait]
impl LogSource for MemorySource {
    async fn month_lines(&self, month: MonthSelector) -> Result<Vec<String>> {
        self.months
            .get(&month)
            .cloned()
            .ok_or_else(|| VodstatError::MissingLogFile {
                path: month.log_file_name().into(),
            })
    }
}

/// Aggregator over 12-field logs with default settings
pub fn direct_aggregator() -> Aggregator {
    Aggregator::new(
        AggregationConfig::default(),
        TimezoneConfig::default(),
        ByteAccounting::Direct,
    )
    .unwrap()
}

/// Aggregator over 11-field logs estimating bytes from `accounting`
pub fn estimated_aggregator(accounting: ByteAccounting) -> Aggregator {
    Aggregator::new(
        AggregationConfig::default().with_format(LogFormat::Estimated),
        TimezoneConfig::default(),
        accounting,
    )
    .unwrap()
}

/// Write `<Mon>_<YYYY>.log` files into a fresh directory
pub fn log_dir_with(months: &[(MonthSelector, Vec<String>)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (month, lines) in months {
        write_lines(&dir.path().join(month.log_file_name()), lines);
    }
    dir
}

pub fn write_lines(path: &Path, lines: &[String]) {
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, content).unwrap();
}
