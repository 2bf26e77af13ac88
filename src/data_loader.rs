//! Data loader for per-month access logs and the ignore list
//!
//! Logs live in one directory, one file per month named `<Mon>_<YYYY>.log`
//! (for example `Jun_2016.log`). Lines are streamed from disk and decoded
//! lossily, so a stray invalid byte never aborts a report.
//!
//! # Examples
//!
//! ```no_run
//! use vodstat::data_loader::DataLoader;
//! use vodstat_core::source::LogSource;
//! use vodstat_core::types::MonthSelector;
//!
//! # async fn example() -> vodstat_core::Result<()> {
//! let loader = DataLoader::new("/var/log/vod")?;
//! let lines = loader.month_lines(MonthSelector::new(2016, 6)?).await?;
//! println!("{} lines", lines.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use vodstat_core::error::{Result, VodstatError};
use vodstat_core::source::LogSource;
use vodstat_core::types::{ClientId, IgnoreSet, MonthSelector};

/// File-backed [`LogSource`] over a directory of monthly logs
#[derive(Debug, Clone)]
pub struct DataLoader {
    log_dir: PathBuf,
}

impl DataLoader {
    /// Create a loader for `log_dir`
    ///
    /// # Errors
    ///
    /// `Config` when the directory does not exist.
    pub fn new(log_dir: impl Into<PathBuf>) -> Result<Self> {
        let log_dir = log_dir.into();
        if !log_dir.is_dir() {
            return Err(VodstatError::Config(format!(
                "log directory {} does not exist",
                log_dir.display()
            )));
        }
        debug!("Reading access logs from {}", log_dir.display());
        Ok(Self { log_dir })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Location of the log for `month`
    pub fn month_path(&self, month: MonthSelector) -> PathBuf {
        self.log_dir.join(month.log_file_name())
    }

    /// Stream the lines of a file, decoding invalid UTF-8 lossily
    pub fn line_stream(path: PathBuf) -> Pin<Box<dyn Stream<Item = Result<String>> + Send>> {
        Box::pin(async_stream::try_stream! {
            let file = tokio::fs::File::open(&path).await?;
            let mut reader = BufReader::new(file);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                yield line;
            }
        })
    }
}

#[async_trait]
impl LogSource for DataLoader {
    async fn month_lines(&self, month: MonthSelector) -> Result<Vec<String>> {
        let path = self.month_path(month);
        if !path.is_file() {
            return Err(VodstatError::MissingLogFile { path });
        }

        let mut lines = Vec::new();
        let mut stream = Self::line_stream(path.clone());
        while let Some(line) = stream.next().await {
            lines.push(line?);
        }

        info!("Loaded {} lines from {}", lines.len(), path.display());
        Ok(lines)
    }
}

/// Read an ignore list: one client identifier per line
///
/// Blank lines and lines starting with `#` are skipped; surrounding
/// whitespace is trimmed.
///
/// # Errors
///
/// `MissingIgnoreFile` when the file does not exist.
pub async fn load_ignore_list(path: impl AsRef<Path>) -> Result<IgnoreSet> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(VodstatError::MissingIgnoreFile {
            path: path.to_path_buf(),
        });
    }

    let mut ignore = IgnoreSet::new();
    let mut stream = DataLoader::line_stream(path.to_path_buf());
    while let Some(line) = stream.next().await {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        ignore.insert(ClientId::new(trimmed));
    }

    info!("Ignoring {} clients listed in {}", ignore.len(), path.display());
    Ok(ignore)
}
