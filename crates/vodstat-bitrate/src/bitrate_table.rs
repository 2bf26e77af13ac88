//! Bitrate table loading
//!
//! The table maps a media asset basename to its encoding bitrate in bits per
//! second. It is read once from a plain-text file with one
//! `asset_basename bitrate` pair per line and is read-only afterwards.
//!
//! # Examples
//!
//! ```
//! use vodstat_bitrate::BitrateTable;
//!
//! let table = BitrateTable::parse("video.mp4 800000\n# comment\nintro.mp4 400000\n").unwrap();
//! assert_eq!(table.bitrate_of("video.mp4"), 800_000);
//! assert_eq!(table.bitrate_of("unknown.mp4"), 0);
//! ```

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, trace};
use vodstat_core::error::{Result, VodstatError};

/// Asset basename to bitrate (bits/second) lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitrateTable {
    bitrates: HashMap<String, u64>,
}

impl BitrateTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the textual table format
    ///
    /// Blank lines and lines starting with `#` are skipped. Any other line must
    /// hold an asset name followed by an integer bitrate; extra trailing
    /// fields are ignored. A later line for the same asset wins.
    pub fn parse(content: &str) -> Result<Self> {
        let mut bitrates = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let parsed = match (fields.next(), fields.next()) {
                (Some(asset), Some(rate)) => rate.parse::<u64>().ok().map(|r| (asset, r)),
                _ => None,
            };

            let (asset, rate) = parsed.ok_or_else(|| VodstatError::InvalidBitrateLine {
                line: index + 1,
                content: trimmed.to_string(),
            })?;
            bitrates.insert(asset.to_string(), rate);
        }

        debug!("Loaded bitrates for {} assets", bitrates.len());
        Ok(Self { bitrates })
    }

    /// Read and parse a table file
    ///
    /// # Errors
    ///
    /// `MissingBitrateFile` when the file does not exist, `InvalidBitrateLine`
    /// for a malformed entry.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VodstatError::MissingBitrateFile {
                    path: path.to_path_buf(),
                }
            } else {
                VodstatError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Set or replace the bitrate of an asset
    pub fn insert(&mut self, asset: impl Into<String>, bits_per_second: u64) {
        self.bitrates.insert(asset.into(), bits_per_second);
    }

    /// Bitrate of an asset in bits per second, 0 when unmapped
    pub fn bitrate_of(&self, asset: &str) -> u64 {
        match self.bitrates.get(asset) {
            Some(rate) => *rate,
            None => {
                trace!("No bitrate for asset '{}'", asset);
                0
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bitrates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitrates.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for BitrateTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            bitrates: iter.into_iter().map(|(a, r)| (a.into(), r)).collect(),
        }
    }
}
