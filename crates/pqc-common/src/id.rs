//! Partition, file, and run identity types.
//!
//! A partition is a date-bound subdirectory of the remote store. Files inside
//! it are referenced by store-relative paths and never mutated after listing.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Date format used by date-named partitions.
pub const PARTITION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Opaque identifier of one partition (usually a `YYYY-MM-DD` date).
///
/// Keys are validated on construction so they can be joined into store paths
/// without escaping the partition directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Validate and wrap a partition key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::InvalidPartition("partition key is empty".to_string()));
        }
        if key.contains('/') || key.contains('\\') || key == "." || key == ".." {
            return Err(Error::InvalidPartition(format!(
                "partition key '{}' must not contain path separators",
                key
            )));
        }
        Ok(PartitionKey(key))
    }

    /// Create a key for a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        PartitionKey(date.format(PARTITION_DATE_FORMAT).to_string())
    }

    /// Interpret the key as a date, if it is one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, PARTITION_DATE_FORMAT).ok()
    }

    /// Contiguous date range walking backwards: `end, end-1, ..., end-days_back`.
    pub fn date_range(end: &str, days_back: u32) -> Result<Vec<Self>> {
        let end = NaiveDate::parse_from_str(end, PARTITION_DATE_FORMAT).map_err(|e| {
            Error::InvalidPartition(format!("'{}' is not a YYYY-MM-DD date: {}", end, e))
        })?;
        Ok((0..=i64::from(days_back))
            .map(|offset| Self::from_date(end - Duration::days(offset)))
            .collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PartitionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Reference to one remote file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Store-relative path (`<base>/<partition dir>/<name>`).
    pub path: String,
    pub size_bytes: u64,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, size_bytes: u64) -> Self {
        FileDescriptor {
            path: path.into(),
            size_bytes,
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Ordered files of one partition, in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    pub partition: PartitionKey,
    pub files: Vec<FileDescriptor>,
}

impl FileSet {
    pub fn new(partition: PartitionKey, files: Vec<FileDescriptor>) -> Self {
        FileSet { partition, files }
    }

    /// An empty set, used when the partition does not exist.
    pub fn empty(partition: PartitionKey) -> Self {
        FileSet {
            partition,
            files: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of all file sizes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileDescriptor> {
        self.files.iter()
    }
}

/// Identifier of one consolidator invocation.
///
/// Format: `run-<date>-<time>-<random>`
/// Example: `run-20260115-143022-abc123`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect();
        RunId(format!("run-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_rejects_separators() {
        assert!(PartitionKey::new("2025-08-15").is_ok());
        assert!(PartitionKey::new("").is_err());
        assert!(PartitionKey::new("  ").is_err());
        assert!(PartitionKey::new("../etc").is_err());
        assert!(PartitionKey::new("..").is_err());
        assert!(PartitionKey::new("a\\b").is_err());
    }

    #[test]
    fn partition_key_date_roundtrip() {
        let key = PartitionKey::new("2025-08-15").unwrap();
        let date = key.as_date().unwrap();
        assert_eq!(PartitionKey::from_date(date), key);
        assert!(PartitionKey::new("hourly-17").unwrap().as_date().is_none());
    }

    #[test]
    fn date_range_walks_backwards() {
        let keys = PartitionKey::date_range("2025-03-01", 2).unwrap();
        let keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["2025-03-01", "2025-02-28", "2025-02-27"]);
    }

    #[test]
    fn date_range_zero_days_is_single_partition() {
        let keys = PartitionKey::date_range("2025-08-15", 0).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn date_range_rejects_bad_date() {
        assert!(PartitionKey::date_range("15/08/2025", 1).is_err());
    }

    #[test]
    fn file_descriptor_name() {
        let fd = FileDescriptor::new("base/date=2025-08-15/telemetry-1.parquet", 10);
        assert_eq!(fd.file_name(), "telemetry-1.parquet");
        assert_eq!(FileDescriptor::new("bare.parquet", 1).file_name(), "bare.parquet");
    }

    #[test]
    fn file_set_totals() {
        let set = FileSet::new(
            PartitionKey::new("p").unwrap(),
            vec![FileDescriptor::new("a", 3), FileDescriptor::new("b", 4)],
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_size(), 7);
        assert!(FileSet::empty(PartitionKey::new("p").unwrap()).is_empty());
    }

    #[test]
    fn run_id_format() {
        let id = RunId::new();
        assert!(id.0.starts_with("run-"));
        assert_eq!(id.0.len(), "run-20260115-143022-abc123".len());
    }
}
