//! Output file naming.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use pqc_common::{FileSet, PartitionKey};
use pqc_config::PartitionLayout;

/// Timestamp format embedded in output names (UTC, millisecond precision).
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// Separates the partition key from the run stamp in output names.
const OUTPUT_MARKER: &str = "-consolidated-";

/// Whether `file_name` was written by an earlier consolidation of `partition`.
pub fn is_consolidated_output(partition: &PartitionKey, file_name: &str) -> bool {
    file_name.contains(&format!("{}{}", partition, OUTPUT_MARKER))
}

/// Names the outputs of one consolidation run.
///
/// Names look like
/// `telemetry-2025-08-15-consolidated-20251018T101500123Z-0001.parquet` and
/// still match the dataset file filter.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    prefix: String,
    partition: PartitionKey,
    extension: String,
    stamp: DateTime<Utc>,
}

impl OutputNamer {
    pub fn new(layout: &PartitionLayout, partition: &PartitionKey, now: DateTime<Utc>) -> Self {
        Self {
            prefix: layout.file_prefix.clone(),
            partition: partition.clone(),
            extension: layout.extension.clone(),
            stamp: now,
        }
    }

    /// Move the timestamp forward until none of the first `count` names
    /// exists in `existing`.
    pub fn avoiding(mut self, existing: &FileSet, count: usize) -> Self {
        let taken: HashSet<&str> = existing.iter().map(|f| f.file_name()).collect();
        while (0..count).any(|idx| taken.contains(self.name(idx).as_str())) {
            self.stamp += Duration::milliseconds(1);
        }
        self
    }

    /// Name of the output at zero-based `index`; sequence numbers start at 1.
    pub fn name(&self, index: usize) -> String {
        format!(
            "{}{}{}{}-{:04}.{}",
            self.prefix,
            self.partition,
            OUTPUT_MARKER,
            self.stamp.format(OUTPUT_TIMESTAMP_FORMAT),
            index + 1,
            self.extension
        )
    }
}
