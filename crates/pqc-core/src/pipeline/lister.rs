//! Partition listing.

use pqc_common::{FileDescriptor, FileSet, PartitionKey};
use pqc_config::ConsolidatorConfig;
use tracing::{debug, info};

use crate::store::{RemoteStore, StoreError};

/// Files of one partition as seen at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Dataset files eligible for consolidation, in store order.
    pub file_set: FileSet,
    /// Dataset files at or below the in-flight threshold, presumed still being
    /// written (or truncated by a failed write).
    pub excluded_in_flight: Vec<FileDescriptor>,
    /// `false` when the partition directory does not exist.
    pub partition_found: bool,
}

/// Read-only view of partitions in the store.
pub struct FileLister<'a> {
    store: &'a dyn RemoteStore,
    config: &'a ConsolidatorConfig,
}

impl<'a> FileLister<'a> {
    pub fn new(store: &'a dyn RemoteStore, config: &'a ConsolidatorConfig) -> Self {
        Self { store, config }
    }

    /// List `partition`. A missing directory yields an empty listing.
    pub fn list(&self, partition: &PartitionKey) -> Result<Listing, StoreError> {
        let dir = self.config.partition_dir(partition);
        let entries = match self.store.list(&dir) {
            Ok(entries) => entries,
            Err(StoreError::NotFound(_)) => {
                debug!(partition = %partition, dir = %dir, "partition directory not found");
                return Ok(Listing {
                    file_set: FileSet::empty(partition.clone()),
                    excluded_in_flight: Vec::new(),
                    partition_found: false,
                });
            }
            Err(e) => return Err(e),
        };

        let threshold = self.config.planner.in_flight_threshold_bytes;
        let (in_flight, files): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .filter(|f| self.config.layout.matches(f.file_name()))
            .partition(|f| f.size_bytes <= threshold);

        if !in_flight.is_empty() {
            info!(
                partition = %partition,
                count = in_flight.len(),
                threshold_bytes = threshold,
                "excluding files still being written"
            );
        }
        debug!(partition = %partition, files = files.len(), "listed partition");

        Ok(Listing {
            file_set: FileSet::new(partition.clone(), files),
            excluded_in_flight: in_flight,
            partition_found: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn key() -> PartitionKey {
        PartitionKey::new("2025-08-15").unwrap()
    }

    #[test]
    fn missing_partition_is_empty_not_error() {
        let store = MemoryStore::new();
        let config = ConsolidatorConfig::default();
        let listing = FileLister::new(&store, &config).list(&key()).unwrap();
        assert!(!listing.partition_found);
        assert!(listing.file_set.is_empty());
    }

    #[test]
    fn filters_foreign_and_in_flight_files() {
        let store = MemoryStore::new();
        let config = ConsolidatorConfig::default();
        let dir = config.partition_dir(&key());
        store.insert(&format!("{dir}/telemetry-b.parquet"), vec![0u8; 2048]);
        store.insert(&format!("{dir}/telemetry-a.parquet"), vec![0u8; 4096]);
        store.insert(&format!("{dir}/telemetry-c.parquet"), vec![0u8; 10]);
        store.insert(&format!("{dir}/_SUCCESS"), vec![0u8; 4096]);
        store.insert(&format!("{dir}/other-a.parquet"), vec![0u8; 4096]);
        store.insert(&format!("{dir}/nested/telemetry-d.parquet"), vec![0u8; 4096]);

        let listing = FileLister::new(&store, &config).list(&key()).unwrap();
        let names: Vec<&str> = listing.file_set.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["telemetry-a.parquet", "telemetry-b.parquet"]);
        assert_eq!(listing.excluded_in_flight.len(), 1);
        assert_eq!(listing.excluded_in_flight[0].file_name(), "telemetry-c.parquet");
        assert_eq!(listing.file_set.total_size(), 6144);
    }

    #[test]
    fn threshold_bound_is_inclusive() {
        let store = MemoryStore::new();
        let config = ConsolidatorConfig::default();
        let dir = config.partition_dir(&key());
        store.insert(&format!("{dir}/telemetry-at.parquet"), vec![0u8; 1024]);
        store.insert(&format!("{dir}/telemetry-over.parquet"), vec![0u8; 1025]);

        let listing = FileLister::new(&store, &config).list(&key()).unwrap();
        assert_eq!(listing.excluded_in_flight.len(), 1);
        assert_eq!(listing.excluded_in_flight[0].file_name(), "telemetry-at.parquet");
        assert_eq!(listing.file_set.len(), 1);
        assert_eq!(listing.file_set.files[0].file_name(), "telemetry-over.parquet");
    }
}
