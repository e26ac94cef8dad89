//! Shared fixtures: Parquet builders and a fault-injecting store.

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use pqc_common::{FileDescriptor, PartitionKey};
use pqc_config::ConsolidatorConfig;
use pqc_core::store::{MemoryStore, RemoteStore, StoreError, StoreOp};

pub const PARTITION: &str = "2025-08-15";

pub fn key() -> PartitionKey {
    PartitionKey::new(PARTITION).unwrap()
}

/// Default config with scratch space under `scratch`.
pub fn config_with_scratch(scratch: &Path) -> ConsolidatorConfig {
    let mut config = ConsolidatorConfig::default();
    config.scratch.root = Some(scratch.to_path_buf());
    config
}

/// Telemetry rows `start..start+rows`.
pub fn telemetry_batch(start: i64, rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("event_id", DataType::Int64, false),
        Field::new("vin", DataType::Utf8, true),
        Field::new("speed_mph", DataType::Float64, true),
    ]));
    let ids: Vec<i64> = (start..start + rows as i64).collect();
    let vins: Vec<String> = ids.iter().map(|i| format!("1HGCM82633A{:08}", i)).collect();
    let speeds: Vec<f64> = ids.iter().map(|i| (*i % 90) as f64 + 0.5).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(vins)),
            Arc::new(Float64Array::from(speeds)),
        ],
    )
    .unwrap()
}

/// Same columns but `speed_mph` stored as text.
pub fn drifted_batch(rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("event_id", DataType::Int64, false),
        Field::new("vin", DataType::Utf8, true),
        Field::new("speed_mph", DataType::Utf8, true),
    ]));
    let ids: Vec<i64> = (0..rows as i64).collect();
    let vins: Vec<String> = ids.iter().map(|i| format!("5YJ3E1EA7KF{:08}", i)).collect();
    let speeds: Vec<String> = ids.iter().map(|i| format!("{} mph", i % 90)).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(vins)),
            Arc::new(StringArray::from(speeds)),
        ],
    )
    .unwrap()
}

pub fn parquet_bytes(batch: &RecordBatch) -> Vec<u8> {
    let mut writer = ArrowWriter::try_new(Vec::new(), batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.into_inner().unwrap()
}

/// Decoded row count of an in-memory Parquet file.
pub fn count_rows(bytes: &[u8]) -> usize {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(bytes).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(tmp.path()).unwrap())
        .unwrap()
        .build()
        .unwrap();
    reader.map(|b| b.unwrap().num_rows()).sum()
}

/// Seed `files` telemetry files of `rows_per_file` rows into the partition.
/// Returns the paths in listing order.
pub fn seed_partition(
    store: &MemoryStore,
    config: &ConsolidatorConfig,
    partition: &PartitionKey,
    files: usize,
    rows_per_file: usize,
) -> Vec<String> {
    let dir = config.partition_dir(partition);
    (0..files)
        .map(|i| {
            let path = format!("{}/telemetry-{:03}.parquet", dir, i);
            let batch = telemetry_batch((i * rows_per_file) as i64, rows_per_file);
            store.insert(&path, parquet_bytes(&batch));
            path
        })
        .collect()
}

/// Total decoded rows of every dataset file in the partition.
pub fn partition_rows(store: &MemoryStore, config: &ConsolidatorConfig, partition: &PartitionKey) -> usize {
    store
        .paths_in(&config.partition_dir(partition))
        .iter()
        .map(|p| count_rows(&store.read(p).unwrap()))
        .sum()
}

/// [`MemoryStore`] wrapper that fails selected calls.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// 1-based index of the `put` that fails.
    pub fail_put_at: Option<usize>,
    /// `put` stores a truncated copy instead of the real bytes.
    pub truncate_puts: bool,
    /// Paths whose `delete` fails.
    pub fail_delete_of: HashSet<String>,
    /// Fail every `get`.
    pub fail_gets: bool,
    puts: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemoteStore for FaultyStore {
    fn list(&self, dir: &str) -> Result<Vec<FileDescriptor>, StoreError> {
        self.inner.list(dir)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        if self.fail_gets {
            return Err(StoreError::transfer(StoreOp::Get, path, "connection reset"));
        }
        self.inner.get(path)
    }

    fn put(&self, bytes: &[u8], path: &str) -> Result<(), StoreError> {
        let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_put_at == Some(n) {
            return Err(StoreError::transfer(StoreOp::Put, path, "injected upload failure"));
        }
        if self.truncate_puts {
            return self.inner.put(&bytes[..bytes.len() / 2], path);
        }
        self.inner.put(bytes, path)
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        if self.fail_delete_of.contains(path) {
            return Err(StoreError::transfer(StoreOp::Delete, path, "permission denied"));
        }
        self.inner.delete(path)
    }

    fn describe(&self) -> String {
        "faulty+memory://".to_string()
    }
}
