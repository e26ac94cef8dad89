//! Consolidator configuration types.
//!
//! Every field has a default taken from the production deployment, so an
//! empty file (or no file at all) yields a usable configuration.

use std::path::PathBuf;

use pqc_common::PartitionKey;
use serde::{Deserialize, Serialize};

use crate::profile::SerializationProfile;
use crate::size::deserialize_byte_size;

/// 1 MiB.
pub const MIB: u64 = 1024 * 1024;

/// Default target size of a consolidated output file.
pub const DEFAULT_TARGET_OUTPUT_SIZE_BYTES: u64 = 128 * MIB;

/// Default minimum number of files before a partition is consolidated.
pub const DEFAULT_MIN_FILES: usize = 5;

/// Files at or below this size are assumed to still be written by the ingester.
pub const DEFAULT_IN_FLIGHT_THRESHOLD_BYTES: u64 = 1024;

/// Complete consolidator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatorConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub layout: PartitionLayout,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub scratch: ScratchConfig,

    #[serde(default)]
    pub profile: SerializationProfile,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            store: StoreConfig::default(),
            layout: PartitionLayout::default(),
            planner: PlannerConfig::default(),
            scratch: ScratchConfig::default(),
            profile: SerializationProfile::default(),
        }
    }
}

impl ConsolidatorConfig {
    /// Store-relative directory holding one partition's files.
    pub fn partition_dir(&self, partition: &PartitionKey) -> String {
        let base = self.store.base_path.trim_matches('/');
        let leaf = format!("{}{}", self.layout.partition_prefix, partition);
        if base.is_empty() {
            leaf
        } else {
            format!("{}/{}", base, leaf)
        }
    }
}

/// URL schemes accepted in [`StoreConfig::root`].
pub const SUPPORTED_STORE_SCHEMES: &[&str] =
    &["file", "s3", "s3a", "gs", "az", "azure", "abfs", "abfss"];

/// Location of the remote store.
///
/// Passed explicitly into the orchestrator. Cloud credentials are the only
/// thing taken from the process environment (`AWS_*`, `GOOGLE_*`, `AZURE_*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL (`s3://bucket/prefix`, `gs://bucket`, `az://container`,
    /// `file:///mnt/hdfs`) or a local directory path.
    #[serde(default = "default_store_root")]
    pub root: String,

    /// Dataset directory under the root that contains the partitions.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_store_root() -> String {
    "/".to_string()
}

fn default_base_path() -> String {
    "/insurance-megacorp/telemetry-data-v2".to_string()
}

impl StoreConfig {
    /// URL scheme of `root`, or `None` for a plain directory path.
    pub fn scheme(&self) -> Option<&str> {
        self.root
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
            base_path: default_base_path(),
        }
    }
}

/// Naming conventions of partitions and data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLayout {
    /// Prefix of partition directory names (`date=` gives `date=2025-08-15`).
    #[serde(default = "default_partition_prefix")]
    pub partition_prefix: String,

    /// Only files whose name starts with this prefix are consolidated.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Data file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_partition_prefix() -> String {
    "date=".to_string()
}

fn default_file_prefix() -> String {
    "telemetry-".to_string()
}

fn default_extension() -> String {
    "parquet".to_string()
}

impl Default for PartitionLayout {
    fn default() -> Self {
        Self {
            partition_prefix: default_partition_prefix(),
            file_prefix: default_file_prefix(),
            extension: default_extension(),
        }
    }
}

impl PartitionLayout {
    /// Whether a file name belongs to the consolidated dataset.
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.file_prefix)
            && file_name
                .strip_suffix(&self.extension)
                .is_some_and(|stem| stem.ends_with('.'))
    }
}

/// Thresholds driving the consolidation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_min_files")]
    pub min_files: usize,

    #[serde(
        default = "default_target_output_size",
        deserialize_with = "deserialize_byte_size"
    )]
    pub target_output_size_bytes: u64,

    #[serde(
        default = "default_in_flight_threshold",
        deserialize_with = "deserialize_byte_size"
    )]
    pub in_flight_threshold_bytes: u64,

    /// Delete files at or below the in-flight threshold before planning.
    #[serde(default)]
    pub purge_undersized: bool,
}

fn default_min_files() -> usize {
    DEFAULT_MIN_FILES
}

fn default_target_output_size() -> u64 {
    DEFAULT_TARGET_OUTPUT_SIZE_BYTES
}

fn default_in_flight_threshold() -> u64 {
    DEFAULT_IN_FLIGHT_THRESHOLD_BYTES
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_files: DEFAULT_MIN_FILES,
            target_output_size_bytes: DEFAULT_TARGET_OUTPUT_SIZE_BYTES,
            in_flight_threshold_bytes: DEFAULT_IN_FLIGHT_THRESHOLD_BYTES,
            purge_undersized: false,
        }
    }
}

/// Local scratch space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Parent directory of per-run scratch directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl ScratchConfig {
    pub fn resolve_root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("parquet_consolidation"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: ConsolidatorConfig = toml::from_str("").unwrap();
        assert_eq!(config, ConsolidatorConfig::default());
        assert_eq!(config.planner.min_files, 5);
        assert_eq!(config.planner.target_output_size_bytes, 128 * MIB);
    }

    #[test]
    fn sizes_accept_strings_and_integers() {
        let config: ConsolidatorConfig = toml::from_str(
            r#"
            [planner]
            target_output_size_bytes = "64MB"
            in_flight_threshold_bytes = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.planner.target_output_size_bytes, 64 * MIB);
        assert_eq!(config.planner.in_flight_threshold_bytes, 0);
        assert_eq!(config.planner.min_files, DEFAULT_MIN_FILES);
    }

    #[test]
    fn partition_dir_joins_base_and_prefix() {
        let config = ConsolidatorConfig::default();
        let key = PartitionKey::new("2025-08-15").unwrap();
        assert_eq!(
            config.partition_dir(&key),
            "insurance-megacorp/telemetry-data-v2/date=2025-08-15"
        );

        let mut flat = ConsolidatorConfig::default();
        flat.store.base_path = "/".to_string();
        assert_eq!(flat.partition_dir(&key), "date=2025-08-15");
    }

    #[test]
    fn layout_matches_prefix_and_extension() {
        let layout = PartitionLayout::default();
        assert!(layout.matches("telemetry-0001.parquet"));
        assert!(layout.matches("telemetry-2025-08-15-consolidated-20250816T000000000Z-0000.parquet"));
        assert!(!layout.matches("telemetry-0001.parquet.tmp"));
        assert!(!layout.matches("telemetry-0001xparquet"));
        assert!(!layout.matches("_SUCCESS"));
        assert!(!layout.matches("other-0001.parquet"));
    }

    #[test]
    fn scratch_root_defaults_under_tmp() {
        let root = ScratchConfig::default().resolve_root();
        assert!(root.ends_with("parquet_consolidation"));
    }
}
