//! Semantic validation of a parsed configuration.

use pqc_common::schema::is_compatible;
use thiserror::Error;

use crate::config::{ConsolidatorConfig, SUPPORTED_STORE_SCHEMES};
use crate::profile::CompressionCodec;

/// All problems found in one configuration.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid configuration: {}", .issues.join("; "))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

/// Check cross-field constraints the type system cannot express.
pub fn validate(config: &ConsolidatorConfig) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    if !is_compatible(crate::CONFIG_SCHEMA_VERSION, &config.schema_version) {
        issues.push(format!(
            "schema_version {} is not compatible with {}",
            config.schema_version,
            crate::CONFIG_SCHEMA_VERSION
        ));
    }

    if config.store.root.trim().is_empty() {
        issues.push("store.root must not be empty".to_string());
    } else if let Some(scheme) = config.store.scheme() {
        if !SUPPORTED_STORE_SCHEMES.contains(&scheme) {
            issues.push(format!(
                "store.root scheme '{}' is not one of {}",
                scheme,
                SUPPORTED_STORE_SCHEMES.join(", ")
            ));
        }
    }

    if config.layout.extension.is_empty() || config.layout.extension.contains('.') {
        issues.push("layout.extension must be a bare extension such as 'parquet'".to_string());
    }
    if config.layout.file_prefix.contains('/') || config.layout.partition_prefix.contains('/') {
        issues.push("layout prefixes must not contain '/'".to_string());
    }

    if config.planner.target_output_size_bytes == 0 {
        issues.push("planner.target_output_size_bytes must be greater than zero".to_string());
    }
    if config.planner.min_files < 2 {
        issues.push("planner.min_files must be at least 2".to_string());
    }

    if config.profile.name.trim().is_empty() {
        issues.push("profile.name must not be empty".to_string());
    }
    if config.profile.row_group_size == 0 {
        issues.push("profile.row_group_size must be greater than zero".to_string());
    }
    if let CompressionCodec::Zstd { level } = config.profile.compression {
        if !(1..=22).contains(&level) {
            issues.push(format!("profile zstd level {} is outside 1..=22", level));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}
