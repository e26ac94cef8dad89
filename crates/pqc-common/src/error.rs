//! Error types for the parquet consolidator.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for consolidator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a partition outcome, as surfaced in reports.
///
/// `NotFound` and `BelowThreshold` explain skips, `PartialDeletion` tags
/// warnings on consolidated partitions; the rest fail the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    BelowThreshold,
    SchemaMismatch,
    Integrity,
    Transfer,
    PartialDeletion,
    Config,
    Io,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::BelowThreshold => "below_threshold",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Transfer => "transfer",
            ErrorKind::PartialDeletion => "partial_deletion",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Errors in user-supplied input shared by the consolidator crates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid partition: {0}")]
    InvalidPartition(String),
}
