//! Errors from reading, merging, writing and verifying columnar files.

use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use pqc_common::ErrorKind;
use thiserror::Error;

/// Result type alias for columnar operations.
pub type Result<T> = std::result::Result<T, ColumnarError>;

#[derive(Debug, Error)]
pub enum ColumnarError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parquet error on {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("no input files to merge")]
    NoInputs,

    /// Inputs disagree on column names or types.
    #[error("schema of {path} differs from {reference}: {detail}")]
    SchemaMismatch {
        reference: PathBuf,
        path: PathBuf,
        detail: String,
    },

    /// A file's footer row count disagrees with its decoded rows.
    #[error("{path} footer declares {footer_rows} rows but {decoded_rows} were decoded")]
    CorruptFile {
        path: PathBuf,
        footer_rows: i64,
        decoded_rows: usize,
    },

    /// Row-count conservation violated.
    #[error("row count mismatch: expected {expected}, found {actual} ({detail})")]
    Integrity {
        expected: usize,
        actual: usize,
        detail: String,
    },

    #[error("invalid serialization profile: {0}")]
    InvalidProfile(String),
}

impl ColumnarError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ColumnarError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parquet(path: impl Into<PathBuf>, source: ParquetError) -> Self {
        ColumnarError::Parquet {
            path: path.into(),
            source,
        }
    }

    /// Report classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ColumnarError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            ColumnarError::CorruptFile { .. } | ColumnarError::Integrity { .. } => {
                ErrorKind::Integrity
            }
            ColumnarError::Io { .. } | ColumnarError::Parquet { .. } => ErrorKind::Io,
            ColumnarError::InvalidProfile(_) => ErrorKind::Config,
            ColumnarError::Arrow(_) | ColumnarError::NoInputs => ErrorKind::Internal,
        }
    }
}
