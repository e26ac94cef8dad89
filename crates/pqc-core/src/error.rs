//! Errors that fail a single partition.

use pqc_columnar::ColumnarError;
use pqc_common::ErrorKind;
use thiserror::Error;

use crate::pipeline::finalizer::PartialDeletionWarning;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("listing {dir} failed: {source}")]
    Listing {
        dir: String,
        #[source]
        source: StoreError,
    },

    #[error("scratch space: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("download failed: {0}")]
    Fetch(#[source] StoreError),

    #[error(transparent)]
    Columnar(#[from] ColumnarError),

    /// Upload or upload confirmation failed; this run's outputs were rolled back.
    #[error("upload failed after {uploaded} output(s), {rolled_back} rolled back: {source}")]
    Upload {
        #[source]
        source: StoreError,
        uploaded: usize,
        rolled_back: usize,
        rollback_failures: Vec<PartialDeletionWarning>,
    },
}

impl ConsolidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsolidationError::Listing { .. }
            | ConsolidationError::Fetch(_)
            | ConsolidationError::Upload { .. } => ErrorKind::Transfer,
            ConsolidationError::Scratch(_) => ErrorKind::Io,
            ConsolidationError::Columnar(e) => e.kind(),
        }
    }

    /// Outputs of this run left behind because their rollback failed.
    pub fn orphaned_outputs(&self) -> &[PartialDeletionWarning] {
        match self {
            ConsolidationError::Upload {
                rollback_failures, ..
            } => rollback_failures,
            _ => &[],
        }
    }
}
