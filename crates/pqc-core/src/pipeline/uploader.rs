//! Upload of verified outputs with compensating rollback.
//!
//! Originals are never touched here. If any output fails to upload, or the
//! confirmation listing does not show every output at its written size, all
//! outputs this run already put are deleted again.

use std::collections::HashMap;

use pqc_columnar::OutputFile;
use serde::Serialize;
use tracing::{debug, warn};

use super::finalizer::{delete_files, PartialDeletionWarning};
use crate::store::{join_path, RemoteStore, StoreError, StoreOp};

/// An output confirmed present in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub path: String,
    pub row_count: usize,
    pub byte_size: u64,
}

/// Failed upload, after rollback.
#[derive(Debug)]
pub struct UploadFailure {
    pub error: StoreError,
    /// Outputs that had been put before the failure.
    pub uploaded: usize,
    pub rolled_back: usize,
    /// Outputs whose rollback delete failed; they stay in the partition.
    pub rollback_failures: Vec<PartialDeletionWarning>,
}

pub struct Uploader<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> Uploader<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Put every output into `dir`, in order, then confirm them by listing.
    pub fn upload(&self, outputs: &[OutputFile], dir: &str) -> Result<Vec<UploadedFile>, UploadFailure> {
        let mut uploaded = Vec::with_capacity(outputs.len());
        for output in outputs {
            let path = join_path(dir, &output.file_name);
            if let Err(error) = self.store.put_file(&output.local_path, &path) {
                return Err(self.roll_back(error, &uploaded));
            }
            debug!(path = %path, bytes = output.byte_size, "uploaded output");
            uploaded.push(UploadedFile {
                path,
                row_count: output.row_count,
                byte_size: output.byte_size,
            });
        }

        if let Err(error) = self.confirm(dir, &uploaded) {
            return Err(self.roll_back(error, &uploaded));
        }
        Ok(uploaded)
    }

    fn confirm(&self, dir: &str, uploaded: &[UploadedFile]) -> Result<(), StoreError> {
        let listed: HashMap<String, u64> = self
            .store
            .list(dir)?
            .into_iter()
            .map(|f| (f.path, f.size_bytes))
            .collect();
        for file in uploaded {
            match listed.get(&file.path) {
                Some(&size) if size == file.byte_size => {}
                Some(&size) => {
                    return Err(StoreError::transfer(
                        StoreOp::Put,
                        &file.path,
                        format!("store reports {} bytes, wrote {}", size, file.byte_size),
                    ))
                }
                None => {
                    return Err(StoreError::transfer(
                        StoreOp::Put,
                        &file.path,
                        "not present after upload",
                    ))
                }
            }
        }
        Ok(())
    }

    fn roll_back(&self, error: StoreError, uploaded: &[UploadedFile]) -> UploadFailure {
        warn!(error = %error, uploaded = uploaded.len(), "upload failed, rolling back");
        let outcome = delete_files(
            self.store,
            uploaded.iter().map(|f| (f.path.as_str(), f.byte_size)),
        );
        UploadFailure {
            error,
            uploaded: uploaded.len(),
            rolled_back: outcome.deleted.len(),
            rollback_failures: outcome.warnings,
        }
    }
}
