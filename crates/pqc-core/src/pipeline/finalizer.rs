//! Deletion of replaced originals.

use pqc_common::{ErrorKind, FileSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::RemoteStore;

/// A file that should have been deleted but was not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDeletionWarning {
    /// Always [`ErrorKind::PartialDeletion`].
    pub kind: ErrorKind,
    pub path: String,
    pub reason: String,
}

impl PartialDeletionWarning {
    pub fn new(path: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            kind: ErrorKind::PartialDeletion,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a batch of deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Finalization {
    pub deleted: Vec<String>,
    pub deleted_bytes: u64,
    pub warnings: Vec<PartialDeletionWarning>,
}

/// Delete each `(path, size)`; failures become warnings and never stop the loop.
pub fn delete_files<'p>(
    store: &dyn RemoteStore,
    files: impl IntoIterator<Item = (&'p str, u64)>,
) -> Finalization {
    let mut outcome = Finalization::default();
    for (path, size) in files {
        match store.delete(path) {
            Ok(()) => {
                outcome.deleted.push(path.to_string());
                outcome.deleted_bytes += size;
            }
            Err(e) => {
                warn!(path, error = %e, "failed to delete file");
                outcome.warnings.push(PartialDeletionWarning::new(path, e));
            }
        }
    }
    outcome
}

pub struct Finalizer<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> Finalizer<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Delete every original of `originals`. Call only once the replacement
    /// outputs are confirmed present.
    pub fn finalize(&self, originals: &FileSet) -> Finalization {
        let outcome = delete_files(
            self.store,
            originals.iter().map(|f| (f.path.as_str(), f.size_bytes)),
        );
        debug!(
            partition = %originals.partition,
            deleted = outcome.deleted.len(),
            failed = outcome.warnings.len(),
            "deleted originals"
        );
        outcome
    }
}
