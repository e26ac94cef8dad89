//! Staging of remote inputs into run-exclusive scratch space.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pqc_common::{FileDescriptor, FileSet, PartitionKey};
use tempfile::TempDir;
use tracing::{debug, trace};

use crate::store::{RemoteStore, StoreError, StoreOp};

/// Scratch directory owned by one partition run.
///
/// Removed by [`Scratch::close`], or on drop if the run unwinds.
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
    inputs: PathBuf,
    outputs: PathBuf,
}

impl Scratch {
    /// Create `<root>/consolidation_<partition>_XXXXXX` with `inputs/` and `outputs/`.
    pub fn create(root: &Path, partition: &PartitionKey) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("consolidation_{}_", partition))
            .tempdir_in(root)?;
        let inputs = dir.path().join("inputs");
        let outputs = dir.path().join("outputs");
        fs::create_dir(&inputs)?;
        fs::create_dir(&outputs)?;
        trace!(path = %dir.path().display(), "created scratch directory");
        Ok(Self {
            dir,
            inputs,
            outputs,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn inputs(&self) -> &Path {
        &self.inputs
    }

    pub fn outputs(&self) -> &Path {
        &self.outputs
    }

    /// Remove the directory and everything in it.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// A remote file downloaded into scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub source: FileDescriptor,
    pub local_path: PathBuf,
}

pub struct Fetcher<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> Fetcher<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Download every file of `files` into `dest`, in order.
    ///
    /// Stops at the first failure. A download whose size differs from the
    /// listed size is a failure too.
    pub fn fetch(&self, files: &FileSet, dest: &Path) -> Result<Vec<StagedFile>, StoreError> {
        let mut staged = Vec::with_capacity(files.len());
        for (idx, file) in files.iter().enumerate() {
            // Index prefix keeps local names unique and in listing order.
            let local_path = dest.join(format!("{:05}-{}", idx, file.file_name()));
            let bytes = self.store.get_to_file(&file.path, &local_path)?;
            if bytes != file.size_bytes {
                return Err(StoreError::transfer(
                    StoreOp::Get,
                    &file.path,
                    format!("downloaded {} bytes, listing said {}", bytes, file.size_bytes),
                ));
            }
            trace!(path = %file.path, bytes, "staged input");
            staged.push(StagedFile {
                source: file.clone(),
                local_path,
            });
        }
        debug!(partition = %files.partition, files = staged.len(), "fetched inputs");
        Ok(staged)
    }
}
