//! Remote store capability.
//!
//! The engine only ever talks to the store through [`RemoteStore`]: list a
//! directory, get, put and delete a file. Every call is blocking and is
//! attempted exactly once; retrying is the caller's decision.

pub mod memory;
pub mod object;

use std::fmt;
use std::path::Path;

use pqc_common::FileDescriptor;
use serde::Serialize;
use thiserror::Error;

pub use memory::{MemoryStore, StoreCall};
pub use object::{ObjectStoreRemote, StoreProvider};

/// Remote operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    List,
    Get,
    Put,
    Delete,
}

impl StoreOp {
    /// Whether the operation changes remote state.
    pub fn is_mutation(self) -> bool {
        matches!(self, StoreOp::Put | StoreOp::Delete)
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::List => write!(f, "list"),
            StoreOp::Get => write!(f, "get"),
            StoreOp::Put => write!(f, "put"),
            StoreOp::Delete => write!(f, "delete"),
        }
    }
}

/// Errors from remote store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The listed directory or requested file does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The store could not be opened.
    #[error("cannot open store {location}: {reason}")]
    Open { location: String, reason: String },

    #[error("{op} {path} failed: {reason}")]
    Transfer {
        op: StoreOp,
        path: String,
        reason: String,
    },
}

impl StoreError {
    pub fn open(location: impl Into<String>, reason: impl fmt::Display) -> Self {
        StoreError::Open {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transfer(op: StoreOp, path: impl Into<String>, reason: impl fmt::Display) -> Self {
        StoreError::Transfer {
            op,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Blocking file-store client.
///
/// Paths are store-relative and `/`-separated. Listings are returned in a
/// stable order; the pipeline preserves it so merges are reproducible.
pub trait RemoteStore {
    /// Files directly inside `dir`. A missing directory is [`StoreError::NotFound`].
    fn list(&self, dir: &str) -> Result<Vec<FileDescriptor>, StoreError>;

    fn get(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or replace `path` with `bytes`.
    fn put(&self, bytes: &[u8], path: &str) -> Result<(), StoreError>;

    fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Download `path` into the local file `dest`, returning the byte count.
    fn get_to_file(&self, path: &str, dest: &Path) -> Result<u64, StoreError> {
        let bytes = self.get(path)?;
        std::fs::write(dest, &bytes).map_err(|e| StoreError::transfer(StoreOp::Get, path, e))?;
        Ok(bytes.len() as u64)
    }

    /// Upload the local file `src` to `path`.
    fn put_file(&self, src: &Path, path: &str) -> Result<(), StoreError> {
        let bytes = std::fs::read(src).map_err(|e| StoreError::transfer(StoreOp::Put, path, e))?;
        self.put(&bytes, path)
    }

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Join store path segments with `/`, ignoring empty segments.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    let name = name.trim_matches('/');
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => dir.to_string(),
        _ => format!("{}/{}", dir, name),
    }
}
