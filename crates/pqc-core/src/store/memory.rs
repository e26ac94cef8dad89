//! In-process store that records every call.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use pqc_common::FileDescriptor;
use serde::Serialize;

use super::{join_path, RemoteStore, StoreError, StoreOp};

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreCall {
    pub op: StoreOp,
    pub path: String,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    calls: Vec<StoreCall>,
}

/// Map-backed [`RemoteStore`]. Paths are normalised to have no leading or
/// trailing slash; listing order is lexicographic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the map consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a file without recording a call.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.lock().files.insert(normalise(path), bytes.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().files.contains_key(&normalise(path))
    }

    /// Contents of a file without recording a call.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&normalise(path)).cloned()
    }

    /// Paths of the files directly inside `dir`.
    pub fn paths_in(&self, dir: &str) -> Vec<String> {
        let prefix = dir_prefix(dir);
        self.lock()
            .files
            .keys()
            .filter(|p| is_direct_child(p, &prefix))
            .cloned()
            .collect()
    }

    /// Every call made through the [`RemoteStore`] interface, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Recorded `put` and `delete` calls.
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(state: &mut State, op: StoreOp, path: &str) {
        state.calls.push(StoreCall {
            op,
            path: path.to_string(),
        });
    }
}

impl RemoteStore for MemoryStore {
    fn list(&self, dir: &str) -> Result<Vec<FileDescriptor>, StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreOp::List, dir);
        let prefix = dir_prefix(dir);
        // A directory exists as long as anything lives beneath it.
        if !state.files.keys().any(|p| p.starts_with(&prefix)) {
            return Err(StoreError::NotFound(dir.to_string()));
        }
        Ok(state
            .files
            .iter()
            .filter(|(p, _)| is_direct_child(p, &prefix))
            .map(|(p, bytes)| FileDescriptor::new(p.clone(), bytes.len() as u64))
            .collect())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreOp::Get, path);
        state
            .files
            .get(&normalise(path))
            .cloned()
            .ok_or_else(|| StoreError::transfer(StoreOp::Get, path, "no such file"))
    }

    fn put(&self, bytes: &[u8], path: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreOp::Put, path);
        state.files.insert(normalise(path), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreOp::Delete, path);
        state
            .files
            .remove(&normalise(path))
            .map(|_| ())
            .ok_or_else(|| StoreError::transfer(StoreOp::Delete, path, "no such file"))
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

fn normalise(path: &str) -> String {
    join_path(path, "")
}

fn dir_prefix(dir: &str) -> String {
    let dir = normalise(dir);
    if dir.is_empty() {
        dir
    } else {
        format!("{}/", dir)
    }
}

fn is_direct_child(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_direct_children_only() {
        let store = MemoryStore::new();
        store.insert("base/date=1/a.parquet", vec![0u8; 4]);
        store.insert("/base/date=1/b.parquet", vec![0u8; 2]);
        store.insert("base/date=1/sub/c.parquet", vec![0u8; 1]);
        store.insert("base/date=10/d.parquet", vec![0u8; 1]);

        let listed = store.list("base/date=1").unwrap();
        assert_eq!(
            listed,
            vec![
                FileDescriptor::new("base/date=1/a.parquet", 4),
                FileDescriptor::new("base/date=1/b.parquet", 2),
            ]
        );
        assert_eq!(store.paths_in("base/date=1").len(), 2);
    }

    #[test]
    fn missing_dir_is_not_found() {
        let store = MemoryStore::new();
        store.insert("base/date=1/a.parquet", vec![1]);
        assert_eq!(
            store.list("base/date=2"),
            Err(StoreError::NotFound("base/date=2".to_string()))
        );
    }

    #[test]
    fn records_calls() {
        let store = MemoryStore::new();
        store.insert("p/a", vec![1]);
        store.get("p/a").unwrap();
        store.put(b"xy", "p/b").unwrap();
        store.delete("p/a").unwrap();
        assert!(store.delete("p/a").is_err());

        let ops: Vec<StoreOp> = store.calls().iter().map(|c| c.op).collect();
        assert_eq!(
            ops,
            vec![StoreOp::Get, StoreOp::Put, StoreOp::Delete, StoreOp::Delete]
        );
        assert_eq!(store.mutations().len(), 3);
        assert!(!store.contains("p/a"));
        assert_eq!(store.read("p/b"), Some(b"xy".to_vec()));

        store.clear_calls();
        assert!(store.calls().is_empty());
    }
}
