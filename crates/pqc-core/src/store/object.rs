//! `object_store`-backed store for local directories and cloud buckets.
//!
//! The store root is a URL (`s3://bucket/prefix`, `gs://bucket`,
//! `az://container`, `file:///mnt/hdfs`) or a plain directory path. Cloud
//! credentials come from the usual provider environment variables.
//!
//! `object_store` is async; every call here is driven to completion on a
//! private current-thread runtime so [`RemoteStore`] stays blocking.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::prefix::PrefixStore;
use object_store::{ObjectStore, PutPayload};
use pqc_common::FileDescriptor;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, trace};
use url::Url;

use super::{join_path, RemoteStore, StoreError, StoreOp};

/// Provider behind a store URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreProvider {
    Local,
    AmazonS3,
    GoogleCloudStorage,
    MicrosoftAzure,
}

impl StoreProvider {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "file" => Some(StoreProvider::Local),
            "s3" | "s3a" => Some(StoreProvider::AmazonS3),
            "gs" => Some(StoreProvider::GoogleCloudStorage),
            "az" | "azure" | "abfs" | "abfss" => Some(StoreProvider::MicrosoftAzure),
            _ => None,
        }
    }
}

/// [`RemoteStore`] over any [`ObjectStore`].
pub struct ObjectStoreRemote {
    store: Arc<dyn ObjectStore>,
    location: String,
    runtime: Runtime,
}

impl std::fmt::Debug for ObjectStoreRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreRemote")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreRemote {
    /// Wrap an existing object store. `location` is only used in logs and reports.
    pub fn new(store: Arc<dyn ObjectStore>, location: impl Into<String>) -> Result<Self, StoreError> {
        let location = location.into();
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::open(&location, e))?;
        Ok(Self {
            store,
            location,
            runtime,
        })
    }

    /// Open the store at `root`, a URL or a local directory.
    ///
    /// Paths passed to the [`RemoteStore`] methods are relative to `root`.
    pub fn open(root: &str) -> Result<Self, StoreError> {
        match Url::parse(root) {
            Ok(url) if url.scheme().len() > 1 => Self::open_url(root, &url),
            // Not a URL, or a Windows drive letter parsed as a scheme.
            _ => Self::open_dir(root, PathBuf::from(root)),
        }
    }

    fn open_url(root: &str, url: &Url) -> Result<Self, StoreError> {
        let provider = StoreProvider::from_scheme(url.scheme()).ok_or_else(|| {
            StoreError::open(root, format!("unsupported scheme '{}'", url.scheme()))
        })?;
        let built: Arc<dyn ObjectStore> = match provider {
            StoreProvider::Local => {
                let dir = url
                    .to_file_path()
                    .map_err(|()| StoreError::open(root, "not a local file URL"))?;
                return Self::open_dir(root, dir);
            }
            StoreProvider::AmazonS3 => Arc::new(
                AmazonS3Builder::from_env()
                    .with_url(url.as_str())
                    .build()
                    .map_err(|e| StoreError::open(root, e))?,
            ),
            StoreProvider::GoogleCloudStorage => Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_url(url.as_str())
                    .build()
                    .map_err(|e| StoreError::open(root, e))?,
            ),
            StoreProvider::MicrosoftAzure => Arc::new(
                MicrosoftAzureBuilder::from_env()
                    .with_url(url.as_str())
                    .build()
                    .map_err(|e| StoreError::open(root, e))?,
            ),
        };

        let prefix = ObjectPath::from_url_path(url.path()).map_err(|e| StoreError::open(root, e))?;
        debug!(root, ?provider, prefix = %prefix, "opened object store");
        let store: Arc<dyn ObjectStore> = if prefix.as_ref().is_empty() {
            built
        } else {
            Arc::new(PrefixStore::new(built, prefix))
        };
        Self::new(store, root)
    }

    fn open_dir(root: &str, dir: PathBuf) -> Result<Self, StoreError> {
        let store =
            LocalFileSystem::new_with_prefix(&dir).map_err(|e| StoreError::open(root, e))?;
        debug!(root, dir = %dir.display(), "opened local store");
        Self::new(Arc::new(store), root)
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Parse a store-relative path, refusing empty, `.` and `..` segments.
fn object_path(op: StoreOp, path: &str) -> Result<ObjectPath, StoreError> {
    ObjectPath::parse(path.trim_matches('/')).map_err(|e| StoreError::transfer(op, path, e))
}

fn map_error(op: StoreOp, path: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::NotFound(path.to_string()),
        other => StoreError::transfer(op, path, other),
    }
}

impl RemoteStore for ObjectStoreRemote {
    fn list(&self, dir: &str) -> Result<Vec<FileDescriptor>, StoreError> {
        let prefix = object_path(StoreOp::List, dir)?;
        let prefix = (!prefix.as_ref().is_empty()).then_some(prefix);
        let listed = self
            .block_on(self.store.list_with_delimiter(prefix.as_ref()))
            .map_err(|e| map_error(StoreOp::List, dir, e))?;

        // Object stores have no directories: a prefix with nothing under it is missing.
        if listed.objects.is_empty() && listed.common_prefixes.is_empty() {
            return Err(StoreError::NotFound(dir.to_string()));
        }

        let mut files: Vec<FileDescriptor> = listed
            .objects
            .into_iter()
            .filter_map(|meta| {
                let name = meta.location.filename()?.to_string();
                Some(FileDescriptor::new(join_path(dir, &name), meta.size as u64))
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        trace!(dir, files = files.len(), "listed prefix");
        Ok(files)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let location = object_path(StoreOp::Get, path)?;
        let bytes = self
            .block_on(async {
                let result = self.store.get(&location).await?;
                result.bytes().await
            })
            .map_err(|e| map_error(StoreOp::Get, path, e))?;
        Ok(bytes.to_vec())
    }

    fn put(&self, bytes: &[u8], path: &str) -> Result<(), StoreError> {
        let location = object_path(StoreOp::Put, path)?;
        let payload = PutPayload::from(bytes.to_vec());
        self.block_on(self.store.put(&location, payload))
            .map(|_| ())
            .map_err(|e| map_error(StoreOp::Put, path, e))
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        let location = object_path(StoreOp::Delete, path)?;
        self.block_on(self.store.delete(&location))
            .map_err(|e| map_error(StoreOp::Delete, path, e))
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}
