//! Blob storage collaborators for the encryption pipeline.
//!
//! Paths handed to a [`BlobStore`] are relative and `/`-separated
//! (`aes/file-42.enc`). Each backend decides where they live.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{self, BoxFuture};
use thiserror::Error;
use tracing::{debug, trace};

/// Storage failures, kept apart from cryptographic ones so callers can tell
/// "blob gone" from "wrong key".
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {path}")]
    NotFound { path: String },

    #[error("IO error during {op} on {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    fn from_io(op: &'static str, path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                path: path.to_string(),
            }
        } else {
            StorageError::Io {
                op,
                path: path.to_string(),
                source,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Byte-level blob store shared by concurrent callers.
pub trait BlobStore: Send + Sync + 'static {
    /// Create a directory (and parents). Succeeds if it already exists.
    fn ensure_dir<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Write a whole blob, replacing any previous content.
    fn write<'a>(&'a self, relative: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Read a whole blob. A missing blob is [`StorageError::NotFound`].
    fn read<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;

    /// Remove a blob. Returns `false` if it was already absent.
    fn delete<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool>>;

    fn exists<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool>>;
}

/// Reject absolute paths and anything that climbs out of the root.
fn check_relative(relative: &str) -> Result<&Path> {
    let path = Path::new(relative);
    if relative.is_empty()
        || !path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(StorageError::InvalidPath(relative.to_string()));
    }
    Ok(path)
}

/// Filesystem backend rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative blob path.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        Ok(self.root.join(check_relative(relative)?))
    }
}

impl BlobStore for FsBlobStore {
    fn ensure_dir<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = self.resolve(relative)?;
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| StorageError::from_io("create_dir", relative, e))?;
            trace!(path = %path.display(), "directory ready");
            Ok(())
        })
    }

    fn write<'a>(&'a self, relative: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = self.resolve(relative)?;
            tokio::fs::write(&path, data)
                .await
                .map_err(|e| StorageError::Io {
                    op: "write",
                    path: relative.to_string(),
                    source: e,
                })?;
            debug!(path = relative, bytes = data.len(), "blob written");
            Ok(())
        })
    }

    fn read<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let path = self.resolve(relative)?;
            tokio::fs::read(&path)
                .await
                .map_err(|e| StorageError::from_io("read", relative, e))
        })
    }

    fn delete<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let path = self.resolve(relative)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(StorageError::Io {
                    op: "delete",
                    path: relative.to_string(),
                    source: e,
                }),
            }
        })
    }

    fn exists<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let path = self.resolve(relative)?;
            tokio::fs::try_exists(&path)
                .await
                .map_err(|e| StorageError::from_io("exists", relative, e))
        })
    }
}

#[derive(Default)]
struct Inner {
    blobs: HashMap<String, Vec<u8>>,
    dirs: HashSet<String>,
    failing_prefixes: Vec<String>,
}

/// In-memory backend used for testing and scaffolding.
///
/// Writes under a prefix registered with [`InMemoryBlobStore::fail_writes_under`]
/// return an IO error, which lets tests drive partial-failure paths.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_writes_under(&self, prefix: impl Into<String>) {
        self.lock().failing_prefixes.push(prefix.into());
    }

    /// Stored blob paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().blobs.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn has_dir(&self, relative: &str) -> bool {
        self.lock().dirs.contains(relative)
    }

    /// Overwrite a stored blob directly, bypassing failure injection.
    pub fn put_raw(&self, relative: &str, data: Vec<u8>) {
        self.lock().blobs.insert(relative.to_string(), data);
    }
}

impl BlobStore for InMemoryBlobStore {
    fn ensure_dir<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<()>> {
        let result = check_relative(relative).map(|_| {
            self.lock().dirs.insert(relative.to_string());
        });
        Box::pin(future::ready(result))
    }

    fn write<'a>(&'a self, relative: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        let result = check_relative(relative).and_then(|_| {
            let mut guard = self.lock();
            if guard
                .failing_prefixes
                .iter()
                .any(|prefix| relative.starts_with(prefix.as_str()))
            {
                return Err(StorageError::Io {
                    op: "write",
                    path: relative.to_string(),
                    source: io::Error::other("injected write failure"),
                });
            }
            guard.blobs.insert(relative.to_string(), data.to_vec());
            Ok(())
        });
        Box::pin(future::ready(result))
    }

    fn read<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        let result = check_relative(relative).and_then(|_| {
            self.lock()
                .blobs
                .get(relative)
                .cloned()
                .ok_or_else(|| StorageError::NotFound {
                    path: relative.to_string(),
                })
        });
        Box::pin(future::ready(result))
    }

    fn delete<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool>> {
        let result =
            check_relative(relative).map(|_| self.lock().blobs.remove(relative).is_some());
        Box::pin(future::ready(result))
    }

    fn exists<'a>(&'a self, relative: &'a str) -> BoxFuture<'a, Result<bool>> {
        let result = check_relative(relative).map(|_| self.lock().blobs.contains_key(relative));
        Box::pin(future::ready(result))
    }
}
