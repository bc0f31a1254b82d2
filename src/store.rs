//! Key-value persistence for snapshots and stored event batches
//!
//! The aggregator only needs three operations from its store. Failures are
//! reported as errors here; the aggregator decides they are never fatal.

use crate::error::AnalyticsError;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Blob store addressed by string keys
pub trait SnapshotStore {
    /// Read a blob, `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AnalyticsError>;

    /// Write a blob, replacing any previous value
    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), AnalyticsError>;

    /// Delete a blob; removing an absent key succeeds
    fn remove(&mut self, key: &str) -> Result<(), AnalyticsError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AnalyticsError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), AnalyticsError> {
        (**self).set(key, bytes)
    }

    fn remove(&mut self, key: &str) -> Result<(), AnalyticsError> {
        (**self).remove(key)
    }
}

/// Process-local store, used by tests and the stateless pipeline
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AnalyticsError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), AnalyticsError> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), AnalyticsError> {
        self.blobs.remove(key);
        Ok(())
    }
}

/// Directory-backed store: each key is a `<key>.json` file
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a key
    pub fn path_for(&self, key: &str) -> Result<PathBuf, AnalyticsError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(AnalyticsError::Store(format!("invalid key: {key:?}")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AnalyticsError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), AnalyticsError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        // Write then rename so a crash never leaves a half-written snapshot
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), AnalyticsError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
