//! In-memory object store used by the test suite and local development.
//! Tracks write operations and supports per-path failure injection so the
//! jobs' dry-run purity and failure-tolerance guarantees can be asserted.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::object_store::{ObjectStore, RemoveOutcome, StorageError, StorageResult};

pub struct MemoryObjectStore {
    public_base: String,
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_paths: Mutex<HashSet<String>>,
    write_ops: AtomicU64,
}

impl MemoryObjectStore {
    pub fn new(public_base: impl Into<String>) -> Self {
        let mut public_base = public_base.into();
        if !public_base.ends_with('/') {
            public_base.push('/');
        }
        Self {
            public_base,
            objects: Mutex::new(BTreeMap::new()),
            fail_paths: Mutex::new(HashSet::new()),
            write_ops: AtomicU64::new(0),
        }
    }

    /// Seeds an object without counting it as a write operation.
    pub fn seed(&self, path: &str, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .expect("lock objects")
            .insert(path.to_string(), data.into());
    }

    /// Any download/upload/remove touching `path` will fail afterwards.
    pub fn fail_on(&self, path: &str) {
        self.fail_paths
            .lock()
            .expect("lock fail paths")
            .insert(path.to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().expect("lock objects").contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("lock objects")
            .keys()
            .cloned()
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("lock objects").len()
    }

    /// Number of mutating calls (uploads + removes) since construction.
    pub fn write_ops(&self) -> u64 {
        self.write_ops.load(Ordering::SeqCst)
    }

    fn should_fail(&self, path: &str) -> bool {
        self.fail_paths.lock().expect("lock fail paths").contains(path)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, path: &str) -> StorageResult<Bytes> {
        if self.should_fail(path) {
            return Err(StorageError::Request {
                path: path.to_string(),
                message: "injected download failure".to_string(),
            });
        }
        self.objects
            .lock()
            .expect("lock objects")
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        self.write_ops.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(path) {
            return Err(StorageError::Request {
                path: path.to_string(),
                message: "injected upload failure".to_string(),
            });
        }
        self.objects
            .lock()
            .expect("lock objects")
            .insert(path.to_string(), data);
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<Vec<RemoveOutcome>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        self.write_ops.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().expect("lock objects");
        let outcomes = paths
            .iter()
            .map(|path| {
                if self.should_fail(path) {
                    RemoveOutcome::failed(path, "injected remove failure")
                } else {
                    // Deleting an absent object is a no-op, not a failure.
                    objects.remove(path);
                    RemoveOutcome::removed(path)
                }
            })
            .collect();
        Ok(outcomes)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().expect("lock objects").contains_key(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_base, path)
    }
}
