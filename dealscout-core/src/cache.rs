//! Disk-persisted result cache.
//!
//! Keys are a digest of (function identity, arguments); values are the text
//! the wrapped call produced. Entries survive process restarts and are never
//! expired by the system — clearing the store is an operator action. An
//! in-process map fronts the disk so repeat hits within a session stay cheap.
//!
//! Concurrency: lookups and stores take the map lock briefly; the wrapped
//! computation runs with no lock held. Two tasks racing on the same cold key
//! may both compute (duplicate work is tolerated), but the atomic
//! write-then-rename means a reader never observes a half-written entry.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config;

/// On-disk record; the scope tag makes entries inspectable by hand.
#[derive(Serialize, Deserialize)]
struct CacheRecord {
    scope: String,
    value: String,
}

pub struct ResultCache {
    dir: PathBuf,
    memory: RwLock<HashMap<String, String>>,
}

impl ResultCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            memory: RwLock::new(HashMap::new()),
        })
    }

    /// Open the cache at the configured default location.
    pub fn open_default() -> io::Result<Self> {
        Self::open(config::cache_dir())
    }

    pub fn location(&self) -> &Path {
        &self.dir
    }

    /// Deterministic key for (function identity, arguments). Arguments are
    /// length-prefixed before hashing so no two argument lists collide by
    /// concatenation.
    pub fn key(scope: &str, args: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(scope.as_bytes());
        hasher.update([0x1f]);
        for arg in args {
            hasher.update((arg.len() as u64).to_le_bytes());
            hasher.update(arg.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Return the cached value for (scope, args), or run `compute`, store its
    /// success, and return it. Compute errors are returned as-is and never
    /// cached; storage problems degrade to a cache miss or a lost write, not
    /// a call failure.
    pub async fn get_or_compute<E, F, Fut>(
        &self,
        scope: &str,
        args: &[&str],
        compute: F,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let key = Self::key(scope, args);
        if let Some(value) = self.lookup(&key) {
            debug!(scope, key = %&key[..12], "cache hit");
            return Ok(value);
        }
        debug!(scope, key = %&key[..12], "cache miss; computing");
        let value = compute().await?;
        self.store(&key, scope, &value);
        Ok(value)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        {
            let memory = self.memory.read().unwrap_or_else(|p| p.into_inner());
            if let Some(value) = memory.get(key) {
                return Some(value.clone());
            }
        }
        let raw = std::fs::read_to_string(self.entry_path(key)).ok()?;
        let record: CacheRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(key = %&key[..12], %err, "unreadable cache entry; treating as miss");
                return None;
            }
        };
        let mut memory = self.memory.write().unwrap_or_else(|p| p.into_inner());
        memory
            .entry(key.to_string())
            .or_insert_with(|| record.value.clone());
        Some(record.value)
    }

    fn store(&self, key: &str, scope: &str, value: &str) {
        {
            let mut memory = self.memory.write().unwrap_or_else(|p| p.into_inner());
            memory.insert(key.to_string(), value.to_string());
        }
        let record = CacheRecord {
            scope: scope.to_string(),
            value: value.to_string(),
        };
        if let Err(err) = self.persist(key, &record) {
            warn!(key = %&key[..12], %err, "failed to persist cache entry");
        }
    }

    fn persist(&self, key: &str, record: &CacheRecord) -> io::Result<()> {
        let serialized = serde_json::to_string(record)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        // Write-then-rename keeps partially written entries invisible.
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), serialized)?;
        tmp.persist(self.entry_path(key))
            .map_err(|err| err.error)?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Number of entries on disk.
    pub fn entry_count(&self) -> io::Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Remove every entry, returning how many were deleted.
    pub fn clear(&self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        let mut memory = self.memory.write().unwrap_or_else(|p| p.into_inner());
        memory.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn compute_once(
        cache: &ResultCache,
        counter: &AtomicUsize,
        value: &str,
    ) -> Result<String, Infallible> {
        cache
            .get_or_compute("test_fn", &["acme.io"], || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(value.to_string())
            })
            .await
    }

    #[tokio::test]
    async fn identical_keys_compute_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let counter = AtomicUsize::new(0);

        let first = compute_once(&cache, &counter, "alpha").await.unwrap();
        let second = compute_once(&cache, &counter, "beta").await.unwrap();
        assert_eq!(first, "alpha");
        assert_eq!(second, "alpha");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn entries_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = ResultCache::open(dir.path()).unwrap();
            let counter = AtomicUsize::new(0);
            compute_once(&cache, &counter, "persisted").await.unwrap();
        }
        let reopened = ResultCache::open(dir.path()).unwrap();
        let counter = AtomicUsize::new(0);
        let value = compute_once(&reopened, &counter, "fresh").await.unwrap();
        assert_eq!(value, "persisted");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();

        let failed: Result<String, String> = cache
            .get_or_compute("test_fn", &["x"], || async { Err("boom".to_string()) })
            .await;
        assert!(failed.is_err());

        let ok: Result<String, String> = cache
            .get_or_compute("test_fn", &["x"], || async { Ok("recovered".to_string()) })
            .await;
        assert_eq!(ok.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn distinct_args_get_distinct_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let a: Result<String, Infallible> = cache
            .get_or_compute("f", &["ab", "c"], || async { Ok("one".into()) })
            .await;
        let b: Result<String, Infallible> = cache
            .get_or_compute("f", &["a", "bc"], || async { Ok("two".into()) })
            .await;
        assert_eq!(a.unwrap(), "one");
        assert_eq!(b.unwrap(), "two");
        assert_eq!(cache.entry_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn clear_removes_disk_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let counter = AtomicUsize::new(0);
        compute_once(&cache, &counter, "v").await.unwrap();
        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.entry_count().unwrap(), 0);
        compute_once(&cache, &counter, "v2").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn racing_cold_computes_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ResultCache::open(dir.path()).unwrap());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let value: Result<String, Infallible> = cache
                    .get_or_compute("race", &["key"], || async {
                        tokio::task::yield_now().await;
                        Ok("settled".to_string())
                    })
                    .await;
                value.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "settled");
        }
        assert_eq!(cache.entry_count().unwrap(), 1);
    }
}
