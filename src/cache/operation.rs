//! Content-addressed operation cache.
//!
//! Re-architected from a process-wide singleton into an explicit handle: callers create one
//! [`OperationCache`] at startup and pass it down, so tests and parallel workers can each hold
//! their own instance instead of racing on global state.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use fs_err as fs;
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

/// Implemented by every type passed as an argument to a cached operation. Fields that shouldn't
/// participate in the cache key (e.g. a progress callback, a shared client handle) are simply
/// left out of the returned list, replacing the source's `__`-substring naming convention with an
/// explicit opt-in.
pub trait FingerprintParts {
    fn fingerprint_parts(&self) -> Vec<(String, String)>;
}

impl FingerprintParts for String {
    fn fingerprint_parts(&self) -> Vec<(String, String)> {
        vec![("value".to_string(), self.clone())]
    }
}

impl FingerprintParts for str {
    fn fingerprint_parts(&self) -> Vec<(String, String)> {
        vec![("value".to_string(), self.to_string())]
    }
}

impl<T: FingerprintParts> FingerprintParts for Vec<T> {
    fn fingerprint_parts(&self) -> Vec<(String, String)> {
        self.iter()
            .enumerate()
            .flat_map(|(i, item)| {
                item.fingerprint_parts()
                    .into_iter()
                    .map(move |(k, v)| (format!("{i}.{k}"), v))
            })
            .collect()
    }
}

/// Builds the fingerprint string for one call: `function_name` plus every argument's
/// `fingerprint_parts`, each rendered as `field=value` and joined deterministically.
fn fingerprint(function_name: &str, args: &[&dyn FingerprintParts]) -> String {
    let mut rendered = Vec::new();
    for arg in args {
        for (field, value) in arg.fingerprint_parts() {
            rendered.push(format!("{field}={value}"));
        }
    }
    format!("{function_name}({})", rendered.join(","))
}

/// Cache key: a readable prefix (truncated function name) followed by the SHA-256 of the full
/// fingerprint, so collisions across functions with similar argument shapes are still impossible.
fn cache_key(function_name: &str, fp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fp.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{function_name}-{}", &digest[..16])
}

#[derive(Debug, Serialize, serde::Deserialize)]
struct CacheEntryMetadata {
    function: String,
    fingerprint: String,
}

#[derive(Debug, Serialize, serde::Deserialize)]
struct CacheEntry<T> {
    metadata: CacheEntryMetadata,
    result: T,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub total_calls: AtomicU64,
    pub hits: AtomicU64,
    pub hash_errors: AtomicU64,
    pub retrieve_errors: AtomicU64,
    pub store_errors: AtomicU64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "calls: {}, hits: {}, hash errors: {}, retrieve errors: {}, store errors: {}",
            self.total_calls.load(Ordering::Relaxed),
            self.hits.load(Ordering::Relaxed),
            self.hash_errors.load(Ordering::Relaxed),
            self.retrieve_errors.load(Ordering::Relaxed),
            self.store_errors.load(Ordering::Relaxed),
        )
    }
}

/// An explicit handle to the content-addressed disk cache under `<root>/<function_name>/<key>.json`.
#[derive(Debug)]
pub struct OperationCache {
    root: PathBuf,
    write_only: bool,
    stats: CacheStats,
}

impl OperationCache {
    pub fn new(root: PathBuf, write_only: bool) -> Self {
        Self {
            root,
            write_only,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn entry_path(&self, function_name: &str, key: &str) -> PathBuf {
        self.root.join(function_name).join(format!("{key}.json"))
    }

    /// Runs `compute` only on a cache miss (or in write-only mode, which never reads), and stores
    /// its result for next time. Any cache I/O error is logged and treated as a miss -- a failed
    /// cache is never allowed to fail the caller's actual work.
    pub fn call<T, F>(
        &self,
        function_name: &str,
        args: &[&dyn FingerprintParts],
        compute: F,
    ) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.stats.total_calls.fetch_add(1, Ordering::Relaxed);

        let fp = fingerprint(function_name, args);
        let key = cache_key(function_name, &fp);
        let path = self.entry_path(function_name, &key);

        if !self.write_only {
            match self.read_entry::<T>(&path, function_name, &fp) {
                Ok(Some(result)) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return result;
                }
                Ok(None) => {}
                Err(e) => {
                    log::debug!("cache retrieve error for {function_name}: {e}");
                    self.stats.retrieve_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let result = compute();
        if let Err(e) = self.write_entry(&path, function_name, &fp, &result) {
            log::debug!("cache store error for {function_name}: {e}");
            self.stats.store_errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn read_entry<T: DeserializeOwned>(
        &self,
        path: &PathBuf,
        function_name: &str,
        fp: &str,
    ) -> Result<Option<T>, std::io::Error> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let entry: CacheEntry<T> = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if entry.metadata.function != function_name || entry.metadata.fingerprint != fp {
            return Ok(None);
        }
        Ok(Some(entry.result))
    }

    fn write_entry<T: Serialize>(
        &self,
        path: &PathBuf,
        function_name: &str,
        fp: &str,
        result: &T,
    ) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entry = CacheEntry {
            metadata: CacheEntryMetadata {
                function: function_name.to_string(),
                fingerprint: fp.to_string(),
            },
            result,
        };
        let serialized = serde_json::to_string_pretty(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, serialized)
    }

    /// Removes every file under the cache directory.
    pub fn clear(&self) -> Result<(), std::io::Error> {
        if self.root.is_dir() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_and_replays_result() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = OperationCache::new(tmp.path().to_path_buf(), false);

        let calls = std::cell::Cell::new(0);
        let name = "suggest_repos".to_string();

        let first: i32 = cache.call("suggest_repos", &[&name as &dyn FingerprintParts], || {
            calls.set(calls.get() + 1);
            42
        });
        let second: i32 = cache.call("suggest_repos", &[&name as &dyn FingerprintParts], || {
            calls.set(calls.get() + 1);
            42
        });

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.get(), 1, "second call should have hit the cache");
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn write_only_mode_never_reads() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = OperationCache::new(tmp.path().to_path_buf(), true);

        let calls = std::cell::Cell::new(0);
        let name = "suggest_repos".to_string();

        for _ in 0..2 {
            let _: i32 = cache.call("suggest_repos", &[&name as &dyn FingerprintParts], || {
                calls.set(calls.get() + 1);
                7
            });
        }

        assert_eq!(calls.get(), 2);
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn clear_removes_stored_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = OperationCache::new(tmp.path().to_path_buf(), false);
        let name = "suggest_repos".to_string();

        let _: i32 = cache.call("suggest_repos", &[&name as &dyn FingerprintParts], || 1);
        assert!(tmp.path().join("suggest_repos").is_dir());

        cache.clear().unwrap();
        assert!(!tmp.path().join("suggest_repos").exists());
    }
}
