//! On-disk cache for materialized range queries
//!
//! One flat directory, one file per query, filename derived from the query
//! text alone: the lowercase hex SHA-256 digest of its UTF-8 bytes, plus a
//! fixed extension. Tables serialize with bincode, which stores `f64` bit
//! patterns verbatim, so grid timestamps and NaN cells round-trip exactly.
//!
//! The cache is a shared filesystem resource with no locking: concurrent
//! processes computing the same key race on read/write, and writes are not
//! atomic with respect to readers. A write-to-temp-then-rename scheme would
//! close that gap but is not implemented here.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::table::Matrix;

/// Extension for cache entry files
const CACHE_FILE_EXT: &str = "bin";

/// File-backed cache of materialized range-query tables
#[derive(Debug, Clone)]
pub struct QueryCache {
    dir: PathBuf,
}

impl QueryCache {
    /// Create a cache rooted at `dir`
    ///
    /// The directory is not created here; [`QueryCache::store`] creates it
    /// lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Derive the cache key for a query
    ///
    /// Lowercase hex SHA-256 of the UTF-8 query text. The key is a pure
    /// function of the text only: two range queries with identical text but
    /// different `(start, end, step)` windows produce the same key, so one
    /// will serve the other's cached table. Callers that vary the window for
    /// a fixed query must flush between calls.
    pub fn key_for(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Look up a previously stored table
    ///
    /// Returns `Ok(None)` when the cache directory or the entry file does not
    /// exist; never creates the directory. A file that exists but fails to
    /// deserialize is reported as corruption rather than a miss.
    pub fn lookup(&self, key: &str) -> Result<Option<Matrix>> {
        let path = self.entry_path(key);
        if !path.exists() {
            debug!(key, "cache miss");
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(CacheError::Io)?;
        let table = bincode::deserialize(&bytes).map_err(|e| {
            warn!(key, path = %path.display(), "corrupt cache entry");
            CacheError::Corrupt {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        debug!(key, "cache hit");
        Ok(Some(table))
    }

    /// Store a table under `key`, creating the cache directory if needed
    pub fn store(&self, key: &str, table: &Matrix) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(CacheError::Io)?;
        }

        let bytes = bincode::serialize(table).map_err(CacheError::Serialize)?;
        let path = self.entry_path(key);
        fs::write(&path, bytes).map_err(CacheError::Io)?;
        debug!(key, path = %path.display(), "stored cache entry");
        Ok(())
    }

    /// Delete the entry for a single key
    ///
    /// Deleting a key that was never stored is an error; callers are expected
    /// to track what they cached.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        fs::remove_file(self.entry_path(key)).map_err(CacheError::Io)?;
        debug!(key, "invalidated cache entry");
        Ok(())
    }

    /// Remove the entire cache directory tree; no-op if it does not exist
    pub fn invalidate_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                debug!(dir = %self.dir.display(), "flushed cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(e).into()),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, CACHE_FILE_EXT))
    }
}
