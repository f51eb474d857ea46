use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use polars::prelude::DataFrame;
use tracing::debug;

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Size and modification time unchanged.
    Hit,
    /// File metadata changed but the content hash did not.
    Revalidated,
    /// First load of this path.
    Loaded,
    /// Content changed since the cached load.
    Reloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

struct CacheEntry {
    stamp: FileStamp,
    content_hash: blake3::Hash,
    data: Arc<DataFrame>,
}

/// Read-through cache of loaded datasets keyed by canonical path.
///
/// An entry is served as long as the file's size and mtime match what was seen at load time.
/// When they differ the file is re-hashed with BLAKE3 and only reloaded if the bytes changed.
#[derive(Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<F, E>(
        &mut self,
        path: &Path,
        load: F,
    ) -> Result<(Arc<DataFrame>, CacheOutcome), E>
    where
        F: FnOnce(&Path) -> Result<DataFrame, E>,
        E: From<io::Error>,
    {
        let key = fs::canonicalize(path)?;
        let stamp = file_stamp(&key)?;

        let mut fresh_hash = None;
        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.stamp == stamp {
                debug!(path = %key.display(), "dataset cache hit");
                return Ok((Arc::clone(&entry.data), CacheOutcome::Hit));
            }

            let hash = hash_file(&key)?;
            if hash == entry.content_hash {
                entry.stamp = stamp;
                debug!(path = %key.display(), "dataset cache revalidated by content hash");
                return Ok((Arc::clone(&entry.data), CacheOutcome::Revalidated));
            }
            fresh_hash = Some(hash);
        }

        let outcome = if fresh_hash.is_some() {
            CacheOutcome::Reloaded
        } else {
            CacheOutcome::Loaded
        };
        let content_hash = match fresh_hash {
            Some(hash) => hash,
            None => hash_file(&key)?,
        };

        let data = Arc::new(load(&key)?);
        debug!(path = %key.display(), ?outcome, rows = data.height(), "dataset cache filled");
        self.entries.insert(
            key,
            CacheEntry {
                stamp,
                content_hash,
                data: Arc::clone(&data),
            },
        );

        Ok((data, outcome))
    }

    /// Drops the entry for `path`; returns whether one existed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn file_stamp(path: &Path) -> io::Result<FileStamp> {
    let metadata = fs::metadata(path)?;
    Ok(FileStamp {
        len: metadata.len(),
        modified: metadata.modified().ok(),
    })
}

fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}
