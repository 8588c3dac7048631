use bb_core::Cache;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt job cache {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The job cache on disk: one JSON object mapping job id to record.
///
/// Only the dashboard's main loop touches the file, so there is no locking.
#[derive(Debug, Clone)]
pub struct JobStore {
    path: PathBuf,
}

impl JobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty cache, not an error.
    pub fn load(&self) -> Result<Cache, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Cache::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        // an explicit `null` is what an emptied cache used to be written as
        let cache: Option<Cache> =
            serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        let cache = cache.unwrap_or_default();
        debug!(path = %self.path.display(), jobs = cache.len(), "job cache loaded");
        Ok(cache)
    }

    /// Like [`JobStore::load`], but an unreadable file degrades to an empty
    /// cache. The error is handed back so the caller can tell the operator.
    pub fn load_or_empty(&self) -> (Cache, Option<StoreError>) {
        match self.load() {
            Ok(cache) => (cache, None),
            Err(err) => {
                warn!(error = %err, "starting with an empty job cache");
                (Cache::new(), Some(err))
            }
        }
    }

    /// Writes the whole cache to a sibling temp file and renames it into
    /// place, so a reader sees either the old file or the new one.
    pub fn save(&self, cache: &Cache) -> Result<(), StoreError> {
        let payload = serde_json::to_vec(cache).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &payload)?;
        debug!(path = %self.path.display(), jobs = cache.len(), "job cache saved");
        Ok(())
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| StoreError::Io { path, source }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let temp_path = match path.file_name() {
        Some(name) => path.with_file_name(format!("{}.tmp", name.to_string_lossy())),
        None => path.with_extension("tmp"),
    };

    fs::write(&temp_path, payload).map_err(io_err(&temp_path))?;
    fs::rename(&temp_path, path).map_err(io_err(path))?;
    Ok(())
}
