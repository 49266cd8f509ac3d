//! Cache persistence, validation, and atomic replacement.

use std::fs;
use std::path::{Path, PathBuf};

use super::entry::{CacheEntry, CACHE_VERSION};
use crate::scanner::{DigestAlgorithm, FileRecord};

/// Well-known snapshot file name, stored inside the scanned root.
pub const CACHE_FILE_NAME: &str = ".dupescan-cache.json";

/// Outcome of cache validation at the start of a run.
#[derive(Debug)]
pub enum CacheState {
    /// No snapshot exists (or it was unreadable/malformed).
    NoCache,
    /// The snapshot matches the tree exactly; hashing can be skipped.
    Valid(Box<CacheEntry>),
    /// The snapshot no longer matches the tree and must not be used.
    Stale,
}

impl CacheState {
    /// Whether this state allows reuse of cached digests.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, CacheState::Valid(_))
    }
}

/// Errors from reading or writing the snapshot file.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Filesystem error touching the cache file.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache file exists but is not a valid snapshot.
    #[error("Malformed cache file {path}: {source}")]
    Malformed {
        /// Cache file path
        path: PathBuf,
        /// The underlying decode error
        #[source]
        source: serde_json::Error,
    },
}

/// Handle to the snapshot file for one scanned root.
///
/// Explicitly passed, never a process-wide singleton; a single pipeline
/// run owns the file for the run's duration.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// Cache store for the snapshot belonging to `root`.
    #[must_use]
    pub fn for_root(root: &Path) -> Self {
        Self {
            path: root.join(CACHE_FILE_NAME),
        }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot if one exists.
    ///
    /// A missing file yields `Ok(None)`. Corruption is an error so callers
    /// can log it, but the pipeline treats it exactly like `None`.
    pub fn load(&self) -> Result<Option<CacheEntry>, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let entry: CacheEntry =
            serde_json::from_str(&content).map_err(|e| CacheError::Malformed {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(Some(entry))
    }

    /// Load and validate the snapshot against the current tree.
    ///
    /// `records` is the current metadata-only walk of the tree. The
    /// snapshot is stale if any recorded file is missing, resized, or
    /// touched, if any on-disk file is absent from the snapshot, or if the
    /// digest configuration changed. `force` bypasses validation entirely.
    #[must_use]
    pub fn evaluate(
        &self,
        records: &[FileRecord],
        algorithm: DigestAlgorithm,
        partial_chunk_bytes: usize,
        force: bool,
    ) -> CacheState {
        let entry = match self.load() {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                log::debug!("No cache snapshot at {}", self.path.display());
                return CacheState::NoCache;
            }
            Err(e) => {
                log::warn!("{}; treating as no cache", e);
                return CacheState::NoCache;
            }
        };

        if force {
            log::info!("Force rescan requested, ignoring cache snapshot");
            return CacheState::Stale;
        }

        if entry.version != CACHE_VERSION {
            log::info!(
                "Cache snapshot version {} != {}, rescanning",
                entry.version,
                CACHE_VERSION
            );
            return CacheState::Stale;
        }

        if entry.algorithm != algorithm || entry.partial_chunk_bytes != partial_chunk_bytes {
            log::info!("Digest configuration changed, cache snapshot unusable");
            return CacheState::Stale;
        }

        // Same file count + every snapshot matched by path means the path
        // sets are equal: no additions, no deletions.
        if entry.files.len() != records.len() {
            log::info!(
                "Tree changed: {} files on disk, {} in snapshot",
                records.len(),
                entry.files.len()
            );
            return CacheState::Stale;
        }

        let current: std::collections::HashMap<&Path, &FileRecord> = records
            .iter()
            .map(|record| (record.path.as_path(), record))
            .collect();

        for snapshot in &entry.files {
            match current.get(snapshot.path.as_path()) {
                Some(record) if snapshot.matches(record.size, record.modified) => {}
                Some(_) => {
                    log::info!(
                        "Cache stale: metadata changed for {}",
                        snapshot.path.display()
                    );
                    return CacheState::Stale;
                }
                None => {
                    log::info!("Cache stale: {} is gone", snapshot.path.display());
                    return CacheState::Stale;
                }
            }
        }

        log::info!(
            "Cache snapshot valid ({} files, created {})",
            entry.files.len(),
            entry.created_at
        );
        CacheState::Valid(Box::new(entry))
    }

    /// Persist a snapshot atomically.
    ///
    /// Writes to a sibling temp file and renames over the previous
    /// snapshot, so a crash mid-write never leaves a corrupt cache. The
    /// temp file is removed on any failure path.
    pub fn persist(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let tmp_path = self.path.with_extension("json.tmp");

        let write_result = (|| -> Result<(), CacheError> {
            let json = serde_json::to_string_pretty(entry).map_err(|e| CacheError::Malformed {
                path: tmp_path.clone(),
                source: e,
            })?;
            fs::write(&tmp_path, json).map_err(|e| CacheError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
            fs::rename(&tmp_path, &self.path).map_err(|e| CacheError::Io {
                path: self.path.clone(),
                source: e,
            })
        })();

        if write_result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        } else {
            log::debug!(
                "Cache snapshot written to {} ({} files)",
                self.path.display(),
                entry.files.len()
            );
        }
        write_result
    }

    /// Delete the snapshot file if present.
    pub fn invalidate(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
