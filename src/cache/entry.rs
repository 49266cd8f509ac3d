//! Cache snapshot data model.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scanner::{digest_to_hex, hex_to_digest, Digest, DigestAlgorithm, FileRecord};

/// Snapshot format version; bump on incompatible layout changes.
pub const CACHE_VERSION: u32 = 1;

/// Recorded state of one file at the time of the last successful scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Absolute path
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time at scan time
    pub mtime: DateTime<Utc>,
    /// Full content digest, hex-encoded
    pub digest: String,
}

impl FileSnapshot {
    /// Snapshot a scanned record with its computed digest.
    #[must_use]
    pub fn new(record: &FileRecord, digest: &Digest) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            mtime: DateTime::<Utc>::from(record.modified),
            digest: digest_to_hex(digest),
        }
    }

    /// Check whether the snapshot still matches a file's current metadata.
    /// Comparison is exact: any size or mtime drift makes it stale.
    #[must_use]
    pub fn matches(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.mtime == DateTime::<Utc>::from(modified)
    }
}

/// A persisted scan snapshot for one tree root.
///
/// Written only after a complete successful run; an interrupted scan never
/// produces one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Snapshot format version
    pub version: u32,
    /// Root of the scanned tree
    pub root: PathBuf,
    /// When the snapshot was created
    pub created_at: DateTime<Utc>,
    /// Digest algorithm the snapshot was built with
    pub algorithm: DigestAlgorithm,
    /// Partial-digest chunk size the scan used
    pub partial_chunk_bytes: usize,
    /// Per-file snapshots, sorted by path
    pub files: Vec<FileSnapshot>,
}

impl CacheEntry {
    /// Build a snapshot from scanned records and their digests.
    ///
    /// Records without a digest (hashing failed during the run) are left
    /// out; the next run will see them as additions and rescan.
    #[must_use]
    pub fn from_scan(
        root: &Path,
        records: &[FileRecord],
        digests: &HashMap<PathBuf, Digest>,
        algorithm: DigestAlgorithm,
        partial_chunk_bytes: usize,
    ) -> Self {
        let mut files: Vec<FileSnapshot> = records
            .iter()
            .filter_map(|record| {
                digests
                    .get(&record.path)
                    .map(|digest| FileSnapshot::new(record, digest))
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            version: CACHE_VERSION,
            root: root.to_path_buf(),
            created_at: Utc::now(),
            algorithm,
            partial_chunk_bytes,
            files,
        }
    }

    /// Decode the recorded digests back into a path-to-digest map.
    ///
    /// Entries with an undecodable digest are dropped with a warning.
    #[must_use]
    pub fn digest_map(&self) -> HashMap<PathBuf, Digest> {
        self.files
            .iter()
            .filter_map(|snapshot| match hex_to_digest(&snapshot.digest) {
                Some(digest) => Some((snapshot.path.clone(), digest)),
                None => {
                    log::warn!(
                        "Cache entry for {} has a malformed digest, skipping",
                        snapshot.path.display()
                    );
                    None
                }
            })
            .collect()
    }
}
