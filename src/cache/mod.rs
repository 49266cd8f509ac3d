//! Scan snapshot cache.
//!
//! A successful run persists one JSON snapshot of the whole tree — per-file
//! path, size, mtime, and full digest — inside the scanned root. The next
//! run re-stats every recorded file and walks the tree; if anything was
//! added, removed, resized, or touched, the snapshot is stale and a full
//! rescan happens. A valid snapshot lets the pipeline skip all hashing.
//!
//! The snapshot is written atomically (temp file + rename) and only after a
//! complete run, so a crash or interruption mid-scan never leaves a
//! half-written or misleading cache behind. An unreadable or malformed
//! cache file is treated exactly like a missing one.

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, FileSnapshot};
pub use store::{CacheError, CacheState, CacheStore, CACHE_FILE_NAME};
