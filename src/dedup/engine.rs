//! Stages 2 and 3 of the dedup pipeline: digest narrowing and confirmation.
//!
//! # Overview
//!
//! Within each size group, stage 2 computes partial digests (head + tail
//! sample) to cheaply eliminate files that merely share a size. Stage 3
//! computes full content digests for the survivors; groups of 2+ files with
//! the same full digest become [`DuplicateSet`]s. Stage 2 may produce false
//! positives and is never treated as confirmation; stage 3 is authoritative.
//!
//! Hashing is embarrassingly parallel across files, so both stages run on a
//! bounded rayon pool sized to the configured I/O thread count. Each worker
//! owns the record it hashes; results are collected and regrouped on the
//! calling thread, so grouping is independent of completion order.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::groups::DuplicateSet;
use crate::progress::ProgressCallback;
use crate::scanner::{Digest, FileRecord, Hasher};

/// Configuration shared by the hashing stages.
#[derive(Clone, Default)]
pub struct StageConfig {
    /// Number of worker threads for parallel hashing.
    /// Zero means the number of available processing units.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for StageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl StageConfig {
    /// Set the worker thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn resolved_threads(&self) -> usize {
        if self.io_threads > 0 {
            self.io_threads
        } else {
            std::thread::available_parallelism().map_or(4, |n| n.get())
        }
    }

    fn build_pool(&self) -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.resolved_threads())
            .build()
            .unwrap_or_else(|_| {
                log::warn!("Failed to create bounded thread pool, using fallback");
                rayon::ThreadPoolBuilder::new().build().unwrap()
            })
    }
}

/// Statistics from a hashing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Total files that entered the stage
    pub input_files: usize,
    /// Number of files successfully hashed
    pub hashed_files: usize,
    /// Number of files that failed to hash (excluded from the run)
    pub failed_files: usize,
    /// Human-readable warnings for failed files
    pub warnings: Vec<String>,
    /// Number of files eliminated as unique within their group
    pub eliminated_unique: usize,
    /// Number of files still in contention after the stage
    pub survivors: usize,
    /// Number of groups with 2+ files after the stage
    pub groups: usize,
    /// Total bytes read for hashing
    pub bytes_hashed: u64,
    /// Whether the stage was interrupted by shutdown
    pub interrupted: bool,
}

/// Hash a batch of files in parallel, pairing each record with its digest.
///
/// Failures are recorded as warnings and the file is dropped from the
/// batch; an interrupted run marks `stats.interrupted` and stops hashing.
fn hash_batch(
    files: Vec<FileRecord>,
    hash_fn: impl Fn(&FileRecord) -> Result<Digest, crate::scanner::HashError> + Sync,
    config: &StageConfig,
    stats: &mut StageStats,
) -> Vec<(FileRecord, Digest)> {
    let pool = config.build_pool();
    let results: Vec<(FileRecord, Option<Digest>, Option<String>)> = pool.install(|| {
        files
            .into_par_iter()
            .map(|file| {
                if config.is_shutdown_requested() {
                    return (file, None, None);
                }
                match hash_fn(&file) {
                    Ok(digest) => {
                        if let Some(ref progress) = config.progress {
                            progress.on_progress(1);
                        }
                        (file, Some(digest), None)
                    }
                    Err(e) => {
                        log::warn!("Failed to hash {}: {}", file.path.display(), e);
                        let warning = e.to_string();
                        (file, None, Some(warning))
                    }
                }
            })
            .collect()
    });

    if config.is_shutdown_requested() {
        stats.interrupted = true;
    }

    let mut hashed = Vec::with_capacity(results.len());
    for (file, digest, warning) in results {
        match (digest, warning) {
            (Some(digest), _) => {
                stats.hashed_files += 1;
                hashed.push((file, digest));
            }
            (None, Some(warning)) => {
                stats.failed_files += 1;
                stats.warnings.push(warning);
            }
            // Skipped due to shutdown
            (None, None) => {}
        }
    }
    hashed
}

/// Narrow size groups by partial digest (stage 2).
///
/// For each size group, computes the partial digest of every member and
/// regroups by `(size, partial digest)`. Singleton groups are discarded.
/// A surviving group means its members *might* be identical; only stage 3
/// confirms.
///
/// # Returns
///
/// Groups keyed by `(size, partial digest)` with 2+ members, plus stage
/// statistics.
#[must_use]
pub fn stage2_partial(
    size_groups: HashMap<u64, Vec<FileRecord>>,
    hasher: Arc<Hasher>,
    config: &StageConfig,
) -> (HashMap<(u64, Digest), Vec<FileRecord>>, StageStats) {
    let all_files: Vec<FileRecord> = size_groups.into_values().flatten().collect();
    let mut stats = StageStats {
        input_files: all_files.len(),
        ..Default::default()
    };

    if all_files.is_empty() {
        log::debug!("Stage 2: no files to process");
        return (HashMap::new(), stats);
    }

    if let Some(ref progress) = config.progress {
        progress.on_stage_start("partial digest", all_files.len());
    }
    log::info!(
        "Stage 2: computing partial digests for {} files",
        all_files.len()
    );

    let hashed = hash_batch(
        all_files,
        |file| hasher.partial_digest(&file.path),
        config,
        &mut stats,
    );
    stats.bytes_hashed = hashed
        .iter()
        .map(|(f, _)| f.size.min(2 * hasher.chunk_size() as u64))
        .sum();

    let mut partial_groups: HashMap<(u64, Digest), Vec<FileRecord>> = HashMap::new();
    for (file, digest) in hashed {
        partial_groups
            .entry((file.size, digest))
            .or_default()
            .push(file);
    }

    let filtered: HashMap<(u64, Digest), Vec<FileRecord>> = partial_groups
        .into_iter()
        .filter(|(_, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                false
            } else {
                stats.survivors += files.len();
                stats.groups += 1;
                true
            }
        })
        .collect();

    if let Some(ref progress) = config.progress {
        progress.on_stage_end("partial digest");
    }
    log::info!(
        "Stage 2 complete: {} files, {} still in contention across {} groups",
        stats.input_files,
        stats.survivors,
        stats.groups
    );

    (filtered, stats)
}

/// Confirm duplicates by full digest (stage 3).
///
/// Computes the full content digest for every surviving file and groups by
/// digest. Groups with 2+ members become [`DuplicateSet`]s, guaranteed
/// byte-identical under the digest's collision resistance.
///
/// # Returns
///
/// The confirmed sets (deterministically ordered), the path-to-digest map
/// for every successfully hashed file, and stage statistics.
#[must_use]
pub fn stage3_full(
    partial_groups: HashMap<(u64, Digest), Vec<FileRecord>>,
    hasher: Arc<Hasher>,
    config: &StageConfig,
) -> (Vec<DuplicateSet>, HashMap<PathBuf, Digest>, StageStats) {
    let all_files: Vec<FileRecord> = partial_groups.into_values().flatten().collect();
    let mut stats = StageStats {
        input_files: all_files.len(),
        ..Default::default()
    };

    if all_files.is_empty() {
        log::debug!("Stage 3: no files to process");
        return (Vec::new(), HashMap::new(), stats);
    }

    if let Some(ref progress) = config.progress {
        progress.on_stage_start("full digest", all_files.len());
    }
    log::info!(
        "Stage 3: computing full digests for {} files",
        all_files.len()
    );

    let hashed = hash_batch(
        all_files,
        |file| hasher.full_digest(&file.path),
        config,
        &mut stats,
    );
    stats.bytes_hashed = hashed.iter().map(|(f, _)| f.size).sum();

    let mut digests: HashMap<PathBuf, Digest> = HashMap::with_capacity(hashed.len());
    let mut records: Vec<FileRecord> = Vec::with_capacity(hashed.len());
    for (file, digest) in hashed {
        digests.insert(file.path.clone(), digest);
        records.push(file);
    }

    let sets = build_duplicate_sets(&records, &digests);
    stats.groups = sets.len();
    stats.survivors = sets.iter().map(DuplicateSet::len).sum();
    stats.eliminated_unique = records.len() - stats.survivors;

    if let Some(ref progress) = config.progress {
        progress.on_stage_end("full digest");
    }
    log::info!(
        "Stage 3 complete: {} confirmed duplicate sets covering {} files",
        stats.groups,
        stats.survivors
    );

    (sets, digests, stats)
}

/// Compute full digests for files that do not have one yet.
///
/// Folder signatures need a digest for every file, not just dedup
/// candidates; this fills the gaps after stage 3. Failures become warnings
/// and the file is excluded from the run.
#[must_use]
pub fn complete_digests(
    files: Vec<FileRecord>,
    hasher: Arc<Hasher>,
    config: &StageConfig,
) -> (HashMap<PathBuf, Digest>, StageStats) {
    let mut stats = StageStats {
        input_files: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        return (HashMap::new(), stats);
    }

    if let Some(ref progress) = config.progress {
        progress.on_stage_start("signature completion", files.len());
    }
    log::info!(
        "Completing content signatures for {} remaining files",
        files.len()
    );

    let hashed = hash_batch(
        files,
        |file| hasher.full_digest(&file.path),
        config,
        &mut stats,
    );
    stats.bytes_hashed = hashed.iter().map(|(f, _)| f.size).sum();

    let digests = hashed
        .into_iter()
        .map(|(file, digest)| (file.path, digest))
        .collect();

    if let Some(ref progress) = config.progress {
        progress.on_stage_end("signature completion");
    }

    (digests, stats)
}

/// Group records by full digest into deterministically ordered sets.
///
/// Records without a digest are skipped. Shared by the fresh-scan path
/// (after stage 3) and the cache-rebuild path, so both produce identical
/// output for identical digests: members sorted by path, sets sorted by
/// size descending, then by first member path.
#[must_use]
pub fn build_duplicate_sets(
    records: &[FileRecord],
    digests: &HashMap<PathBuf, Digest>,
) -> Vec<DuplicateSet> {
    let mut by_digest: HashMap<Digest, Vec<FileRecord>> = HashMap::new();
    for record in records {
        if let Some(digest) = digests.get(&record.path) {
            by_digest.entry(*digest).or_default().push(record.clone());
        }
    }

    let mut sets: Vec<DuplicateSet> = by_digest
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(digest, files)| {
            let size = files.first().map_or(0, |f| f.size);
            DuplicateSet::new(digest, size, files)
        })
        .collect();

    sets.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.files[0].path.cmp(&b.files[0].path))
    });
    sets
}
