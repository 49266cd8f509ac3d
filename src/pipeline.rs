//! Scan pipeline orchestration.
//!
//! # Overview
//!
//! [`Pipeline::run`] sequences a complete scan: walk the tree, decide
//! between reusing a valid cache snapshot and rehashing, run the staged
//! dedup engine, analyze folder relationships, and persist a fresh
//! snapshot. It returns a [`ScanResult`] for reporting or deletion layers
//! to consume; the pipeline itself never deletes anything.
//!
//! Per-file and per-directory failures are recovered and aggregated into
//! the result's warnings. Only structural failures propagate: an invalid
//! root, interruption, or a cache write that keeps failing.
//!
//! # Example
//!
//! ```rust,no_run
//! use dupescan::config::ScanConfig;
//! use dupescan::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new("/some/tree", ScanConfig::default());
//! let result = pipeline.run().unwrap();
//! println!("{} duplicate sets", result.duplicate_sets.len());
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, CacheError, CacheState, CacheStore};
use crate::config::ScanConfig;
use crate::dedup::{
    build_duplicate_sets, complete_digests, group_by_size, stage2_partial, stage3_full,
    DuplicateSet, StageConfig, StageStats,
};
use crate::folders::{self, FolderAnalysis};
use crate::progress::ProgressCallback;
use crate::scanner::{Digest, FileRecord, Hasher, Walker, WalkerConfig};

/// Structural pipeline failures. Everything else is recovered into
/// [`ScanMetadata::warnings`].
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The root path does not exist or is not a directory.
    #[error("Invalid scan root: {0} does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    /// The run was interrupted before completing. Nothing was persisted.
    #[error("Scan interrupted")]
    Interrupted,

    /// The cache snapshot could not be written, even after a retry.
    #[error("Failed to persist cache snapshot: {0}")]
    CachePersist(#[from] CacheError),
}

/// Run-level metadata attached to every scan result.
#[derive(Debug, Clone)]
pub struct ScanMetadata {
    /// The scanned root
    pub root: PathBuf,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Number of files the walk discovered
    pub files_scanned: usize,
    /// Total bytes read for hashing (zero on a cache hit)
    pub bytes_hashed: u64,
    /// Whether a valid cache snapshot supplied the digests
    pub cache_used: bool,
    /// Recovered per-file and per-directory errors
    pub warnings: Vec<String>,
}

/// Complete output of one pipeline run.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Confirmed duplicate sets, deterministically ordered
    pub duplicate_sets: Vec<DuplicateSet>,
    /// Folder-level duplicate and subset relations
    pub folders: FolderAnalysis,
    /// Run-level metadata
    pub metadata: ScanMetadata,
}

impl ScanResult {
    /// Total bytes reclaimable by deleting all redundant copies.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.duplicate_sets.iter().map(DuplicateSet::wasted_space).sum()
    }

    /// Whether the scan found anything redundant.
    #[must_use]
    pub fn found_anything(&self) -> bool {
        !self.duplicate_sets.is_empty() || !self.folders.relations.is_empty()
    }
}

/// The scan pipeline for one root directory.
pub struct Pipeline {
    root: PathBuf,
    config: ScanConfig,
    force_rescan: bool,
    shutdown_flag: Arc<AtomicBool>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl Pipeline {
    /// Create a pipeline for `root` with the given configuration.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: ScanConfig) -> Self {
        Self {
            root: root.into(),
            config,
            force_rescan: false,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Ignore any existing cache snapshot and rehash everything.
    #[must_use]
    pub fn with_force_rescan(mut self, force: bool) -> Self {
        self.force_rescan = force;
        self
    }

    /// Install a shared shutdown flag; when set, the run stops at the
    /// next stage boundary and nothing is persisted.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = flag;
        self
    }

    /// Install a progress callback for stage and per-file updates.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn interrupted(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Run the full pipeline.
    ///
    /// Fails only on an invalid root, interruption, or a cache snapshot
    /// that cannot be written; recoverable errors end up in
    /// [`ScanMetadata::warnings`].
    pub fn run(&self) -> Result<ScanResult, PipelineError> {
        if !self.root.is_dir() {
            return Err(PipelineError::InvalidRoot(self.root.clone()));
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let mut warnings = Vec::new();

        log::info!("Scanning {}", self.root.display());
        let records = self.walk_tree(&mut warnings);
        if self.interrupted() {
            return Err(PipelineError::Interrupted);
        }
        log::info!("Walk complete: {} files", records.len());

        let store = CacheStore::for_root(&self.root);
        let cache_state = if self.config.use_cache {
            store.evaluate(
                &records,
                self.config.digest_algorithm,
                self.config.partial_chunk_bytes,
                self.force_rescan,
            )
        } else {
            CacheState::NoCache
        };

        let (digests, bytes_hashed, cache_used) = match cache_state {
            CacheState::Valid(entry) => (entry.digest_map(), 0, true),
            CacheState::NoCache | CacheState::Stale => {
                let (digests, bytes) = self.hash_tree(&records, &mut warnings)?;
                (digests, bytes, false)
            }
        };

        if self.interrupted() {
            return Err(PipelineError::Interrupted);
        }

        let duplicate_sets = build_duplicate_sets(&records, &digests);
        let folder_analysis = folders::analyze(&self.root, &records, &digests);

        if self.config.use_cache && !cache_used {
            self.persist_snapshot(&store, &records, &digests)?;
        }

        log::info!(
            "Scan complete: {} duplicate sets, {} folder relations, {} warnings",
            duplicate_sets.len(),
            folder_analysis.relations.len(),
            warnings.len()
        );

        Ok(ScanResult {
            duplicate_sets,
            folders: folder_analysis,
            metadata: ScanMetadata {
                root: self.root.clone(),
                started_at,
                duration: start.elapsed(),
                files_scanned: records.len(),
                bytes_hashed,
                cache_used,
                warnings,
            },
        })
    }

    /// Walk the tree, collecting metadata records. Traversal errors are
    /// recovered into warnings.
    fn walk_tree(&self, warnings: &mut Vec<String>) -> Vec<FileRecord> {
        let walker_config = WalkerConfig {
            skip_hidden: self.config.skip_hidden,
            include_empty: self.config.include_empty,
            ignore_patterns: self.config.ignore_patterns.clone(),
        };
        let walker = Walker::new(&self.root, walker_config)
            .with_shutdown_flag(Arc::clone(&self.shutdown_flag));

        if let Some(ref progress) = self.progress {
            progress.on_stage_start("walking", 0);
        }

        let mut records = Vec::new();
        for item in walker.walk() {
            match item {
                Ok(record) => {
                    if let Some(ref progress) = self.progress {
                        progress.on_progress(1);
                    }
                    records.push(record);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    warnings.push(e.to_string());
                }
            }
        }

        if let Some(ref progress) = self.progress {
            progress.on_stage_end("walking");
        }
        records
    }

    /// Run the staged dedup engine and complete folder signatures,
    /// returning the full digest map for the tree and the bytes read.
    fn hash_tree(
        &self,
        records: &[FileRecord],
        warnings: &mut Vec<String>,
    ) -> Result<(HashMap<PathBuf, Digest>, u64), PipelineError> {
        let hasher = Arc::new(
            Hasher::new()
                .with_algorithm(self.config.digest_algorithm)
                .with_chunk_size(self.config.partial_chunk_bytes),
        );
        let mut stage_config = StageConfig::default()
            .with_io_threads(self.config.io_threads)
            .with_shutdown_flag(Arc::clone(&self.shutdown_flag));
        if let Some(ref progress) = self.progress {
            stage_config = stage_config.with_progress(Arc::clone(progress));
        }

        let (size_groups, grouping_stats) = group_by_size(records.iter().cloned());
        log::info!(
            "Stage 1: {} size groups cover {} candidates ({:.1}% of files eliminated)",
            grouping_stats.duplicate_groups,
            grouping_stats.potential_duplicates,
            grouping_stats.elimination_rate()
        );

        let (partial_groups, stage2_stats) =
            stage2_partial(size_groups, Arc::clone(&hasher), &stage_config);
        self.absorb_stage(&stage2_stats, warnings)?;

        let (_, mut digests, stage3_stats) =
            stage3_full(partial_groups, Arc::clone(&hasher), &stage_config);
        self.absorb_stage(&stage3_stats, warnings)?;

        // Folder signatures need every file's digest, not just the dedup
        // survivors.
        let remaining: Vec<FileRecord> = records
            .iter()
            .filter(|record| !digests.contains_key(&record.path))
            .cloned()
            .collect();
        let (rest, completion_stats) = complete_digests(remaining, hasher, &stage_config);
        self.absorb_stage(&completion_stats, warnings)?;
        digests.extend(rest);

        let bytes_hashed = stage2_stats.bytes_hashed
            + stage3_stats.bytes_hashed
            + completion_stats.bytes_hashed;
        Ok((digests, bytes_hashed))
    }

    fn absorb_stage(
        &self,
        stats: &StageStats,
        warnings: &mut Vec<String>,
    ) -> Result<(), PipelineError> {
        warnings.extend(stats.warnings.iter().cloned());
        if stats.interrupted || self.interrupted() {
            return Err(PipelineError::Interrupted);
        }
        Ok(())
    }

    /// Write the snapshot for this completed run, retrying once.
    fn persist_snapshot(
        &self,
        store: &CacheStore,
        records: &[FileRecord],
        digests: &HashMap<PathBuf, Digest>,
    ) -> Result<(), PipelineError> {
        let entry = CacheEntry::from_scan(
            &self.root,
            records,
            digests,
            self.config.digest_algorithm,
            self.config.partial_chunk_bytes,
        );
        if let Err(first) = store.persist(&entry) {
            log::warn!("Cache write failed ({}), retrying once", first);
            store.persist(&entry)?;
        }
        Ok(())
    }
}
