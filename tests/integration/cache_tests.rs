//! Cache snapshot lifecycle tests: reuse, invalidation, corruption.

use std::fs;
use std::path::Path;

use dupescan::cache::CACHE_FILE_NAME;
use dupescan::config::ScanConfig;
use dupescan::pipeline::{Pipeline, ScanResult};
use tempfile::TempDir;

fn scan(root: &Path) -> ScanResult {
    Pipeline::new(root, ScanConfig::default()).run().unwrap()
}

fn seed_tree(dir: &TempDir) {
    fs::write(dir.path().join("a.txt"), "duplicate content").unwrap();
    fs::write(dir.path().join("b.txt"), "duplicate content").unwrap();
    fs::write(dir.path().join("c.txt"), "something else").unwrap();
}

#[test]
fn test_snapshot_written_after_first_run() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);

    let result = scan(dir.path());
    assert!(!result.metadata.cache_used);
    assert!(dir.path().join(CACHE_FILE_NAME).exists());
}

#[test]
fn test_unchanged_tree_hits_cache() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);

    scan(dir.path());
    let second = scan(dir.path());

    assert!(second.metadata.cache_used);
    assert_eq!(second.metadata.bytes_hashed, 0);
}

#[test]
fn test_cached_result_matches_uncached() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);

    let fresh = scan(dir.path());
    let cached = scan(dir.path());
    assert!(cached.metadata.cache_used);

    let mut no_cache = ScanConfig::default();
    no_cache.use_cache = false;
    let disabled = Pipeline::new(dir.path(), no_cache).run().unwrap();

    assert_eq!(fresh.duplicate_sets, cached.duplicate_sets);
    assert_eq!(cached.duplicate_sets, disabled.duplicate_sets);
    assert_eq!(cached.folders.relations, disabled.folders.relations);
}

#[test]
fn test_touch_invalidates() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);
    scan(dir.path());

    let bumped = filetime::FileTime::from_unix_time(2_000_000_000, 0);
    filetime::set_file_mtime(dir.path().join("c.txt"), bumped).unwrap();

    let result = scan(dir.path());
    assert!(!result.metadata.cache_used);
    assert!(result.metadata.bytes_hashed > 0);
}

#[test]
fn test_size_change_invalidates() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);
    scan(dir.path());

    fs::write(dir.path().join("c.txt"), "something else entirely").unwrap();

    let result = scan(dir.path());
    assert!(!result.metadata.cache_used);
}

#[test]
fn test_deletion_invalidates() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);
    scan(dir.path());

    fs::remove_file(dir.path().join("c.txt")).unwrap();

    let result = scan(dir.path());
    assert!(!result.metadata.cache_used);
    assert_eq!(result.metadata.files_scanned, 2);
}

#[test]
fn test_addition_invalidates() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);
    scan(dir.path());

    fs::write(dir.path().join("d.txt"), "newcomer").unwrap();

    let result = scan(dir.path());
    assert!(!result.metadata.cache_used);
    assert_eq!(result.metadata.files_scanned, 4);
}

#[test]
fn test_corrupt_snapshot_recovers_with_full_scan() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);
    scan(dir.path());

    fs::write(dir.path().join(CACHE_FILE_NAME), "{ broken json").unwrap();

    let result = scan(dir.path());
    assert!(!result.metadata.cache_used);
    assert_eq!(result.duplicate_sets.len(), 1);

    // The rescan replaced the corrupt snapshot with a valid one
    let third = scan(dir.path());
    assert!(third.metadata.cache_used);
}

#[test]
fn test_force_rescan_rehashes_and_rewrites() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);
    scan(dir.path());

    let forced = Pipeline::new(dir.path(), ScanConfig::default())
        .with_force_rescan(true)
        .run()
        .unwrap();
    assert!(!forced.metadata.cache_used);
    assert!(forced.metadata.bytes_hashed > 0);

    // The rewritten snapshot is immediately reusable
    let after = scan(dir.path());
    assert!(after.metadata.cache_used);
}

#[test]
fn test_algorithm_switch_invalidates() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);
    scan(dir.path());

    let mut config = ScanConfig::default();
    config.digest_algorithm = dupescan::scanner::DigestAlgorithm::Sha256;
    let result = Pipeline::new(dir.path(), config).run().unwrap();

    assert!(!result.metadata.cache_used);
    assert_eq!(result.duplicate_sets.len(), 1);
}

#[test]
fn test_snapshot_file_not_scanned_as_content() {
    let dir = TempDir::new().unwrap();
    seed_tree(&dir);

    let first = scan(dir.path());
    // Second walk sees the same 3 files; the snapshot itself is invisible,
    // otherwise its presence would invalidate the cache forever.
    let second = scan(dir.path());

    assert_eq!(first.metadata.files_scanned, 3);
    assert_eq!(second.metadata.files_scanned, 3);
    assert!(second.metadata.cache_used);
}
