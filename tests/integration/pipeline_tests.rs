//! End-to-end pipeline tests over real temporary trees.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use dupescan::config::ScanConfig;
use dupescan::pipeline::{Pipeline, PipelineError, ScanResult};
use tempfile::TempDir;

fn scan(root: &Path) -> ScanResult {
    Pipeline::new(root, ScanConfig::default()).run().unwrap()
}

fn scan_no_cache(root: &Path) -> ScanResult {
    let mut config = ScanConfig::default();
    config.use_cache = false;
    Pipeline::new(root, config).run().unwrap()
}

#[test]
fn test_three_file_scenario() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "X").unwrap();
    fs::write(dir.path().join("b.txt"), "X").unwrap();
    fs::write(dir.path().join("c.txt"), "Y").unwrap();

    let result = scan(dir.path());

    assert_eq!(result.duplicate_sets.len(), 1);
    assert_eq!(
        result.duplicate_sets[0].paths(),
        vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
    );
    let all_members: Vec<_> = result
        .duplicate_sets
        .iter()
        .flat_map(|s| s.paths())
        .collect();
    assert!(!all_members.contains(&dir.path().join("c.txt")));
}

#[test]
fn test_partition_correctness() {
    let dir = TempDir::new().unwrap();
    // Three content classes, two of them duplicated
    fs::write(dir.path().join("a1.bin"), "content alpha").unwrap();
    fs::write(dir.path().join("a2.bin"), "content alpha").unwrap();
    fs::write(dir.path().join("a3.bin"), "content alpha").unwrap();
    fs::write(dir.path().join("b1.bin"), "content beta!").unwrap();
    fs::write(dir.path().join("b2.bin"), "content beta!").unwrap();
    fs::write(dir.path().join("unique.bin"), "one of a kind").unwrap();

    let result = scan(dir.path());

    assert_eq!(result.duplicate_sets.len(), 2);
    let mut seen_digests = HashSet::new();
    for set in &result.duplicate_sets {
        // Every member shares the set's size
        assert!(set.files.iter().all(|f| f.size == set.size));
        assert!(set.len() >= 2);
        // No digest appears in two different sets
        assert!(seen_digests.insert(set.digest));
    }
}

#[test]
fn test_unique_size_never_in_a_set() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("pair1.bin"), "0123456789").unwrap();
    fs::write(dir.path().join("pair2.bin"), "0123456789").unwrap();
    fs::write(dir.path().join("odd.bin"), "0123").unwrap();

    let result = scan(dir.path());

    let members: Vec<_> = result
        .duplicate_sets
        .iter()
        .flat_map(|s| s.paths())
        .collect();
    assert!(!members.contains(&dir.path().join("odd.bin")));
}

#[test]
fn test_same_size_different_content_not_grouped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("x.bin"), "AAAA").unwrap();
    fs::write(dir.path().join("y.bin"), "BBBB").unwrap();

    let result = scan(dir.path());
    assert!(result.duplicate_sets.is_empty());
}

#[test]
fn test_duplicates_found_across_nested_directories() {
    let dir = TempDir::new().unwrap();
    let deep = dir.path().join("a/b/c");
    fs::create_dir_all(&deep).unwrap();
    fs::write(dir.path().join("top.dat"), "shared payload").unwrap();
    fs::write(deep.join("bottom.dat"), "shared payload").unwrap();

    let result = scan(dir.path());

    assert_eq!(result.duplicate_sets.len(), 1);
    assert_eq!(result.duplicate_sets[0].len(), 2);
}

#[test]
fn test_result_ordering_is_deterministic() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("big1.bin"), vec![1u8; 500]).unwrap();
    fs::write(dir.path().join("big2.bin"), vec![1u8; 500]).unwrap();
    fs::write(dir.path().join("small1.bin"), "tiny").unwrap();
    fs::write(dir.path().join("small2.bin"), "tiny").unwrap();

    let first = scan_no_cache(dir.path());
    let second = scan_no_cache(dir.path());

    assert_eq!(first.duplicate_sets, second.duplicate_sets);
    // Larger sets come first
    assert_eq!(first.duplicate_sets[0].size, 500);
    assert_eq!(first.duplicate_sets[1].size, 4);
}

#[test]
fn test_invalid_root_fails_fast() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not_a_dir.txt");
    fs::write(&file, "plain file").unwrap();

    let err = Pipeline::new(&file, ScanConfig::default())
        .run()
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidRoot(_)));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_becomes_warning() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "readable").unwrap();
    fs::write(dir.path().join("b.txt"), "readable").unwrap();
    let locked = dir.path().join("locked.txt");
    // Same size as the pair so it survives stage 1 and fails during hashing
    fs::write(&locked, "readable").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let result = scan_no_cache(dir.path());

    assert!(!result.metadata.warnings.is_empty());
    // The readable pair is still reported
    assert_eq!(result.duplicate_sets.len(), 1);
    assert_eq!(result.duplicate_sets[0].len(), 2);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn test_empty_files_excluded_by_default() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty1"), "").unwrap();
    fs::write(dir.path().join("empty2"), "").unwrap();

    let result = scan(dir.path());
    assert!(result.duplicate_sets.is_empty());
    assert_eq!(result.metadata.files_scanned, 0);
}

#[test]
fn test_empty_files_grouped_when_included() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty1"), "").unwrap();
    fs::write(dir.path().join("empty2"), "").unwrap();

    let mut config = ScanConfig::default();
    config.include_empty = true;
    let result = Pipeline::new(dir.path(), config).run().unwrap();

    assert_eq!(result.duplicate_sets.len(), 1);
    assert_eq!(result.duplicate_sets[0].size, 0);
}

#[test]
fn test_sha256_backend_finds_same_duplicates() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "same bytes").unwrap();
    fs::write(dir.path().join("b.txt"), "same bytes").unwrap();

    let mut config = ScanConfig::default();
    config.digest_algorithm = dupescan::scanner::DigestAlgorithm::Sha256;
    config.use_cache = false;
    let result = Pipeline::new(dir.path(), config).run().unwrap();

    assert_eq!(result.duplicate_sets.len(), 1);
}

#[test]
fn test_ignore_patterns_exclude_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("keep1.txt"), "data").unwrap();
    fs::write(dir.path().join("keep2.txt"), "data").unwrap();
    fs::write(dir.path().join("skip1.tmp"), "data").unwrap();
    fs::write(dir.path().join("skip2.tmp"), "data").unwrap();

    let mut config = ScanConfig::default();
    config.ignore_patterns = vec!["*.tmp".to_string()];
    config.use_cache = false;
    let result = Pipeline::new(dir.path(), config).run().unwrap();

    assert_eq!(result.metadata.files_scanned, 2);
    assert_eq!(result.duplicate_sets.len(), 1);
    assert!(result.duplicate_sets[0]
        .paths()
        .iter()
        .all(|p| p.extension().is_some_and(|e| e == "txt")));
}
