use std::collections::HashSet;
use std::fs;
use std::time::SystemTime;

use dupescan::config::ScanConfig;
use dupescan::dedup::group_by_size;
use dupescan::pipeline::Pipeline;
use dupescan::scanner::{FileRecord, Hasher, DEFAULT_CHUNK_SIZE};
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    #[test]
    fn test_digest_determinism(content in "\\PC*") {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, content.as_bytes()).unwrap();

        let hasher = Hasher::new();
        let first = hasher.full_digest(&path).unwrap();
        let second = hasher.full_digest(&path).unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_partial_equals_full_for_small_files(content in "\\PC*") {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, content.as_bytes()).unwrap();

        let hasher = Hasher::new();
        let partial = hasher.partial_digest(&path).unwrap();
        let full = hasher.full_digest(&path).unwrap();

        // Files under two chunks are sampled whole, so both digests see
        // the same bytes.
        if content.len() < 2 * DEFAULT_CHUNK_SIZE {
            prop_assert_eq!(partial, full);
        }
    }

    #[test]
    fn test_identical_content_identical_partial(content in "\\PC*") {
        let dir = TempDir::new().unwrap();
        let path1 = dir.path().join("one.bin");
        let path2 = dir.path().join("two.bin");
        fs::write(&path1, content.as_bytes()).unwrap();
        fs::write(&path2, content.as_bytes()).unwrap();

        let hasher = Hasher::new();
        prop_assert_eq!(
            hasher.partial_digest(&path1).unwrap(),
            hasher.partial_digest(&path2).unwrap()
        );
    }

    #[test]
    fn test_group_by_size_invariants(sizes in prop::collection::vec(0u64..1000, 0..50)) {
        let records: Vec<FileRecord> = sizes.iter().enumerate().map(|(i, &size)| {
            FileRecord::new(
                std::path::PathBuf::from(format!("/fake/path/{}", i)),
                size,
                SystemTime::now(),
            )
        }).collect();

        let (groups, stats) = group_by_size(records.clone());

        for (size, files) in &groups {
            // All files in a group share the key size
            for file in files {
                prop_assert_eq!(file.size, *size);
            }
            // Singletons are discarded
            prop_assert!(files.len() >= 2);
        }

        prop_assert_eq!(stats.total_files, records.len());

        let survivor_count: usize = groups.values().map(Vec::len).sum();
        prop_assert_eq!(stats.potential_duplicates, survivor_count);
    }
}

proptest! {
    // Each case runs a full pipeline over a real temp tree; keep the
    // case count modest.
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_pipeline_partition_correctness(
        // Content classes 0..4, up to 12 files assigned arbitrarily
        assignments in prop::collection::vec(0usize..4, 0..12)
    ) {
        let contents = ["alpha content", "beta content!", "gamma payload", "delta blob"];
        let dir = TempDir::new().unwrap();
        for (i, &class) in assignments.iter().enumerate() {
            fs::write(dir.path().join(format!("file_{i}.bin")), contents[class]).unwrap();
        }

        let mut config = ScanConfig::default();
        config.use_cache = false;
        let result = Pipeline::new(dir.path(), config).run().unwrap();

        // Each set holds one size and one digest; no digest spans two sets
        let mut seen = HashSet::new();
        for set in &result.duplicate_sets {
            prop_assert!(set.len() >= 2);
            prop_assert!(set.files.iter().all(|f| f.size == set.size));
            prop_assert!(seen.insert(set.digest));
        }

        // Every class with 2+ members forms exactly one set
        let mut class_counts = [0usize; 4];
        for &class in &assignments {
            class_counts[class] += 1;
        }
        let expected_sets = class_counts.iter().filter(|&&n| n >= 2).count();
        prop_assert_eq!(result.duplicate_sets.len(), expected_sets);

        let expected_members: usize = class_counts.iter().filter(|&&n| n >= 2).sum();
        let actual_members: usize = result.duplicate_sets.iter().map(|s| s.len()).sum();
        prop_assert_eq!(actual_members, expected_members);
    }
}
