//! Folder relationship tests through the full pipeline.

use std::fs;
use std::path::Path;

use dupescan::config::ScanConfig;
use dupescan::folders::FolderRelation;
use dupescan::pipeline::{Pipeline, ScanResult};
use tempfile::TempDir;

fn scan(root: &Path) -> ScanResult {
    let mut config = ScanConfig::default();
    config.use_cache = false;
    Pipeline::new(root, config).run().unwrap()
}

fn exact(a: &Path, b: &Path) -> FolderRelation {
    let (folder_a, folder_b) = if a < b { (a, b) } else { (b, a) };
    FolderRelation::ExactDuplicate {
        folder_a: folder_a.to_path_buf(),
        folder_b: folder_b.to_path_buf(),
    }
}

fn subset(sub: &Path, sup: &Path) -> FolderRelation {
    FolderRelation::Subset {
        subset: sub.to_path_buf(),
        superset: sup.to_path_buf(),
    }
}

#[test]
fn test_subset_relation() {
    let dir = TempDir::new().unwrap();
    let f1 = dir.path().join("f1");
    let f2 = dir.path().join("f2");
    fs::create_dir_all(&f1).unwrap();
    fs::create_dir_all(&f2).unwrap();
    fs::write(f1.join("a"), "digest one").unwrap();
    fs::write(f1.join("b"), "digest two!").unwrap();
    fs::write(f2.join("a"), "digest one").unwrap();
    fs::write(f2.join("b"), "digest two!").unwrap();
    fs::write(f2.join("c"), "digest three").unwrap();

    let result = scan(dir.path());

    assert!(result.folders.relations.contains(&subset(&f1, &f2)));
    assert!(!result
        .folders
        .relations
        .iter()
        .any(|r| matches!(r, FolderRelation::ExactDuplicate { .. })));
}

#[test]
fn test_exact_duplicate_reported_once_with_multiset_equality() {
    let dir = TempDir::new().unwrap();
    let f3 = dir.path().join("f3");
    let f4 = dir.path().join("f4");
    fs::create_dir_all(&f3).unwrap();
    fs::create_dir_all(&f4).unwrap();
    // Two files with identical content plus one distinct, in both folders
    fs::write(f3.join("x1"), "repeated").unwrap();
    fs::write(f3.join("x2"), "repeated").unwrap();
    fs::write(f3.join("y"), "distinct!").unwrap();
    fs::write(f4.join("x1"), "repeated").unwrap();
    fs::write(f4.join("x2"), "repeated").unwrap();
    fs::write(f4.join("y"), "distinct!").unwrap();

    let result = scan(dir.path());

    let exacts: Vec<_> = result
        .folders
        .relations
        .iter()
        .filter(|r| matches!(r, FolderRelation::ExactDuplicate { .. }))
        .collect();
    assert_eq!(exacts.len(), 1);
    assert_eq!(*exacts[0], exact(&f3, &f4));
}

#[test]
fn test_multiset_vs_set_distinction() {
    let dir = TempDir::new().unwrap();
    let double = dir.path().join("double");
    let single = dir.path().join("single");
    fs::create_dir_all(&double).unwrap();
    fs::create_dir_all(&single).unwrap();
    // double holds the same content twice; single holds it once
    fs::write(double.join("a"), "payload").unwrap();
    fs::write(double.join("b"), "payload").unwrap();
    fs::write(single.join("a"), "payload").unwrap();

    let result = scan(dir.path());

    // {d1} is contained in {d1, d1} but not equal to it
    assert!(result.folders.relations.contains(&subset(&single, &double)));
    assert!(!result
        .folders
        .relations
        .iter()
        .any(|r| matches!(r, FolderRelation::ExactDuplicate { .. })));
}

#[test]
fn test_empty_folder_never_reported() {
    let dir = TempDir::new().unwrap();
    let f1 = dir.path().join("f1");
    let f5 = dir.path().join("f5");
    fs::create_dir_all(&f1).unwrap();
    fs::create_dir_all(&f5).unwrap();
    fs::write(f1.join("a"), "content").unwrap();

    let result = scan(dir.path());

    assert!(!result.folders.relations.iter().any(|r| match r {
        FolderRelation::ExactDuplicate { folder_a, folder_b } =>
            folder_a == &f5 || folder_b == &f5,
        FolderRelation::Subset { subset, superset } => subset == &f5 || superset == &f5,
    }));
}

#[test]
fn test_layout_independence() {
    let dir = TempDir::new().unwrap();
    let flat = dir.path().join("flat");
    let nested = dir.path().join("nested");
    fs::create_dir_all(&flat).unwrap();
    fs::create_dir_all(nested.join("inner/deeper")).unwrap();
    fs::write(flat.join("a"), "first file").unwrap();
    fs::write(flat.join("b"), "second file").unwrap();
    fs::write(nested.join("inner/a"), "first file").unwrap();
    fs::write(nested.join("inner/deeper/b"), "second file").unwrap();

    let result = scan(dir.path());

    // Same content, different internal structure: still exact duplicates
    assert!(result.folders.relations.contains(&exact(&flat, &nested)));
}

#[test]
fn test_ancestor_descendant_not_related() {
    let dir = TempDir::new().unwrap();
    let parent = dir.path().join("parent");
    let child = parent.join("child");
    fs::create_dir_all(&child).unwrap();
    // All content lives in the child, so parent and child have equal
    // signatures; that relation is structural, not redundancy.
    fs::write(child.join("a"), "content").unwrap();

    let result = scan(dir.path());

    assert!(!result.folders.relations.iter().any(|r| match r {
        FolderRelation::ExactDuplicate { folder_a, folder_b } => {
            (folder_a == &parent && folder_b == &child)
                || (folder_a == &child && folder_b == &parent)
        }
        FolderRelation::Subset { subset, superset } => {
            (subset == &parent && superset == &child)
                || (subset == &child && superset == &parent)
        }
    }));
}

#[test]
fn test_largest_superset_wins() {
    let dir = TempDir::new().unwrap();
    let small = dir.path().join("small");
    let medium = dir.path().join("medium");
    let large = dir.path().join("large");
    for folder in [&small, &medium, &large] {
        fs::create_dir_all(folder).unwrap();
    }
    fs::write(small.join("a"), "digest 1").unwrap();
    fs::write(medium.join("a"), "digest 1").unwrap();
    fs::write(medium.join("b"), "digest 22").unwrap();
    fs::write(large.join("a"), "digest 1").unwrap();
    fs::write(large.join("b"), "digest 22").unwrap();
    fs::write(large.join("c"), "digest 333").unwrap();

    let result = scan(dir.path());

    // small is contained in both medium and large; only the largest
    // superset is reported for it.
    assert!(result.folders.relations.contains(&subset(&small, &large)));
    assert!(!result.folders.relations.contains(&subset(&small, &medium)));
    // medium itself is still a subset of large
    assert!(result.folders.relations.contains(&subset(&medium, &large)));
}

#[test]
fn test_folder_info_aggregates_recursively() {
    let dir = TempDir::new().unwrap();
    let parent = dir.path().join("parent");
    fs::create_dir_all(parent.join("child")).unwrap();
    fs::write(parent.join("top.txt"), "12345").unwrap();
    fs::write(parent.join("child/bottom.txt"), "1234567890").unwrap();

    let result = scan(dir.path());

    let info = &result.folders.folders[&parent];
    assert_eq!(info.file_count, 2);
    assert_eq!(info.total_bytes, 15);

    let child_info = &result.folders.folders[&parent.join("child")];
    assert_eq!(child_info.file_count, 1);
    assert_eq!(child_info.total_bytes, 10);
}
