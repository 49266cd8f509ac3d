//! Advisory keeper suggestions for duplicate sets.
//!
//! When a consumer decides which copy to keep, filenames carry a useful
//! signal: "photo (copy).jpg" and "photo (2).jpg" are almost certainly the
//! redundant ones, and a file closer to the tree root tends to be the
//! original location. This module scores members accordingly. Purely
//! advisory; nothing here touches the filesystem.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::scanner::FileRecord;

fn copy_indicator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(copy\)|[-_ ]copy").unwrap())
}

fn numbered_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\d+\)").unwrap())
}

/// Score a path as a keeper candidate. Lower is better.
///
/// Copy indicators in the filename are penalized heavily, numbered
/// suffixes moderately, and deeper paths slightly.
#[must_use]
pub fn filename_score(path: &Path) -> u32 {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut score = 0u32;
    if copy_indicator().is_match(&filename) {
        score += 10;
    }
    if numbered_suffix().is_match(&filename) {
        score += 5;
    }
    score += path.components().count().saturating_sub(1) as u32;
    score
}

/// Pick the member of a duplicate set that a consumer should keep.
///
/// Returns the index of the lowest-scoring member; ties go to the
/// lexicographically smallest path. Returns 0 for an empty slice.
#[must_use]
pub fn suggest_keeper(files: &[FileRecord]) -> usize {
    files
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            filename_score(&a.path)
                .cmp(&filename_score(&b.path))
                .then_with(|| a.path.cmp(&b.path))
        })
        .map_or(0, |(i, _)| i)
}
