//! Folder-level duplicate and subset analysis.
//!
//! # Overview
//!
//! Every folder gets a *content signature*: the multiset of full content
//! digests of all files it recursively contains. Two folders whose
//! signatures are equal as multisets are exact duplicates regardless of
//! internal layout or names; a folder whose signature is strictly
//! contained in another's is a subset of it. Multiset semantics matter:
//! a folder holding two copies of a file is not an exact duplicate of one
//! holding a single copy.
//!
//! Folders with no digested files are excluded entirely — an empty folder
//! is never reported as duplicate or subset of anything.
//!
//! # Reporting policy
//!
//! - Exact duplicates are reported once per unordered pair.
//! - For each subset folder exactly one relation is reported, against the
//!   superset with the largest signature cardinality (ties broken by
//!   lexicographic path).
//! - Relations between a folder and its own ancestor or descendant are
//!   suppressed: a parent's recursive signature always contains its
//!   children's, so those relations carry no cleanup value.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::scanner::{Digest, FileRecord};

/// Multiset of content digests: digest to occurrence count.
pub type Signature = BTreeMap<Digest, usize>;

/// Aggregate information about one folder, for report rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderInfo {
    /// Number of files recursively contained
    pub file_count: usize,
    /// Total bytes recursively contained
    pub total_bytes: u64,
    /// Most recent modification time among contained files
    pub last_modified: Option<SystemTime>,
}

/// A redundancy relation between two folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRelation {
    /// The two folders' content signatures are equal as multisets.
    /// `folder_a` is lexicographically smaller; the pair is reported once.
    ExactDuplicate {
        /// First folder of the pair
        folder_a: PathBuf,
        /// Second folder of the pair
        folder_b: PathBuf,
    },
    /// Every digest in `subset` appears in `superset` at least as many
    /// times, and the signatures are not equal.
    Subset {
        /// The contained folder
        subset: PathBuf,
        /// The containing folder
        superset: PathBuf,
    },
}

/// Output of the folder analysis.
#[derive(Debug, Clone, Default)]
pub struct FolderAnalysis {
    /// Redundancy relations, deterministically ordered
    pub relations: Vec<FolderRelation>,
    /// Per-folder aggregate info for every folder with content
    pub folders: BTreeMap<PathBuf, FolderInfo>,
}

/// Check multiset containment: every digest count in `a` is covered by `b`.
fn is_submultiset(a: &Signature, b: &Signature) -> bool {
    a.iter().all(|(digest, count)| {
        b.get(digest).is_some_and(|other| other >= count)
    })
}

/// Total element count of a signature, multiplicity included.
fn cardinality(signature: &Signature) -> usize {
    signature.values().sum()
}

fn is_ancestor_or_descendant(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Analyze folder relationships from scanned records and their digests.
///
/// Records without a digest (hashing failed, file excluded from the run)
/// contribute to [`FolderInfo`] but not to signatures.
///
/// # Arguments
///
/// * `root` - The scanned tree root; only folders at or below it are
///   considered
/// * `records` - All scanned files
/// * `digests` - Full content digest per path
#[must_use]
pub fn analyze(
    root: &Path,
    records: &[FileRecord],
    digests: &HashMap<PathBuf, Digest>,
) -> FolderAnalysis {
    let mut signatures: BTreeMap<PathBuf, Signature> = BTreeMap::new();
    let mut folders: BTreeMap<PathBuf, FolderInfo> = BTreeMap::new();

    for record in records {
        let digest = digests.get(&record.path);
        let mut dir = record.path.parent();
        while let Some(folder) = dir {
            if !folder.starts_with(root) {
                break;
            }
            let info = folders.entry(folder.to_path_buf()).or_default();
            info.file_count += 1;
            info.total_bytes += record.size;
            info.last_modified = Some(match info.last_modified {
                Some(prev) => prev.max(record.modified),
                None => record.modified,
            });
            if let Some(digest) = digest {
                *signatures
                    .entry(folder.to_path_buf())
                    .or_default()
                    .entry(*digest)
                    .or_insert(0) += 1;
            }
            if folder == root {
                break;
            }
            dir = folder.parent();
        }
    }

    let candidates: Vec<&PathBuf> = signatures.keys().collect();
    log::info!(
        "Folder analysis: comparing {} folders with content",
        candidates.len()
    );

    let mut exacts: Vec<(PathBuf, PathBuf)> = Vec::new();
    // subset folder -> candidate supersets
    let mut subset_candidates: HashMap<&PathBuf, Vec<&PathBuf>> = HashMap::new();

    for (i, folder_a) in candidates.iter().enumerate() {
        for folder_b in &candidates[i + 1..] {
            if is_ancestor_or_descendant(folder_a, folder_b) {
                continue;
            }
            let sig_a = &signatures[*folder_a];
            let sig_b = &signatures[*folder_b];

            if sig_a == sig_b {
                exacts.push(((*folder_a).clone(), (*folder_b).clone()));
            } else if is_submultiset(sig_a, sig_b) {
                subset_candidates.entry(folder_a).or_default().push(folder_b);
            } else if is_submultiset(sig_b, sig_a) {
                subset_candidates.entry(folder_b).or_default().push(folder_a);
            }
        }
    }

    let mut relations: Vec<FolderRelation> = exacts
        .into_iter()
        .map(|(folder_a, folder_b)| FolderRelation::ExactDuplicate { folder_a, folder_b })
        .collect();

    // One relation per subset folder, against the largest superset.
    let mut subsets: Vec<FolderRelation> = subset_candidates
        .into_iter()
        .map(|(subset, supersets)| {
            let superset = supersets
                .into_iter()
                .max_by(|a, b| {
                    cardinality(&signatures[*a])
                        .cmp(&cardinality(&signatures[*b]))
                        .then_with(|| b.cmp(a))
                })
                .expect("subset entry always has at least one superset");
            FolderRelation::Subset {
                subset: subset.clone(),
                superset: superset.clone(),
            }
        })
        .collect();
    subsets.sort_by(|a, b| match (a, b) {
        (
            FolderRelation::Subset { subset: sa, .. },
            FolderRelation::Subset { subset: sb, .. },
        ) => sa.cmp(sb),
        _ => std::cmp::Ordering::Equal,
    });
    relations.extend(subsets);

    log::info!("Folder analysis complete: {} relations", relations.len());

    FolderAnalysis { relations, folders }
}
