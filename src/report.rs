//! Report rendering for scan results.
//!
//! Two formats: human-readable text and machine-readable JSON. Both
//! consume a [`ScanResult`](crate::pipeline::ScanResult) and never touch
//! the filesystem; deletion is a separate consumer's job.
//!
//! # JSON Schema
//!
//! ```json
//! {
//!   "duplicate_sets": [
//!     {
//!       "digest": "abc123...",
//!       "size": 1024,
//!       "wasted_space": 1024,
//!       "keeper": "/tree/photo.jpg",
//!       "files": ["/tree/photo.jpg", "/tree/photo (copy).jpg"]
//!     }
//!   ],
//!   "folder_relations": [
//!     {"kind": "exact_duplicate", "folder_a": "/tree/f3", "folder_b": "/tree/f4"},
//!     {"kind": "subset", "subset": "/tree/f1", "superset": "/tree/f2"}
//!   ],
//!   "summary": { ... }
//! }
//! ```

use std::fmt::Write as _;

use bytesize::ByteSize;
use serde::Serialize;

use crate::folders::FolderRelation;
use crate::pipeline::ScanResult;

/// A duplicate set in JSON form.
#[derive(Debug, Serialize)]
struct JsonDuplicateSet {
    /// Full content digest, hex-encoded
    digest: String,
    /// Size of each member in bytes
    size: u64,
    /// Bytes reclaimable from this set
    wasted_space: u64,
    /// Suggested file to keep
    keeper: String,
    /// All member paths, sorted
    files: Vec<String>,
}

/// A folder relation in JSON form.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonFolderRelation {
    ExactDuplicate { folder_a: String, folder_b: String },
    Subset { subset: String, superset: String },
}

impl From<&FolderRelation> for JsonFolderRelation {
    fn from(relation: &FolderRelation) -> Self {
        match relation {
            FolderRelation::ExactDuplicate { folder_a, folder_b } => Self::ExactDuplicate {
                folder_a: folder_a.display().to_string(),
                folder_b: folder_b.display().to_string(),
            },
            FolderRelation::Subset { subset, superset } => Self::Subset {
                subset: subset.display().to_string(),
                superset: superset.display().to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    root: String,
    started_at: String,
    scan_duration_ms: u64,
    files_scanned: usize,
    bytes_hashed: u64,
    duplicate_sets: usize,
    duplicate_files: usize,
    wasted_space: u64,
    folder_relations: usize,
    cache_used: bool,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct JsonReport {
    duplicate_sets: Vec<JsonDuplicateSet>,
    folder_relations: Vec<JsonFolderRelation>,
    summary: JsonSummary,
}

/// Render a scan result as a JSON document.
pub fn render_json(result: &ScanResult, pretty: bool) -> serde_json::Result<String> {
    let report = JsonReport {
        duplicate_sets: result
            .duplicate_sets
            .iter()
            .map(|set| JsonDuplicateSet {
                digest: set.digest_hex(),
                size: set.size,
                wasted_space: set.wasted_space(),
                keeper: set.files[set.suggested_keeper()].path.display().to_string(),
                files: set
                    .files
                    .iter()
                    .map(|f| f.path.display().to_string())
                    .collect(),
            })
            .collect(),
        folder_relations: result
            .folders
            .relations
            .iter()
            .map(JsonFolderRelation::from)
            .collect(),
        summary: JsonSummary {
            root: result.metadata.root.display().to_string(),
            started_at: result.metadata.started_at.to_rfc3339(),
            scan_duration_ms: result.metadata.duration.as_millis() as u64,
            files_scanned: result.metadata.files_scanned,
            bytes_hashed: result.metadata.bytes_hashed,
            duplicate_sets: result.duplicate_sets.len(),
            duplicate_files: result
                .duplicate_sets
                .iter()
                .map(|s| s.duplicate_count())
                .sum(),
            wasted_space: result.wasted_space(),
            folder_relations: result.folders.relations.len(),
            cache_used: result.metadata.cache_used,
            warnings: result.metadata.warnings.clone(),
        },
    };

    if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
}

/// Render a scan result as human-readable text.
#[must_use]
pub fn render_text(result: &ScanResult) -> String {
    let mut out = String::new();

    if result.duplicate_sets.is_empty() {
        let _ = writeln!(out, "No duplicate files found.");
    } else {
        let _ = writeln!(
            out,
            "Found {} duplicate set(s), {} reclaimable:",
            result.duplicate_sets.len(),
            ByteSize(result.wasted_space())
        );
        for (i, set) in result.duplicate_sets.iter().enumerate() {
            let _ = writeln!(
                out,
                "\nSet {} ({} each, {} files):",
                i + 1,
                ByteSize(set.size),
                set.len()
            );
            let keeper = set.suggested_keeper();
            for (j, file) in set.files.iter().enumerate() {
                let marker = if j == keeper { "keep" } else { "    " };
                let _ = writeln!(out, "  [{}] {}", marker, file.path.display());
            }
        }
    }

    if !result.folders.relations.is_empty() {
        let _ = writeln!(out, "\nRedundant folders:");
        for relation in &result.folders.relations {
            match relation {
                FolderRelation::ExactDuplicate { folder_a, folder_b } => {
                    let _ = writeln!(
                        out,
                        "  {} == {}",
                        folder_a.display(),
                        folder_b.display()
                    );
                }
                FolderRelation::Subset { subset, superset } => {
                    let _ = writeln!(
                        out,
                        "  {} is contained in {}",
                        subset.display(),
                        superset.display()
                    );
                }
            }
        }
    }

    let _ = writeln!(
        out,
        "\nScanned {} files in {:.2}s{}",
        result.metadata.files_scanned,
        result.metadata.duration.as_secs_f64(),
        if result.metadata.cache_used {
            " (from cache)"
        } else {
            ""
        }
    );

    if !result.metadata.warnings.is_empty() {
        let _ = writeln!(
            out,
            "\n{} warning(s) during scan:",
            result.metadata.warnings.len()
        );
        for warning in &result.metadata.warnings {
            let _ = writeln!(out, "  {}", warning);
        }
    }

    out
}
