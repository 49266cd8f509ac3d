//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping (stage 1)
//! - Partial-digest narrowing (stage 2)
//! - Full-digest confirmation (stage 3)
//! - Keeper suggestions for confirmed duplicate sets

pub mod engine;
pub mod groups;
pub mod keeper;

pub use engine::{
    build_duplicate_sets, complete_digests, stage2_partial, stage3_full, StageConfig, StageStats,
};
pub use groups::{group_by_size, DuplicateSet, GroupingStats};
pub use keeper::suggest_keeper;
