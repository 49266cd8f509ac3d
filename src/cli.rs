//! Command-line interface definitions.
//!
//! All CLI arguments are defined with the clap derive API. Flags override
//! values from the config file; the config file overrides built-in
//! defaults.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory
//! dupescan ~/Downloads
//!
//! # Ignore the cache snapshot and rehash everything
//! dupescan ~/Downloads --force-rescan
//!
//! # JSON output for scripting
//! dupescan ~/Downloads --json
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::scanner::DigestAlgorithm;

/// Duplicate file and redundant folder finder.
///
/// dupescan finds byte-identical files via staged content hashing, reports
/// folders whose content duplicates or is contained in another folder, and
/// caches scan snapshots so unchanged trees rescan instantly. It never
/// deletes anything.
#[derive(Debug, Parser)]
#[command(name = "dupescan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub root: PathBuf,

    /// Ignore any existing cache snapshot and rehash everything
    #[arg(long)]
    pub force_rescan: bool,

    /// Neither read nor write the cache snapshot
    #[arg(long, conflicts_with = "force_rescan")]
    pub no_cache: bool,

    /// Include zero-byte files in the scan
    #[arg(long)]
    pub include_empty: bool,

    /// Skip hidden files and directories (names starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Glob patterns to ignore (can be given multiple times)
    ///
    /// Added to any .gitignore patterns found at the root.
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Number of hashing threads (0 = one per available core)
    #[arg(long, value_name = "N", env = "DUPESCAN_THREADS")]
    pub threads: Option<usize>,

    /// Bytes sampled from each end of a file for the partial digest
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Digest algorithm for content hashing
    #[arg(long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Emit errors as JSON (for scripting)
    #[arg(long)]
    pub json_errors: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and the report
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Digest algorithm choices exposed on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    /// BLAKE3 (fast, default)
    Blake3,
    /// SHA-256 (slower, widely verifiable)
    Sha256,
}

impl From<AlgorithmArg> for DigestAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Blake3 => DigestAlgorithm::Blake3,
            AlgorithmArg::Sha256 => DigestAlgorithm::Sha256,
        }
    }
}
