//! Application configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file at
//! the platform config directory, then CLI flags on top. The file is
//! entirely optional; a missing or unreadable one silently falls back to
//! defaults (with a debug log), while a file that exists but fails to
//! parse is reported so typos don't go unnoticed.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::scanner::{DigestAlgorithm, DEFAULT_CHUNK_SIZE};

/// Scan configuration, merged from file and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Bytes hashed from each end of a file for the partial digest.
    pub partial_chunk_bytes: usize,
    /// Digest algorithm for partial and full hashing.
    pub digest_algorithm: DigestAlgorithm,
    /// Hashing thread count; 0 means one per available core.
    pub io_threads: usize,
    /// Include zero-byte files in the scan.
    pub include_empty: bool,
    /// Skip hidden (dot-prefixed) files and directories.
    pub skip_hidden: bool,
    /// Gitignore-style patterns excluded from the scan.
    pub ignore_patterns: Vec<String>,
    /// Reuse and write the per-root scan snapshot.
    pub use_cache: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            partial_chunk_bytes: DEFAULT_CHUNK_SIZE,
            digest_algorithm: DigestAlgorithm::Blake3,
            io_threads: 0,
            include_empty: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
            use_cache: true,
        }
    }
}

impl ScanConfig {
    /// Load the configuration file from the platform config directory,
    /// falling back to defaults when it doesn't exist.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                log::debug!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific TOML file.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings that would break the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.partial_chunk_bytes == 0 {
            anyhow::bail!("partial_chunk_bytes must be at least 1");
        }
        Ok(())
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupescan", "dupescan")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
