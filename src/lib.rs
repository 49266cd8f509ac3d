//! dupescan - duplicate file and redundant folder finder.
//!
//! Finds byte-identical files via a staged content-hashing pipeline
//! (size, then partial digest, then full digest), derives folder-level
//! duplicate and subset relationships from content signatures, and caches
//! scan snapshots so unchanged trees rescan without rehashing. The core
//! never deletes anything; results go to reporting or deletion consumers.
//!
//! # Example
//!
//! ```rust,no_run
//! use dupescan::config::ScanConfig;
//! use dupescan::pipeline::Pipeline;
//!
//! let result = Pipeline::new("/some/tree", ScanConfig::default())
//!     .run()
//!     .unwrap();
//! for set in &result.duplicate_sets {
//!     println!("{} x {} bytes", set.len(), set.size);
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod folders;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod scanner;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;

use cli::Cli;
use config::ScanConfig;
use error::ExitCode;
use pipeline::Pipeline;
use progress::Progress;

/// Run the application from parsed CLI arguments.
///
/// Loads the config file, applies CLI overrides, installs the Ctrl+C
/// handler, runs the pipeline, and renders the report. Returns the exit
/// code for a completed run; structural failures come back as errors for
/// `main` to render.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = ScanConfig::load()?;
    if cli.no_cache {
        config.use_cache = false;
    }
    if cli.include_empty {
        config.include_empty = true;
    }
    if cli.skip_hidden {
        config.skip_hidden = true;
    }
    config.ignore_patterns.extend(cli.ignore_patterns.clone());
    if let Some(threads) = cli.threads {
        config.io_threads = threads;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.partial_chunk_bytes = chunk_size;
    }
    if let Some(algorithm) = cli.algorithm {
        config.digest_algorithm = algorithm.into();
    }
    config.validate()?;

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown_flag);
        ctrlc::set_handler(move || {
            log::warn!("Interrupt received, stopping at the next stage boundary");
            flag.store(true, Ordering::Relaxed);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    let mut pipeline = Pipeline::new(cli.root.clone(), config)
        .with_force_rescan(cli.force_rescan)
        .with_shutdown_flag(shutdown_flag);
    // Progress bars would corrupt piped JSON output
    if !cli.json && !cli.quiet {
        pipeline = pipeline.with_progress(Arc::new(Progress::new(false)));
    }

    let result = pipeline.run()?;

    if cli.json {
        println!("{}", report::render_json(&result, true)?);
    } else {
        print!("{}", report::render_text(&result));
    }

    let code = if !result.metadata.warnings.is_empty() {
        ExitCode::PartialSuccess
    } else if result.found_anything() {
        ExitCode::Success
    } else {
        ExitCode::NothingFound
    };
    Ok(code)
}
