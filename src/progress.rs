//! Progress reporting for the scan pipeline using indicatif.
//!
//! The pipeline reports stage boundaries and per-file increments through
//! the [`ProgressCallback`] trait; [`Progress`] renders them as terminal
//! progress bars. Library consumers can plug in their own implementation
//! or use [`NoopProgress`] to disable reporting.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for pipeline stages.
///
/// Increments may arrive from multiple hashing threads concurrently, so
/// implementations must be `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Called when a stage starts, with the number of items it will process.
    fn on_stage_start(&self, stage: &str, total: usize);

    /// Called as items complete; `delta` items were just finished.
    fn on_progress(&self, delta: usize);

    /// Called when a stage completes.
    fn on_stage_end(&self, stage: &str);
}

/// A callback that ignores all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_stage_start(&self, _stage: &str, _total: usize) {}
    fn on_progress(&self, _delta: usize) {}
    fn on_stage_end(&self, _stage: &str) {}
}

/// Terminal progress reporter.
///
/// One bar per pipeline stage; stages run sequentially, so a single
/// active bar is tracked at a time.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter. With `quiet` nothing is drawn.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }
}

impl ProgressCallback for Progress {
    fn on_stage_start(&self, stage: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if total == 0 {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(stage.to_string());

        let mut active = self.active.lock().unwrap();
        *active = Some(pb);
    }

    fn on_progress(&self, delta: usize) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.active.lock().unwrap() {
            pb.inc(delta as u64);
        }
    }

    fn on_stage_end(&self, stage: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active.lock().unwrap().take() {
            pb.finish_with_message(format!("{stage} complete"));
        }
    }
}
