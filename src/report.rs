//! Progress and failure reporting for a page load.
//!
//! The loader never logs resource outcomes on its own; it hands them to the
//! [`Reporter`] it was constructed with.

use std::fmt;
use std::path::Path;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{info, warn};
use url::Url;

/// Observer of the load pipeline. All methods default to no-ops.
pub trait Reporter: Send + Sync {
    fn page_saved(&self, _path: &Path) {}

    fn resources_planned(&self, _count: usize) {}

    fn resource_saved(&self, _url: &Url, _path: &Path) {}

    /// A resource could not be fetched or written; the load goes on.
    fn resource_failed(&self, _url: &Url, _error: &dyn fmt::Display) {}

    fn finished(&self, _saved: usize, _failed: usize) {}
}

/// Turns pipeline events into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn page_saved(&self, path: &Path) {
        info!(path = %path.display(), "page saved");
    }

    fn resources_planned(&self, count: usize) {
        info!(count, "downloading resources");
    }

    fn resource_saved(&self, url: &Url, path: &Path) {
        info!(%url, path = %path.display(), "resource saved");
    }

    fn resource_failed(&self, url: &Url, error: &dyn fmt::Display) {
        warn!(%url, error = %error, "skipping resource");
    }

    fn finished(&self, saved: usize, failed: usize) {
        info!(saved, failed, "resources done");
    }
}

/// Progress bar over the resource loop, logging through [`TracingReporter`] as well.
pub struct ProgressReporter {
    bar: ProgressBar,
    log: TracingReporter,
}

impl ProgressReporter {
    /// A bar drawn to stderr; `hidden` suppresses drawing entirely.
    pub fn new(hidden: bool) -> Self {
        let bar = ProgressBar::new(0);
        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner} [{bar:30}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self {
            bar,
            log: TracingReporter,
        }
    }
}

impl Reporter for ProgressReporter {
    fn page_saved(&self, path: &Path) {
        self.log.page_saved(path);
    }

    fn resources_planned(&self, count: usize) {
        self.bar.set_length(count as u64);
        self.log.resources_planned(count);
    }

    fn resource_saved(&self, url: &Url, path: &Path) {
        self.bar.set_message(url.path().to_string());
        self.bar.inc(1);
        self.log.resource_saved(url, path);
    }

    fn resource_failed(&self, url: &Url, error: &dyn fmt::Display) {
        self.bar.inc(1);
        self.bar.suspend(|| self.log.resource_failed(url, error));
    }

    fn finished(&self, saved: usize, failed: usize) {
        self.bar.finish_and_clear();
        self.log.finished(saved, failed);
    }
}
