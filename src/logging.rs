use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Where and how verbosely to log.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Number of `-v` flags.
    pub verbosity: u8,
    pub quiet: bool,
    /// Append to this file instead of writing to stderr.
    pub log_file: Option<PathBuf>,
}

impl LogConfig {
    /// Level used when `RUST_LOG` is unset.
    pub fn default_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbosity {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Builds the subscriber for one run.
///
/// The result is meant to be attached to the pipeline future with
/// `WithSubscriber::with_subscriber` rather than installed globally.
pub fn build_dispatch(config: &LogConfig) -> Result<Dispatch> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let dispatch = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            Dispatch::new(builder.with_writer(Mutex::new(file)).with_ansi(false).finish())
        }
        None => Dispatch::new(builder.with_writer(std::io::stderr).finish()),
    };

    Ok(dispatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_levels() {
        let mut config = LogConfig::default();
        assert_eq!(config.default_level(), "warn");
        config.verbosity = 1;
        assert_eq!(config.default_level(), "debug");
        config.verbosity = 3;
        assert_eq!(config.default_level(), "trace");
        config.quiet = true;
        assert_eq!(config.default_level(), "error");
    }

    #[test]
    fn test_log_file_receives_events() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("debug.log");
        let config = LogConfig {
            verbosity: 0,
            quiet: false,
            log_file: Some(log_file.clone()),
        };

        let dispatch = build_dispatch(&config).unwrap();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::error!("written to file");
        });

        let contents = std::fs::read_to_string(log_file).unwrap();
        assert!(contents.contains("written to file"));
    }

    #[test]
    fn test_unwritable_log_file() {
        let temp_dir = tempdir().unwrap();
        let config = LogConfig {
            log_file: Some(temp_dir.path().join("missing/debug.log")),
            ..LogConfig::default()
        };
        assert!(build_dispatch(&config).is_err());
    }
}
