//! Logging initialization
//!
//! Logs go to stderr unless [`LoggingConfig::directory`] is set, in which
//! case they are written to daily-rotated files through a non-blocking
//! writer. `RUST_LOG` always wins over the configured level.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Flushes file logs on drop; hold it for the life of the process
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

impl LoggingConfig {
    /// Install the global subscriber
    ///
    /// Returns a guard when logging to files.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory cannot be created or a global
    /// subscriber is already installed.
    pub fn init(&self) -> io::Result<Option<LoggingGuard>> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match &self.directory {
            None => {
                init_stderr(self, filter)?;
                Ok(None)
            }
            Some(dir) => init_file(self, dir, filter).map(Some),
        }
    }
}

fn init_stderr(config: &LoggingConfig, filter: EnvFilter) -> io::Result<()> {
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.structured {
        subscriber
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    } else {
        subscriber
            .with(fmt::layer().compact().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

fn init_file(config: &LoggingConfig, dir: &Path, filter: EnvFilter) -> io::Result<LoggingGuard> {
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.structured {
        subscriber
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }

    Ok(LoggingGuard { _file_guard: guard })
}
