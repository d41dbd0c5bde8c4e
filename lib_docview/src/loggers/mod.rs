//! # Logging Setup
//!
//! The library itself only emits records through the `log` facade. Binaries
//! call [`init_tracing`] once at start-up to install a `tracing` subscriber
//! that also collects those records:
//!
//! - an `EnvFilter` from `RUST_LOG`, falling back to the configured level;
//! - a console layer on stderr;
//! - optionally, a JSON layer written to a daily rolling file in `LOG_DIR`
//!   through a non-blocking appender.
//!
//! The returned [`WorkerGuard`] flushes the file writer when dropped; keep it
//! alive for the lifetime of the process.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::env;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logging options.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub level: String,
    /// Directory of the rolling JSON log. No file output when unset.
    pub log_dir: Option<PathBuf>,
    /// File name prefix of the rolling log.
    pub file_prefix: String,
    /// Colored console output.
    pub ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            file_prefix: "docview".to_string(),
            ansi: true,
        }
    }
}

impl LogOptions {
    /// Options from `RUST_LOG` and `LOG_DIR`, writing files named after `prefix`.
    pub fn from_env(prefix: &str) -> Self {
        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_dir: env::var_os("LOG_DIR").map(PathBuf::from),
            file_prefix: prefix.to_string(),
            ansi: true,
        }
    }
}

/// Errors installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// The log directory could not be created.
    #[error("Cannot create log directory: {0}")]
    Io(#[from] std::io::Error),

    /// The level is not a valid filter directive.
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber. Returns the file writer guard when file
/// output is enabled.
pub fn init_tracing(options: &LogOptions) -> Result<Option<WorkerGuard>, LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&options.level)?,
    };

    // Console output goes to stderr; stdout carries the binaries' results.
    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(options.ansi)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = rolling::daily(dir, &options.file_prefix);
            let (writer, guard) = non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        "Logging initialized with level: {} (file output: {})",
        options.level,
        options
            .log_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "off".to_string())
    );
    Ok(guard)
}
