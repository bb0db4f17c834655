//! Structured logging using tracing.
//!
//! Two layers are installed:
//! - Console output on stderr, human-readable, filtered by `RUST_LOG`
//! - JSON file output in `<base>/logs`, rotated and pruned
//!
//! Console output goes to stderr so it never interleaves with the menu and
//! reports the shell prints on stdout.

use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Crates whose events are always let through at the configured level.
const OWN_TARGETS: [&str; 2] = ["amdl", "amdl_core"];

/// Logging configuration options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files are stored.
    pub log_directory: PathBuf,
    /// Log file name prefix (e.g., "amdl" -> "amdl.2026-01-15").
    pub log_file_prefix: String,
    /// Maximum level for our crates on the console.
    pub console_level: Level,
    /// Maximum level for our crates in the log file.
    pub file_level: Level,
    /// How often to rotate log files.
    pub rotation: LogRotation,
    /// Number of rotated files to keep (0 = keep forever).
    pub max_log_files: usize,
    /// Whether to include ANSI color codes in console output.
    pub console_ansi: bool,
    /// Whether to include file/line info in console output.
    pub include_file_line: bool,
    /// Whether to include the target module in console output.
    pub include_target: bool,
    /// Whether to log span events (enter/exit).
    pub log_span_events: bool,
}

/// Log rotation frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// Create a new log file every hour.
    Hourly,
    /// Create a new log file every day.
    Daily,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
        }
    }
}

impl LoggingConfig {
    /// Verbose configuration for debug builds.
    #[must_use]
    pub fn development(base_dir: &Path) -> Self {
        Self {
            log_directory: log_directory(base_dir),
            log_file_prefix: "amdl".to_string(),
            console_level: Level::DEBUG,
            file_level: Level::TRACE,
            rotation: LogRotation::Hourly,
            max_log_files: 24,
            console_ansi: true,
            include_file_line: true,
            include_target: true,
            log_span_events: true,
        }
    }

    /// Quiet console, detailed file.
    #[must_use]
    pub fn production(base_dir: &Path) -> Self {
        Self {
            log_directory: log_directory(base_dir),
            log_file_prefix: "amdl".to_string(),
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            rotation: LogRotation::Daily,
            max_log_files: 7,
            console_ansi: true,
            include_file_line: false,
            include_target: false,
            log_span_events: false,
        }
    }

    /// Pick a preset based on build type.
    #[must_use]
    pub fn auto(base_dir: &Path) -> Self {
        if cfg!(debug_assertions) {
            Self::development(base_dir)
        } else {
            Self::production(base_dir)
        }
    }

    /// Default console filter: warnings from dependencies, `console_level`
    /// for our crates.
    fn console_filter(&self) -> EnvFilter {
        with_own_targets(EnvFilter::new("warn"), self.console_level)
    }

    fn file_filter(&self) -> EnvFilter {
        with_own_targets(EnvFilter::new("info"), self.file_level)
    }
}

/// Guard that keeps file logging active. Drop this to flush and close log files.
pub struct LoggingGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize the logging system with the given configuration.
///
/// Returns a guard that must be kept alive for the duration of the program.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the file
/// appender cannot be built, or a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(&config.log_directory).map_err(|e| {
        LoggingError::DirectoryCreationFailed {
            path: config.log_directory.clone(),
            reason: e.to_string(),
        }
    })?;

    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.log_file_prefix)
        .filename_suffix("log");
    if config.max_log_files > 0 {
        builder = builder.max_log_files(config.max_log_files);
    }
    let file_appender = builder
        .build(&config.log_directory)
        .map_err(|e| LoggingError::AppenderFailed(e.to_string()))?;

    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG overrides the console default.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.console_filter());

    let span_events = if config.log_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.console_ansi)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events.clone())
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .json()
        .with_filter(config.file_filter());

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Log directory for a base directory.
#[must_use]
pub fn log_directory(base_dir: &Path) -> PathBuf {
    base_dir.join("logs")
}

fn with_own_targets(mut filter: EnvFilter, level: Level) -> EnvFilter {
    for target in OWN_TARGETS {
        let directive = format!("{target}={}", level_to_directive(level));
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Convert a tracing Level to a filter directive string.
const fn level_to_directive(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create the log directory.
    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreationFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for the failure.
        reason: String,
    },

    /// The rolling file appender could not be built.
    #[error("Failed to open log file: {0}")]
    AppenderFailed(String),

    /// A global subscriber was already set.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
