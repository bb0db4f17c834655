//! Error types for amdl core operations.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are grouped
//! by domain so callers can decide, per call site, whether a failure is fatal
//! for the current action or should be logged and skipped. [`Error::kind`]
//! gives a flat classification for that decision.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Filesystem access failed.
    FileSystem,
    /// The external downloader failed or could not be started.
    Download,
    /// Tag or stream information could not be read or written.
    Metadata,
    /// Playlist concatenation failed.
    Combine,
    /// Configuration or startup validation failed.
    Configuration,
    /// Unclassified I/O failure.
    Other,
}

/// Errors that can occur in amdl core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// File system operation failed.
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    /// Downloader invocation failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Audio container could not be read or updated.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Playlist combination failed.
    #[error(transparent)]
    Combine(#[from] CombineError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FileSystem(_) => ErrorKind::FileSystem,
            Self::Download(_) => ErrorKind::Download,
            Self::Metadata(_) => ErrorKind::Metadata,
            Self::Combine(_) => ErrorKind::Combine,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Io(_) => ErrorKind::Other,
        }
    }
}

/// Filesystem failures, always carrying the offending path.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Path does not exist.
    #[error("Path not found: {path}")]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// Reading a file or directory failed.
    #[error("Failed to read {path}: {reason}")]
    ReadFailed {
        /// Path being read.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Writing a file failed.
    #[error("Failed to write {path}: {reason}")]
    WriteFailed {
        /// Path being written.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Creating a directory failed.
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirFailed {
        /// Directory being created.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Deleting a file or directory failed.
    #[error("Failed to delete {path}: {reason}")]
    DeleteFailed {
        /// Path being deleted.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Moving or renaming a file failed.
    #[error("Failed to move {source_path} to {destination}: {reason}")]
    MoveFailed {
        /// Original location.
        source_path: PathBuf,
        /// Intended location.
        destination: PathBuf,
        /// Underlying reason.
        reason: String,
    },
}

/// Downloader failures.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The downloader executable could not be started.
    #[error("Failed to start downloader {program}: {reason}")]
    SpawnFailed {
        /// Program that was invoked.
        program: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The downloader ran and exited unsuccessfully.
    #[error("Download of {url} failed (exit code {code:?})")]
    Failed {
        /// URL being downloaded.
        url: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
        /// Captured standard output.
        stdout: String,
    },

    /// URL does not carry the expected prefix.
    #[error("Not a recognized URL: {0}")]
    InvalidUrl(String),
}

/// Tag and stream-property failures.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File extension is not a recognized audio container.
    #[error("Unsupported audio file: {path}")]
    UnsupportedFormat {
        /// Offending file.
        path: PathBuf,
    },

    /// The container could not be parsed.
    #[error("Failed to read tags from {path}: {reason}")]
    ReadFailed {
        /// File being read.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Updated tags could not be persisted.
    #[error("Failed to write tags to {path}: {reason}")]
    WriteFailed {
        /// File being written.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The container has no usable audio stream information.
    #[error("No audio stream information in {path}")]
    NoStreamInfo {
        /// File being inspected.
        path: PathBuf,
    },
}

/// Playlist combination failures.
#[derive(Debug, Error)]
pub enum CombineError {
    /// The muxer could not be started.
    #[error("Failed to start muxer {program}: {reason}")]
    SpawnFailed {
        /// Program that was invoked.
        program: String,
        /// Underlying reason.
        reason: String,
    },

    /// The muxer exited unsuccessfully.
    #[error("Muxer exited with code {code:?}: {stderr}")]
    MuxerFailed {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// Writing the concat list failed.
    #[error("Failed to write concat list in {dir}: {reason}")]
    ListFailed {
        /// Directory the list was created in.
        dir: PathBuf,
        /// Underlying reason.
        reason: String,
    },
}

/// Configuration and startup validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required companion files are missing next to the program.
    #[error("Missing required files: {}", format_paths(.missing))]
    MissingCompanionFiles {
        /// Every missing path.
        missing: Vec<PathBuf>,
    },

    /// The config file could not be parsed.
    #[error("Failed to parse config file {path}: {reason}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Base directory could not be determined.
    #[error("Cannot determine base directory: {0}")]
    BaseDirectory(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
