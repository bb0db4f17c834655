//! `amdl` Core Library
//!
//! This crate provides the core functionality for the `amdl` downloader front end:
//! - Running the external downloader for Apple Music URLs
//! - Flattening and renaming the downloaded files
//! - Cleaning up title/artist/album tags
//! - Audio quality reporting
//! - Joining playlist downloads into a single file with ffmpeg
//! - Application configuration and batch link files
//!
//! # Error Handling
//!
//! Every operation returns [`Result`]. Callers decide per call site whether a
//! failure aborts the current action; see [`error::ErrorKind`].
//!
//! ```rust,ignore
//! use amdl_core::{AppConfig, Orchestrator, ProcessOptions};
//!
//! let config = AppConfig::load("/opt/amdl")?;
//! let orchestrator = Orchestrator::from_config(&config);
//! let report = orchestrator.process(url, ProcessOptions::default())?;
//! ```

pub mod combine;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fs;
pub mod links;
pub mod metadata;
pub mod normalize;
pub mod organize;
pub mod pipeline;
pub mod quality;

pub use combine::{CombineOutcome, FfmpegMuxer, Muxer, PlaylistCombiner, sanitize_playlist_name};
pub use config::{APPLE_MUSIC_PREFIX, AppConfig, CONFIG_FILE_NAME};
pub use downloader::{
    DownloadOutput, Downloader, ExternalDownloader, is_playlist_url, is_valid_url,
    parse_output_subdirectory, parse_playlist_name, validate_url,
};
pub use error::{
    CombineError, ConfigError, DownloadError, Error, ErrorKind, FileSystemError, MetadataError,
    Result,
};
pub use fs::{AUDIO_EXTENSIONS, LYRICS_EXTENSION, is_audio_file, is_lyrics_file, unique_destination};
pub use links::LinkList;
pub use metadata::{
    CoverArt, FieldChange, MetadataUpdate, TagField, TagFields, TagSummary, read_tags,
    update_metadata,
};
pub use normalize::{normalize_text, strip_track_prefix};
pub use organize::{
    FileFailure, FlattenReport, Organizer, RenameReport, RenamedFile, SidecarReport,
};
pub use pipeline::{CleanupReport, CombineStep, Orchestrator, ProcessOptions, ProcessReport};
pub use quality::{
    AudioProperties, Classification, FileInspection, QualityReport, QualitySummary, QualityTier,
    classify_bitrate, scan_directory,
};
