//! Per-URL download and cleanup pipeline.
//!
//! ```text
//! download ──ok──> [combine playlist] ──> flatten ──> delete sidecars
//!    │                                       ──> rename ──> tags ──> quality
//!    └──failed──> report error (no cleanup)
//! ```
//!
//! Each URL runs to completion before the caller moves on. Only a failed or
//! unstartable download aborts a run; failures on individual files during
//! cleanup are logged and collected in the [`ProcessReport`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::combine::{CombineOutcome, FfmpegMuxer, Muxer, PlaylistCombiner};
use crate::config::AppConfig;
use crate::downloader::{
    DownloadOutput, Downloader, ExternalDownloader, is_playlist_url, parse_output_subdirectory,
    parse_playlist_name,
};
use crate::error::{DownloadError, Result};
use crate::fs::{ensure_dir, list_audio_files, most_recent_subdirectory};
use crate::metadata::{MetadataUpdate, update_metadata};
use crate::organize::{FileFailure, FlattenReport, Organizer, RenameReport, SidecarReport};
use crate::quality::QualityReport;

/// Caller choices for one URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Join a playlist download into a single file.
    pub combine_playlist: bool,
}

/// What the cleanup stage did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Flatten results.
    pub flatten: FlattenReport,
    /// Sidecar deletion results.
    pub sidecars: SidecarReport,
    /// Empty folders removed after sidecar deletion.
    pub folders_pruned: usize,
    /// Rename results.
    pub renames: RenameReport,
    /// Files whose tags were rewritten.
    pub metadata_updates: Vec<MetadataUpdate>,
    /// Quality reports for every audio file in the output root.
    pub quality: Vec<QualityReport>,
    /// Files whose tags or properties could not be processed.
    pub failures: Vec<FileFailure>,
}

impl CleanupReport {
    /// Number of files with rewritten tags.
    #[must_use]
    pub fn tags_updated(&self) -> usize {
        self.metadata_updates.iter().filter(|u| u.changed()).count()
    }
}

/// Outcome of the optional combine step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CombineStep {
    /// Combination ran (or was a no-op).
    Done(CombineOutcome),
    /// No playlist folder could be located.
    NoPlaylistFolder,
    /// Combination failed; originals were kept.
    Failed(String),
}

/// Everything that happened for one URL.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    /// URL processed.
    pub url: String,
    /// Downloader output.
    pub download: DownloadOutput,
    /// Combine step, when requested for a playlist.
    pub combine: Option<CombineStep>,
    /// Cleanup results.
    pub cleanup: CleanupReport,
}

/// Drives the downloader and the cleanup pipeline for single URLs.
#[derive(Debug)]
pub struct Orchestrator<D, M> {
    downloader: D,
    combiner: PlaylistCombiner<M>,
    organizer: Organizer,
    fallback_playlist_name: String,
}

impl Orchestrator<ExternalDownloader, FfmpegMuxer> {
    /// Orchestrator using the companion downloader and ffmpeg.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            ExternalDownloader::new(config.downloader_path(), config.cookies_path()),
            FfmpegMuxer::new(config.muxer.clone()),
            config.downloads_dir(),
            config.fallback_playlist_name.clone(),
        )
    }
}

impl<D: Downloader, M: Muxer> Orchestrator<D, M> {
    /// Create an orchestrator writing into `output_root`.
    pub fn new(
        downloader: D,
        muxer: M,
        output_root: impl Into<PathBuf>,
        fallback_playlist_name: impl Into<String>,
    ) -> Self {
        let fallback_playlist_name = fallback_playlist_name.into();
        Self {
            downloader,
            combiner: PlaylistCombiner::new(muxer, fallback_playlist_name.clone()),
            organizer: Organizer::new(output_root),
            fallback_playlist_name,
        }
    }

    /// Output root.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        self.organizer.root()
    }

    /// Download one URL and, on success, post-process the output root.
    ///
    /// # Errors
    ///
    /// Returns an error if the downloader cannot be started or exits
    /// unsuccessfully, or if the output root cannot be created or listed.
    pub fn process(&self, url: &str, options: ProcessOptions) -> Result<ProcessReport> {
        let root = self.output_root().to_path_buf();
        ensure_dir(&root)?;

        let download = self.downloader.download(url, &root)?;
        if !download.success() {
            error!(
                "Download failed for {} (exit code {:?})",
                url, download.exit_code
            );
            if !download.stderr.trim().is_empty() {
                error!("Downloader error output:\n{}", download.stderr.trim());
            }
            if !download.stdout.trim().is_empty() {
                error!("Downloader output:\n{}", download.stdout.trim());
            }
            return Err(DownloadError::Failed {
                url: url.to_string(),
                code: download.exit_code,
                stderr: download.stderr,
                stdout: download.stdout,
            }
            .into());
        }
        info!("Download finished: {}", url);

        let combine = (options.combine_playlist && is_playlist_url(url))
            .then(|| self.combine_playlist(&download));

        let cleanup = self.cleanup()?;

        Ok(ProcessReport {
            url: url.to_string(),
            download,
            combine,
            cleanup,
        })
    }

    fn combine_playlist(&self, download: &DownloadOutput) -> CombineStep {
        let text = download.combined_text();
        let name = parse_playlist_name(&text).unwrap_or_else(|| {
            warn!(
                "Playlist name not found in downloader output, using {:?}",
                self.fallback_playlist_name
            );
            self.fallback_playlist_name.clone()
        });

        let root = self.output_root();
        let folder = match parse_output_subdirectory(&text, root) {
            Some(dir) => Some(dir),
            None => most_recent_subdirectory(root).unwrap_or_else(|e| {
                warn!("{}", e);
                None
            }),
        };
        let Some(folder) = folder else {
            warn!("No playlist folder found under {}", root.display());
            return CombineStep::NoPlaylistFolder;
        };

        info!("Combining playlist {:?} from {}", name, folder.display());
        match self.combiner.combine(&folder, &name) {
            Ok(outcome) => CombineStep::Done(outcome),
            Err(e) => CombineStep::Failed(e.to_string()),
        }
    }

    /// Flatten, delete sidecars, rename, normalize tags and report quality
    /// for the output root.
    ///
    /// # Errors
    ///
    /// Returns an error only if the output root cannot be listed.
    pub fn cleanup(&self) -> Result<CleanupReport> {
        let organizer = &self.organizer;
        let mut report = CleanupReport {
            flatten: organizer.flatten()?,
            sidecars: organizer.delete_sidecars(),
            ..CleanupReport::default()
        };

        report.folders_pruned = organizer.prune_empty_subdirectories().unwrap_or_else(|e| {
            warn!("{}", e);
            0
        });

        report.renames = organizer.strip_track_numbers().unwrap_or_else(|e| {
            warn!("{}", e);
            RenameReport::default()
        });

        for path in list_audio_files(organizer.root())? {
            match update_metadata(&path) {
                Ok(update) => report.metadata_updates.push(update),
                Err(e) => {
                    warn!("Error updating metadata for {}: {}", display_name(&path), e);
                    report.failures.push(FileFailure {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }

            match QualityReport::for_file(&path) {
                Ok(quality) => {
                    info!("{}", quality);
                    report.quality.push(quality);
                }
                Err(e) => {
                    warn!("Error checking quality of {}: {}", display_name(&path), e);
                    report.failures.push(FileFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
