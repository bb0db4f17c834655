//! Output-directory organizer.
//!
//! The downloader writes `downloads/<Artist>/<Album>/NN. Title.m4a` plus
//! `.lrc` lyric sidecars. The organizer turns that into a flat directory of
//! cleanly named audio files:
//! - [`Organizer::flatten`] moves audio files out of subdirectories
//! - [`Organizer::delete_sidecars`] removes lyric sidecars
//! - [`Organizer::strip_track_numbers`] renames `01. Title.m4a` to `Title.m4a`
//!
//! No operation ever overwrites an existing file; see
//! [`crate::fs::unique_destination`].
//!
//! # Example
//!
//! ```rust,ignore
//! use amdl_core::organize::Organizer;
//!
//! let organizer = Organizer::new(config.downloads_dir());
//! let flattened = organizer.flatten()?;
//! println!("Moved {} files", flattened.files_moved);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fs::{
    contains_files, find_audio_files, find_files, is_lyrics_file, list_audio_files,
    list_subdirectories, move_file, remove_file, unique_destination,
};
use crate::normalize::strip_track_prefix;

/// A single file that could not be processed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileFailure {
    /// File involved.
    pub path: PathBuf,
    /// Error message.
    pub error: String,
}

/// Result of [`Organizer::flatten`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlattenReport {
    /// Number of audio files moved into the output root.
    pub files_moved: usize,
    /// Subdirectories removed after being emptied.
    pub directories_removed: usize,
    /// Subdirectories left in place because they still hold other files.
    pub directories_kept: usize,
    /// Files that failed to move.
    pub failures: Vec<FileFailure>,
}

/// Result of [`Organizer::delete_sidecars`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SidecarReport {
    /// Sidecars removed.
    pub files_deleted: usize,
    /// Sidecars that could not be removed.
    pub failures: Vec<FileFailure>,
}

/// A rename performed by [`Organizer::strip_track_numbers`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenamedFile {
    /// Previous path.
    pub from: PathBuf,
    /// New path.
    pub to: PathBuf,
}

/// Result of [`Organizer::strip_track_numbers`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenameReport {
    /// Files renamed.
    pub renamed: Vec<RenamedFile>,
    /// Files that could not be renamed.
    pub failures: Vec<FileFailure>,
}

impl RenameReport {
    /// Final location of every file in the output root after renaming.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.renamed
            .iter()
            .find(|r| r.from == path)
            .map_or_else(|| path.to_path_buf(), |r| r.to.clone())
    }
}

/// Reorganizes the downloader's output directory in place.
#[derive(Debug, Clone)]
pub struct Organizer {
    root: PathBuf,
}

impl Organizer {
    /// Create an organizer for the given output root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output root this organizer works on.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Move every audio file found under an immediate subdirectory into the
    /// output root, then remove subdirectories that no longer hold files.
    ///
    /// # Errors
    ///
    /// Returns an error only if the output root cannot be listed. Individual
    /// move failures are recorded in the report.
    pub fn flatten(&self) -> Result<FlattenReport> {
        let mut report = FlattenReport::default();

        for subdir in list_subdirectories(&self.root)? {
            for src in find_audio_files(&subdir) {
                let Some(name) = src.file_name().and_then(|n| n.to_str()) else {
                    warn!("Skipping file with non UTF-8 name: {}", src.display());
                    continue;
                };
                let dst = unique_destination(&self.root, name);
                match move_file(&src, &dst) {
                    Ok(()) => {
                        debug!("Moved {} -> {}", src.display(), dst.display());
                        report.files_moved += 1;
                    }
                    Err(e) => {
                        warn!("Failed to move {}: {}", src.display(), e);
                        report.failures.push(FileFailure {
                            path: src,
                            error: e.to_string(),
                        });
                    }
                }
            }

            if self.remove_if_empty(&subdir) {
                report.directories_removed += 1;
            } else {
                report.directories_kept += 1;
            }
        }

        info!(
            "Flattened {}: {} files moved, {} folders removed",
            self.root.display(),
            report.files_moved,
            report.directories_removed
        );
        Ok(report)
    }

    /// Remove a subdirectory tree if no files remain anywhere inside it.
    fn remove_if_empty(&self, dir: &Path) -> bool {
        if contains_files(dir) {
            debug!("Keeping non-empty folder {}", dir.display());
            return false;
        }
        match fs::remove_dir_all(dir) {
            Ok(()) => true,
            Err(e) => {
                debug!("Could not remove folder {}: {}", dir.display(), e);
                false
            }
        }
    }

    /// Remove immediate subdirectories that hold no files at all.
    ///
    /// Returns the number of directories removed.
    pub fn prune_empty_subdirectories(&self) -> Result<usize> {
        Ok(list_subdirectories(&self.root)?
            .iter()
            .filter(|dir| self.remove_if_empty(dir))
            .count())
    }

    /// Delete every lyrics sidecar under the output root.
    pub fn delete_sidecars(&self) -> SidecarReport {
        let mut report = SidecarReport::default();

        for path in find_files(&self.root, is_lyrics_file) {
            match remove_file(&path) {
                Ok(()) => {
                    info!("Deleted lyrics file: {}", path.display());
                    report.files_deleted += 1;
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(FileFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Strip track-number prefixes and normalize the names of audio files
    /// directly in the output root.
    ///
    /// # Errors
    ///
    /// Returns an error only if the output root cannot be listed.
    pub fn strip_track_numbers(&self) -> Result<RenameReport> {
        let mut report = RenameReport::default();

        for path in list_audio_files(&self.root)? {
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };

            let cleaned = strip_track_prefix(stem);
            if cleaned.is_empty() || cleaned == stem {
                continue;
            }

            let dst = unique_destination(&self.root, &format!("{cleaned}.{ext}"));

            match fs::rename(&path, &dst) {
                Ok(()) => {
                    info!(
                        "Renamed: {} -> {}",
                        path.file_name().unwrap_or_default().to_string_lossy(),
                        dst.file_name().unwrap_or_default().to_string_lossy()
                    );
                    report.renamed.push(RenamedFile { from: path, to: dst });
                }
                Err(e) => {
                    warn!("Failed to rename {}: {}", path.display(), e);
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
