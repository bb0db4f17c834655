//! Lossless playlist concatenation.
//!
//! A playlist download leaves one file per track. [`PlaylistCombiner`] joins
//! them into a single container with the muxer's concat demuxer in
//! stream-copy mode, so nothing is re-encoded.
//!
//! The muxer sits behind the [`Muxer`] trait so the combine logic can be
//! tested without ffmpeg installed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::{CombineError, Error, Result};
use crate::fs::{find_audio_files, remove_file, unique_destination, write_error};

/// Characters that may not appear in a file name on common filesystems.
const ILLEGAL_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// External tool able to concatenate media files without re-encoding.
#[cfg_attr(test, mockall::automock)]
pub trait Muxer {
    /// Whether the tool can be invoked at all.
    fn is_available(&self) -> bool;

    /// Concatenate the files listed in `list_file` (concat-demuxer format)
    /// into `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails to start or exits unsuccessfully.
    fn concat(&self, list_file: &Path, output: &Path) -> Result<()>;
}

/// [`Muxer`] backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    program: String,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegMuxer {
    /// Create a muxer using the given program name or path.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program name or path used for invocation.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Muxer for FfmpegMuxer {
    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn concat(&self, list_file: &Path, output: &Path) -> Result<()> {
        debug!(
            "Running {} concat: {} -> {}",
            self.program,
            list_file.display(),
            output.display()
        );

        let result = Command::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list_file)
            .args(["-c", "copy"])
            .arg(output)
            .output()
            .map_err(|e| CombineError::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if result.status.success() {
            Ok(())
        } else {
            Err(CombineError::MuxerFailed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            }
            .into())
        }
    }
}

/// Result of [`PlaylistCombiner::combine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CombineOutcome {
    /// Tracks were joined and the originals removed.
    Combined {
        /// The combined file.
        output: PathBuf,
        /// Number of tracks joined.
        tracks: usize,
    },
    /// Fewer than two tracks; nothing to do.
    NotCombined,
    /// The muxer is not installed; originals are untouched.
    MuxerUnavailable,
}

/// Strip characters that cannot appear in a file name.
///
/// Falls back to `fallback` when nothing usable remains.
#[must_use]
pub fn sanitize_playlist_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Concat-demuxer list entry for one file. Single quotes are escaped the way
/// the demuxer expects.
fn concat_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{escaped}'")
}

/// Joins the tracks of a playlist download into one file.
#[derive(Debug, Clone)]
pub struct PlaylistCombiner<M> {
    muxer: M,
    fallback_name: String,
}

impl<M: Muxer> PlaylistCombiner<M> {
    /// Create a combiner. `fallback_name` is used when a playlist name
    /// sanitizes to nothing.
    pub fn new(muxer: M, fallback_name: impl Into<String>) -> Self {
        Self {
            muxer,
            fallback_name: fallback_name.into(),
        }
    }

    /// Join every audio file under `dir` into `<playlist name>.<ext>` in `dir`.
    ///
    /// Tracks are joined in path order. On muxer failure the partial output
    /// is removed and the originals are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the concat list cannot be written or the muxer
    /// fails.
    pub fn combine(&self, dir: &Path, playlist_name: &str) -> Result<CombineOutcome> {
        let tracks = find_audio_files(dir);
        if tracks.len() < 2 {
            debug!(
                "{} holds {} track(s), nothing to combine",
                dir.display(),
                tracks.len()
            );
            return Ok(CombineOutcome::NotCombined);
        }

        if !self.muxer.is_available() {
            warn!("Muxer not found, skipping playlist combination");
            return Ok(CombineOutcome::MuxerUnavailable);
        }

        let name = sanitize_playlist_name(playlist_name, &self.fallback_name);
        let ext = tracks[0]
            .extension()
            .map_or_else(|| "m4a".to_string(), |e| e.to_string_lossy().to_lowercase());
        let output = unique_destination(dir, &format!("{name}.{ext}"));

        info!(
            "Combining {} tracks into {}",
            tracks.len(),
            output.display()
        );

        // Removed when dropped, whatever the muxer does.
        let list_file = self.write_concat_list(dir, &tracks)?;

        if let Err(e) = self.muxer.concat(list_file.path(), &output) {
            error!("Failed to combine playlist: {}", e);
            if output.exists()
                && let Err(cleanup_err) = remove_file(&output)
            {
                warn!("{}", cleanup_err);
            }
            return Err(e);
        }
        drop(list_file);

        for track in &tracks {
            if let Err(e) = remove_file(track) {
                warn!("Combined, but could not remove original: {}", e);
            }
        }

        info!("Combined playlist saved as {}", output.display());
        Ok(CombineOutcome::Combined {
            output,
            tracks: tracks.len(),
        })
    }

    fn write_concat_list(&self, dir: &Path, tracks: &[PathBuf]) -> Result<NamedTempFile> {
        let list_error = |reason: String| -> Error {
            CombineError::ListFailed {
                dir: dir.to_path_buf(),
                reason,
            }
            .into()
        };

        let mut list_file = tempfile::Builder::new()
            .prefix(".concat-")
            .suffix(".txt")
            .tempfile_in(dir)
            .map_err(|e| list_error(e.to_string()))?;

        for track in tracks {
            let absolute = std::path::absolute(track).map_err(|e| list_error(e.to_string()))?;
            writeln!(list_file, "{}", concat_entry(&absolute))
                .map_err(|e| write_error(list_file.path(), e))?;
        }
        list_file
            .flush()
            .map_err(|e| write_error(list_file.path(), e))?;

        Ok(list_file)
    }
}
