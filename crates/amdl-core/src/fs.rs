//! Filesystem helpers shared by the organizer, combiner and reporter.
//!
//! Every helper maps `io::Error` into a [`FileSystemError`] that carries the
//! path involved, so log lines always name the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, FileSystemError, Result};

/// Extensions (lowercase, no dot) treated as audio containers.
pub const AUDIO_EXTENSIONS: &[&str] = &["m4a", "mp4"];

/// Extension (lowercase, no dot) of synced-lyrics sidecar files.
pub const LYRICS_EXTENSION: &str = "lrc";

/// Converts an I/O error for read operations.
pub(crate) fn read_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for write operations.
pub(crate) fn write_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for directory creation.
pub(crate) fn create_dir_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::CreateDirFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for delete operations.
pub(crate) fn delete_error(path: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::DeleteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Converts an I/O error for move operations.
fn move_error(src: &Path, dst: &Path, e: io::Error) -> Error {
    Error::FileSystem(FileSystemError::MoveFailed {
        source_path: src.to_path_buf(),
        destination: dst.to_path_buf(),
        reason: e.to_string(),
    })
}

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| wanted.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// Check whether a path has a recognized audio extension.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

/// Check whether a path is a lyrics sidecar.
#[must_use]
pub fn is_lyrics_file(path: &Path) -> bool {
    has_extension(path, &[LYRICS_EXTENSION])
}

/// Recursively collect files under `dir` matching `predicate`, sorted by path.
///
/// Unreadable entries are skipped.
pub fn find_files<F>(dir: &Path, predicate: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && predicate(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Recursively collect audio files under `dir`, sorted by path.
pub fn find_audio_files(dir: &Path) -> Vec<PathBuf> {
    find_files(dir, is_audio_file)
}

/// Audio files directly inside `dir` (no recursion), sorted by path.
pub fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| read_error(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_audio_file(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Immediate subdirectories of `dir`, sorted by path.
pub fn list_subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| read_error(dir, e))?;
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// The immediate subdirectory of `dir` with the newest modification time.
pub fn most_recent_subdirectory(dir: &Path) -> Result<Option<PathBuf>> {
    let newest = list_subdirectories(dir)?
        .into_iter()
        .filter_map(|p| {
            let modified = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((modified, p))
        })
        .max_by_key(|(modified, _): &(SystemTime, PathBuf)| *modified)
        .map(|(_, p)| p);
    Ok(newest)
}

/// Ensure a directory exists.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| create_dir_error(path, e))
}

/// Pick a path in `dir` for `file_name` that does not exist yet.
///
/// Returns `dir/file_name` when free, otherwise `dir/<stem>_N.<ext>` with the
/// smallest unused `N >= 1`.
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());
    let ext = as_path.extension().map(|e| e.to_string_lossy().into_owned());

    (1_u32..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
            None => dir.join(format!("{stem}_{n}")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Move a file, falling back to copy + delete across filesystems.
///
/// The caller is responsible for choosing a free destination.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "Rename {} -> {} failed ({}), copying instead",
                src.display(),
                dst.display(),
                rename_err
            );
            fs::copy(src, dst).map_err(|e| move_error(src, dst, e))?;
            fs::remove_file(src).map_err(|e| delete_error(src, e))
        }
    }
}

/// Remove a file.
pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| delete_error(path, e))
}

/// Size of a file in bytes.
pub fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| read_error(path, e))
}

/// Check whether any regular file remains anywhere under `dir`.
#[must_use]
pub fn contains_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .any(|e| e.file_type().is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("a.m4a")));
        assert!(is_audio_file(Path::new("a.MP4")));
        assert!(!is_audio_file(Path::new("a.mp3")));
        assert!(!is_audio_file(Path::new("a.lrc")));
        assert!(!is_audio_file(Path::new("m4a")));
    }

    #[test]
    fn test_is_lyrics_file() {
        assert!(is_lyrics_file(Path::new("song.lrc")));
        assert!(is_lyrics_file(Path::new("song.LRC")));
        assert!(!is_lyrics_file(Path::new("song.m4a")));
    }

    #[test]
    fn test_unique_destination_free_name() {
        let dir = create_test_dir();
        assert_eq!(
            unique_destination(dir.path(), "X.m4a"),
            dir.path().join("X.m4a")
        );
    }

    #[test]
    fn test_unique_destination_skips_taken_suffixes() {
        let dir = create_test_dir();
        fs::write(dir.path().join("X.m4a"), b"a").expect("write");
        fs::write(dir.path().join("X_1.m4a"), b"b").expect("write");
        assert_eq!(
            unique_destination(dir.path(), "X.m4a"),
            dir.path().join("X_2.m4a")
        );
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let dir = create_test_dir();
        fs::write(dir.path().join("notes"), b"a").expect("write");
        assert_eq!(
            unique_destination(dir.path(), "notes"),
            dir.path().join("notes_1")
        );
    }

    #[test]
    fn test_find_audio_files_sorted_and_recursive() {
        let dir = create_test_dir();
        fs::create_dir_all(dir.path().join("b/deep")).expect("mkdir");
        fs::create_dir_all(dir.path().join("a")).expect("mkdir");
        fs::write(dir.path().join("b/deep/2.m4a"), b"x").expect("write");
        fs::write(dir.path().join("a/1.mp4"), b"x").expect("write");
        fs::write(dir.path().join("a/1.lrc"), b"x").expect("write");

        let found = find_audio_files(dir.path());
        assert_eq!(
            found,
            vec![dir.path().join("a/1.mp4"), dir.path().join("b/deep/2.m4a")]
        );
    }

    #[test]
    fn test_move_file() {
        let dir = create_test_dir();
        let src = dir.path().join("src.m4a");
        let dst = dir.path().join("dst.m4a");
        fs::write(&src, b"data").expect("write");

        move_file(&src, &dst).expect("move");
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).expect("read"), b"data");
    }

    #[test]
    fn test_contains_files() {
        let dir = create_test_dir();
        fs::create_dir_all(dir.path().join("empty/nested")).expect("mkdir");
        assert!(!contains_files(dir.path()));
        fs::write(dir.path().join("empty/nested/cover.jpg"), b"x").expect("write");
        assert!(contains_files(dir.path()));
    }

    #[test]
    fn test_list_audio_files_is_shallow() {
        let dir = create_test_dir();
        fs::create_dir_all(dir.path().join("sub")).expect("mkdir");
        fs::write(dir.path().join("top.m4a"), b"x").expect("write");
        fs::write(dir.path().join("sub/inner.m4a"), b"x").expect("write");

        let files = list_audio_files(dir.path()).expect("list");
        assert_eq!(files, vec![dir.path().join("top.m4a")]);
    }
}
