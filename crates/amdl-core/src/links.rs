//! Batch link files: one URL per line.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::downloader::{is_playlist_url, is_valid_url};
use crate::error::{FileSystemError, Result};
use crate::fs::read_error;

/// URLs accepted from a batch file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkList {
    /// Accepted URLs.
    pub links: Vec<String>,
    /// Non-blank lines that did not carry the URL prefix.
    pub rejected: usize,
}

impl LinkList {
    /// Filter text to lines starting with `prefix`. Blank lines are ignored
    /// and surrounding whitespace is trimmed.
    #[must_use]
    pub fn parse(content: &str, prefix: &str) -> Self {
        let mut list = Self::default();
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if is_valid_url(line, prefix) {
                list.links.push(line.to_string());
            } else {
                debug!("Ignoring line: {}", line);
                list.rejected += 1;
            }
        }
        list
    }

    /// Read and filter a batch file.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError::NotFound`] if the file does not exist, or a
    /// read error.
    pub fn load(path: &Path, prefix: &str) -> Result<Self> {
        if !path.exists() {
            return Err(FileSystemError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = fs::read_to_string(path).map_err(|e| read_error(path, e))?;
        Ok(Self::parse(&content, prefix))
    }

    /// Whether no URL was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of accepted URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether any accepted URL is a playlist.
    #[must_use]
    pub fn has_playlist(&self) -> bool {
        self.links.iter().any(|l| is_playlist_url(l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    const PREFIX: &str = "https://music.apple.com/";

    #[test]
    fn test_parse_filters_lines() {
        let content = "\
https://music.apple.com/us/album/a/1

  https://music.apple.com/us/playlist/b/pl.1
not a url
https://open.spotify.com/track/2
";
        let list = LinkList::parse(content, PREFIX);
        assert_eq!(
            list.links,
            vec![
                "https://music.apple.com/us/album/a/1",
                "https://music.apple.com/us/playlist/b/pl.1",
            ]
        );
        assert_eq!(list.rejected, 2);
        assert!(list.has_playlist());
    }

    #[test]
    fn test_parse_empty() {
        let list = LinkList::parse("\n\n   \n", PREFIX);
        assert!(list.is_empty());
        assert_eq!(list.rejected, 0);
        assert!(!list.has_playlist());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let result = LinkList::load(&dir.path().join("links.txt"), PREFIX);
        assert!(matches!(
            result,
            Err(Error::FileSystem(FileSystemError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("links.txt");
        fs::write(&path, "https://music.apple.com/us/album/a/1\ngarbage\n").expect("write");

        let list = LinkList::load(&path, PREFIX).expect("load");
        assert_eq!(list.len(), 1);
    }
}
