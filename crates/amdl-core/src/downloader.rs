//! External downloader invocation.
//!
//! The downloader is an opaque executable shipped next to amdl. It is run
//! once per URL as
//!
//! ```text
//! <downloader> <url> --cookies-path <cookies> --output-path <downloads>
//! ```
//!
//! and its exit status decides whether post-processing runs. Its captured
//! output is also mined for the playlist name and output folder.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DownloadError, Result};

/// Captured result of one downloader run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl DownloadOutput {
    /// Whether the downloader exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard output followed by standard error.
    #[must_use]
    pub fn combined_text(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Something that can fetch a URL into an output directory.
#[cfg_attr(test, mockall::automock)]
pub trait Downloader {
    /// Run the download, blocking until it finishes.
    ///
    /// A non-zero exit is reported through [`DownloadOutput::exit_code`],
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the downloader could not be started.
    fn download(&self, url: &str, output_dir: &Path) -> Result<DownloadOutput>;
}

/// [`Downloader`] that runs the companion downloader executable.
#[derive(Debug, Clone)]
pub struct ExternalDownloader {
    program: PathBuf,
    cookies: PathBuf,
}

impl ExternalDownloader {
    /// Create a downloader for the given executable and cookie file.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, cookies: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies: cookies.into(),
        }
    }

    /// Build the command line for a download without running it.
    #[must_use]
    pub fn command(&self, url: &str, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(url)
            .arg("--cookies-path")
            .arg(&self.cookies)
            .arg("--output-path")
            .arg(output_dir);
        cmd
    }
}

impl Downloader for ExternalDownloader {
    fn download(&self, url: &str, output_dir: &Path) -> Result<DownloadOutput> {
        info!("Downloading {}", url);
        debug!("Downloader: {}", self.program.display());

        let output = self
            .command(url, output_dir)
            .output()
            .map_err(|e| DownloadError::SpawnFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        Ok(DownloadOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Whether `url` carries the expected prefix.
#[must_use]
pub fn is_valid_url(url: &str, prefix: &str) -> bool {
    url.trim().starts_with(prefix)
}

/// Check a URL against the expected prefix.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidUrl`] when the prefix does not match.
pub fn validate_url(url: &str, prefix: &str) -> Result<String> {
    let url = url.trim();
    if is_valid_url(url, prefix) {
        Ok(url.to_string())
    } else {
        Err(DownloadError::InvalidUrl(url.to_string()).into())
    }
}

/// Whether the URL points at a playlist.
#[must_use]
pub fn is_playlist_url(url: &str) -> bool {
    url.contains("playlist")
}

/// A line announcing the playlist, e.g. `Playlist: Chill Mix` or
/// `Downloading playlist "Chill Mix"`.
///
/// The keyword must be followed by `:`, `=` or an opening quote, so URL paths
/// (`/playlist/...`) and progress lines (`playlist tracks (1/20)`) never match.
static PLAYLIST_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?im)\bplaylist\b(?:\s+name)?\s*(?:[:=]\s*["'“]?|["'“])"#,
        r#"([^"'”\r\n]*[^\s"'”])["'”]?\s*$"#,
    ))
    .ok()
});

/// Find the playlist's display name in downloader output.
#[must_use]
pub fn parse_playlist_name(output: &str) -> Option<String> {
    let re = PLAYLIST_LINE.as_ref()?;
    output.lines().find_map(|line| {
        let name = re.captures(line)?.get(1)?.as_str().trim();
        (!name.is_empty() && !name.contains("://")).then(|| name.to_string())
    })
}

/// Find the immediate subdirectory of `output_root` that the downloader
/// mentions in its output, if any still exists.
#[must_use]
pub fn parse_output_subdirectory(output: &str, output_root: &Path) -> Option<PathBuf> {
    let root = output_root.to_string_lossy();
    let root = root.trim_end_matches(['/', '\\']);
    if root.is_empty() {
        return None;
    }

    output.lines().find_map(|line| {
        let start = line.find(root)? + root.len();
        let rest = line[start..].trim_start_matches(['/', '\\']);
        let first = rest
            .split(['/', '\\'])
            .next()?
            .trim_end_matches(['"', '\'', ',', ')'])
            .trim();
        if first.is_empty() {
            return None;
        }
        let candidate = output_root.join(first);
        candidate.is_dir().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PREFIX: &str = "https://music.apple.com/";

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://music.apple.com/us/album/x/1", PREFIX).is_ok());
        assert_eq!(
            validate_url("  https://music.apple.com/us/album/x/1 \n", PREFIX).expect("valid"),
            "https://music.apple.com/us/album/x/1"
        );
        assert!(validate_url("https://open.spotify.com/track/1", PREFIX).is_err());
        assert!(validate_url("", PREFIX).is_err());
    }

    #[test]
    fn test_is_playlist_url() {
        assert!(is_playlist_url(
            "https://music.apple.com/us/playlist/chill/pl.u-abc"
        ));
        assert!(!is_playlist_url("https://music.apple.com/us/album/x/1"));
    }

    #[test]
    fn test_command_line() {
        let downloader = ExternalDownloader::new("/opt/amdl/gamdl", "/opt/amdl/cookies.txt");
        let cmd = downloader.command("https://music.apple.com/x", Path::new("/opt/amdl/downloads"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(cmd.get_program(), "/opt/amdl/gamdl");
        assert_eq!(
            args,
            vec![
                "https://music.apple.com/x",
                "--cookies-path",
                "/opt/amdl/cookies.txt",
                "--output-path",
                "/opt/amdl/downloads",
            ]
        );
    }

    #[test]
    fn test_spawn_failure_is_error() {
        let downloader = ExternalDownloader::new("/nonexistent/downloader", "cookies.txt");
        let result = downloader.download("https://music.apple.com/x", Path::new("/tmp"));
        assert!(result.is_err());
    }

    #[test]
    fn test_output_success() {
        let ok = DownloadOutput {
            exit_code: Some(0),
            ..Default::default()
        };
        let failed = DownloadOutput {
            exit_code: Some(1),
            ..Default::default()
        };
        let killed = DownloadOutput::default();
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!killed.success());
    }

    #[test]
    fn test_parse_playlist_name() {
        assert_eq!(
            parse_playlist_name("[INFO] Starting\nPlaylist: Chill Mix\nDone"),
            Some("Chill Mix".to_string())
        );
        assert_eq!(
            parse_playlist_name("Downloading playlist \"Late Night\""),
            Some("Late Night".to_string())
        );
        assert_eq!(
            parse_playlist_name("PLAYLIST NAME = Road Trip"),
            Some("Road Trip".to_string())
        );
        assert_eq!(parse_playlist_name("Downloading album 1/3"), None);
        assert_eq!(
            parse_playlist_name("Fetching playlist https://music.apple.com/x"),
            None
        );
    }

    #[test]
    fn test_parse_playlist_name_ignores_urls_and_progress() {
        let output = "[INFO] Checking https://music.apple.com/us/playlist/chill-mix/pl.u-abc\n\
                      Playlist: Chill Mix\n";
        assert_eq!(parse_playlist_name(output), Some("Chill Mix".to_string()));
        assert_eq!(
            parse_playlist_name("[INFO] Downloading playlist tracks (1/20)"),
            None
        );
        assert_eq!(
            parse_playlist_name("Playlist: https://music.apple.com/us/playlist/x/pl.u-1"),
            None
        );
    }

    #[test]
    fn test_parse_output_subdirectory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("Chill Mix")).expect("mkdir");
        let output = format!(
            "Downloading track 1\nSaved to {}/Chill Mix/01. Song.m4a\n",
            dir.path().display()
        );

        assert_eq!(
            parse_output_subdirectory(&output, dir.path()),
            Some(dir.path().join("Chill Mix"))
        );
        assert_eq!(parse_output_subdirectory("nothing here", dir.path()), None);
    }

    #[test]
    fn test_parse_output_subdirectory_ignores_vanished_dirs() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let output = format!("Saved to {}/Gone/01. Song.m4a", dir.path().display());
        assert_eq!(parse_output_subdirectory(&output, dir.path()), None);
    }
}
