//! Application configuration.
//!
//! Everything amdl needs lives next to the executable: the downloader, its
//! cookie file, the decryption helper, the `downloads` folder and an optional
//! `amdl.json` overriding the defaults below. The base directory is always
//! passed in explicitly, so tests can point it at a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::fs::read_error;

/// Name of the optional config file in the base directory.
pub const CONFIG_FILE_NAME: &str = "amdl.json";

/// URL prefix accepted by the shell.
pub const APPLE_MUSIC_PREFIX: &str = "https://music.apple.com/";

fn exe_name(stem: &str) -> String {
    format!("{stem}{}", std::env::consts::EXE_SUFFIX)
}

fn default_downloads_dir_name() -> String {
    "downloads".to_string()
}

fn default_downloader() -> String {
    exe_name("gamdl")
}

fn default_cookies_file() -> String {
    "cookies.txt".to_string()
}

fn default_decrypt_helper() -> String {
    exe_name("mp4decrypt")
}

fn default_muxer() -> String {
    "ffmpeg".to_string()
}

fn default_url_prefix() -> String {
    APPLE_MUSIC_PREFIX.to_string()
}

fn default_links_file() -> String {
    "links.txt".to_string()
}

fn default_playlist_name() -> String {
    "Combined Playlist".to_string()
}

/// Application configuration.
///
/// File names are relative to [`AppConfig::base_dir`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding the executable and its companion files.
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Output folder name.
    #[serde(default = "default_downloads_dir_name")]
    pub downloads_dir_name: String,
    /// Downloader executable file name.
    #[serde(default = "default_downloader")]
    pub downloader: String,
    /// Cookie file name.
    #[serde(default = "default_cookies_file")]
    pub cookies_file: String,
    /// Decryption helper executable the downloader relies on.
    #[serde(default = "default_decrypt_helper")]
    pub decrypt_helper: String,
    /// Muxer program used for playlist combination, looked up on `PATH`.
    #[serde(default = "default_muxer")]
    pub muxer: String,
    /// Accepted URL prefix.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Batch file used when the user enters nothing.
    #[serde(default = "default_links_file")]
    pub default_links_file: String,
    /// Name for combined playlists when none can be determined.
    #[serde(default = "default_playlist_name")]
    pub fallback_playlist_name: String,
}

impl AppConfig {
    /// Default configuration rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            downloads_dir_name: default_downloads_dir_name(),
            downloader: default_downloader(),
            cookies_file: default_cookies_file(),
            decrypt_helper: default_decrypt_helper(),
            muxer: default_muxer(),
            url_prefix: default_url_prefix(),
            default_links_file: default_links_file(),
            fallback_playlist_name: default_playlist_name(),
        }
    }

    /// Load `amdl.json` from `base_dir`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let config_path = base_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            debug!("No {} found, using defaults", CONFIG_FILE_NAME);
            return Ok(Self::new(base_dir));
        }

        let content = fs::read_to_string(&config_path).map_err(|e| read_error(&config_path, e))?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: config_path.clone(),
                reason: e.to_string(),
            })?;
        config.base_dir = base_dir;

        info!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Output folder.
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.base_dir.join(&self.downloads_dir_name)
    }

    /// Downloader executable.
    #[must_use]
    pub fn downloader_path(&self) -> PathBuf {
        self.base_dir.join(&self.downloader)
    }

    /// Cookie file.
    #[must_use]
    pub fn cookies_path(&self) -> PathBuf {
        self.base_dir.join(&self.cookies_file)
    }

    /// Decryption helper executable.
    #[must_use]
    pub fn decrypt_helper_path(&self) -> PathBuf {
        self.base_dir.join(&self.decrypt_helper)
    }

    /// Resolve a user-supplied batch file name; blank means the default.
    #[must_use]
    pub fn links_file_path(&self, input: &str) -> PathBuf {
        let input = input.trim();
        let name = if input.is_empty() {
            self.default_links_file.as_str()
        } else {
            input
        };
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Resolve a user-supplied file or folder to inspect; blank means the
    /// downloads folder. Surrounding quotes from drag-and-drop are dropped.
    #[must_use]
    pub fn inspect_target_path(&self, input: &str) -> PathBuf {
        let input = input.trim().trim_matches(['"', '\'']);
        if input.is_empty() {
            return self.downloads_dir();
        }
        let path = Path::new(input);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Companion files that are not present.
    #[must_use]
    pub fn missing_companion_files(&self) -> Vec<PathBuf> {
        [
            self.downloader_path(),
            self.cookies_path(),
            self.decrypt_helper_path(),
        ]
        .into_iter()
        .filter(|p| !p.is_file())
        .collect()
    }

    /// Fail if any companion file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCompanionFiles`] listing every missing path.
    pub fn verify_companion_files(&self) -> Result<()> {
        let missing = self.missing_companion_files();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCompanionFiles { missing }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::new("/opt/amdl");
        assert_eq!(config.downloads_dir(), PathBuf::from("/opt/amdl/downloads"));
        assert_eq!(config.cookies_path(), PathBuf::from("/opt/amdl/cookies.txt"));
        assert_eq!(config.url_prefix, APPLE_MUSIC_PREFIX);
        assert!(config.downloader.starts_with("gamdl"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = create_test_dir();
        let config = AppConfig::load(dir.path()).expect("load");
        assert_eq!(config, AppConfig::new(dir.path()));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = create_test_dir();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"muxer": "/usr/local/bin/ffmpeg", "downloads_dir_name": "music"}"#,
        )
        .expect("write");

        let config = AppConfig::load(dir.path()).expect("load");
        assert_eq!(config.muxer, "/usr/local/bin/ffmpeg");
        assert_eq!(config.downloads_dir(), dir.path().join("music"));
        assert_eq!(config.cookies_file, "cookies.txt");
        assert_eq!(config.base_dir, dir.path());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = create_test_dir();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").expect("write");

        let result = AppConfig::load(dir.path());
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse { .. }))));
    }

    #[test]
    fn test_links_file_path() {
        let config = AppConfig::new("/opt/amdl");
        assert_eq!(config.links_file_path(""), PathBuf::from("/opt/amdl/links.txt"));
        assert_eq!(config.links_file_path("  "), PathBuf::from("/opt/amdl/links.txt"));
        assert_eq!(config.links_file_path("batch.txt"), PathBuf::from("/opt/amdl/batch.txt"));
        assert_eq!(config.links_file_path("/tmp/x.txt"), PathBuf::from("/tmp/x.txt"));
    }

    #[test]
    fn test_inspect_target_path() {
        let config = AppConfig::new("/opt/amdl");
        assert_eq!(config.inspect_target_path(""), PathBuf::from("/opt/amdl/downloads"));
        assert_eq!(
            config.inspect_target_path("Music/Song.m4a"),
            PathBuf::from("/opt/amdl/Music/Song.m4a")
        );
        assert_eq!(
            config.inspect_target_path("\"/music/My Album\""),
            PathBuf::from("/music/My Album")
        );
    }

    #[test]
    fn test_missing_companion_files() {
        let dir = create_test_dir();
        let config = AppConfig::new(dir.path());
        assert_eq!(config.missing_companion_files().len(), 3);

        fs::write(config.cookies_path(), "# cookies").expect("write");
        let missing = config.missing_companion_files();
        assert_eq!(missing, vec![config.downloader_path(), config.decrypt_helper_path()]);
        assert!(config.verify_companion_files().is_err());

        fs::write(config.downloader_path(), "").expect("write");
        fs::write(config.decrypt_helper_path(), "").expect("write");
        assert!(config.verify_companion_files().is_ok());
    }
}
