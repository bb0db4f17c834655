//! `amdl` - interactive Apple Music download front end.
//!
//! Runs the companion downloader for pasted or batched URLs, then tidies the
//! downloads folder: flat layout, no lyric sidecars, clean file names and
//! tags, optional single-file playlists.

mod logging;
mod shell;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use amdl_core::{AppConfig, ConfigError, FfmpegMuxer, Muxer, Orchestrator, Result};
use tracing::{error, info, warn};

use crate::logging::LoggingConfig;
use crate::shell::Shell;

/// Environment variable overriding the base directory.
const HOME_ENV: &str = "AMDL_HOME";

fn main() -> ExitCode {
    let base_dir = match base_directory() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Keep the guard alive so the file layer flushes on exit.
    let _log_guard = match logging::init(&LoggingConfig::auto(&base_dir)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: file logging disabled: {e}");
            None
        }
    };

    match run(base_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(base_dir: PathBuf) -> Result<()> {
    info!("Starting amdl in {}", base_dir.display());

    let config = AppConfig::load(base_dir)?;
    config.verify_companion_files()?;

    if !FfmpegMuxer::new(config.muxer.clone()).is_available() {
        warn!(
            "{} not found on PATH, playlists cannot be combined",
            config.muxer
        );
    }

    let orchestrator = Orchestrator::from_config(&config);
    let stdin = io::stdin();
    Shell::new(stdin.lock(), io::stdout(), orchestrator, config).run()?;

    info!("amdl finished");
    Ok(())
}

/// `AMDL_HOME` if set, otherwise the directory holding the executable.
fn base_directory() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    let exe = std::env::current_exe()
        .map_err(|e| ConfigError::BaseDirectory(e.to_string()))?;
    if let Some(parent) = exe.parent() {
        return Ok(parent.to_path_buf());
    }

    dirs::data_local_dir()
        .map(|dir| dir.join("amdl"))
        .ok_or_else(|| {
            ConfigError::BaseDirectory(format!("{} has no parent directory", exe.display())).into()
        })
}
