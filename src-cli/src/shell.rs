//! Interactive menu.
//!
//! The shell owns no state beyond its streams: every action goes through the
//! [`Orchestrator`], and control always returns to the menu unless stdin is
//! closed or the user picks exit.

use std::io::{self, BufRead, Write};
use std::path::Path;

use amdl_core::{
    AppConfig, CombineOutcome, CombineStep, Downloader, Error, ErrorKind, FileInspection,
    FileSystemError, LinkList, Muxer, Orchestrator, ProcessOptions, ProcessReport,
    is_playlist_url, scan_directory, validate_url,
};
use tracing::{info, warn};

const MENU: &str = "\
Apple Music Downloader
  1. Download from URL
  2. Batch download from file
  3. Exit
  4. Check audio quality of a file or folder";

/// Whether the menu loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Menu-driven front end over an [`Orchestrator`].
pub struct Shell<R, W, D, M> {
    input: R,
    output: W,
    orchestrator: Orchestrator<D, M>,
    config: AppConfig,
}

impl<R: BufRead, W: Write, D: Downloader, M: Muxer> Shell<R, W, D, M> {
    /// Create a shell reading choices from `input` and printing to `output`.
    pub fn new(input: R, output: W, orchestrator: Orchestrator<D, M>, config: AppConfig) -> Self {
        Self {
            input,
            output,
            orchestrator,
            config,
        }
    }

    /// Run the menu until the user exits or input ends.
    ///
    /// # Errors
    ///
    /// Returns an error only if the terminal streams fail.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output, "\n{MENU}")?;
            let Some(choice) = self.prompt("Choose option (1/2/3)")? else {
                break;
            };
            let flow = match choice.as_str() {
                "1" => self.manual()?,
                "2" => self.batch()?,
                "3" => Flow::Quit,
                "4" => self.check_quality()?,
                other => {
                    writeln!(self.output, "Unknown option {other:?}")?;
                    Flow::Continue
                }
            };
            if flow == Flow::Quit {
                break;
            }
        }
        writeln!(self.output, "Bye")?;
        Ok(())
    }

    /// Print `question`, read one trimmed line. `None` means end of input.
    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_combine(&mut self) -> io::Result<Option<bool>> {
        let answer = self.prompt("Combine playlist(s) into single file? (y/n)")?;
        Ok(answer.map(|a| matches!(a.to_lowercase().as_str(), "y" | "yes")))
    }

    fn manual(&mut self) -> io::Result<Flow> {
        let Some(input) = self.prompt("Paste Apple Music URL")? else {
            return Ok(Flow::Quit);
        };
        let Ok(url) = validate_url(&input, &self.config.url_prefix) else {
            writeln!(
                self.output,
                "Invalid URL. It must start with {}",
                self.config.url_prefix
            )?;
            return Ok(Flow::Continue);
        };

        let combine_playlist = if is_playlist_url(&url) {
            match self.ask_combine()? {
                Some(answer) => answer,
                None => return Ok(Flow::Quit),
            }
        } else {
            false
        };

        self.process(&url, ProcessOptions { combine_playlist })?;
        Ok(Flow::Continue)
    }

    fn batch(&mut self) -> io::Result<Flow> {
        let question = format!(
            "Enter filename (default: {})",
            self.config.default_links_file
        );
        let Some(input) = self.prompt(&question)? else {
            return Ok(Flow::Quit);
        };
        let path = self.config.links_file_path(&input);

        let links = match LinkList::load(&path, &self.config.url_prefix) {
            Ok(links) => links,
            Err(Error::FileSystem(FileSystemError::NotFound { .. })) => {
                writeln!(self.output, "File not found: {}", path.display())?;
                return Ok(Flow::Continue);
            }
            Err(e) => {
                writeln!(self.output, "Could not read {}: {e}", path.display())?;
                return Ok(Flow::Continue);
            }
        };

        if links.is_empty() {
            writeln!(self.output, "No valid links found in {}", path.display())?;
            return Ok(Flow::Continue);
        }

        writeln!(self.output, "Found {} link(s):", links.len())?;
        for (i, url) in links.links.iter().enumerate() {
            writeln!(self.output, "  {}. {url}", i + 1)?;
        }
        if links.rejected > 0 {
            writeln!(self.output, "Skipped {} invalid line(s)", links.rejected)?;
        }

        let combine_playlist = if links.has_playlist() {
            match self.ask_combine()? {
                Some(answer) => answer,
                None => return Ok(Flow::Quit),
            }
        } else {
            false
        };
        let options = ProcessOptions { combine_playlist };

        let total = links.len();
        let mut succeeded = 0;
        for (i, url) in links.links.iter().enumerate() {
            writeln!(self.output, "\n[{}/{total}] {url}", i + 1)?;
            if self.process(url, options)? {
                succeeded += 1;
            }
        }

        info!("Batch finished: {}/{} succeeded", succeeded, total);
        writeln!(
            self.output,
            "\nBatch complete: {succeeded} succeeded, {} failed",
            total - succeeded
        )?;
        Ok(Flow::Continue)
    }

    fn check_quality(&mut self) -> io::Result<Flow> {
        let Some(input) = self.prompt("File or folder to check (default: downloads)")? else {
            return Ok(Flow::Quit);
        };
        let target = self.config.inspect_target_path(&input);

        if target.is_file() {
            self.inspect_file(&target)?;
        } else if target.is_dir() {
            self.scan_folder(&target)?;
        } else if target == self.orchestrator.output_root() {
            writeln!(self.output, "Nothing downloaded yet ({})", target.display())?;
        } else {
            writeln!(self.output, "Path not found: {}", target.display())?;
        }
        Ok(Flow::Continue)
    }

    fn inspect_file(&mut self, path: &Path) -> io::Result<()> {
        match FileInspection::for_file(path) {
            Ok(inspection) => writeln!(self.output, "{inspection}"),
            Err(e) if e.kind() == ErrorKind::Metadata => {
                warn!("{}", e);
                writeln!(self.output, "Not a readable audio file: {e}")
            }
            Err(e) => {
                warn!("{}", e);
                writeln!(self.output, "Could not inspect {}: {e}", path.display())
            }
        }
    }

    fn scan_folder(&mut self, dir: &Path) -> io::Result<()> {
        let (reports, summary) = scan_directory(dir);
        if summary.total_files() == 0 {
            return writeln!(self.output, "No audio files in {}", dir.display());
        }

        for report in &reports {
            writeln!(self.output, "{report}")?;
        }
        writeln!(self.output, "\n{summary}")
    }

    /// Process one URL and print what happened. Returns whether it succeeded.
    fn process(&mut self, url: &str, options: ProcessOptions) -> io::Result<bool> {
        match self.orchestrator.process(url, options) {
            Ok(report) => {
                self.print_report(&report)?;
                Ok(true)
            }
            Err(e) => {
                warn!("{}", e);
                let label = match e.kind() {
                    ErrorKind::Download => "Download failed",
                    ErrorKind::FileSystem => "File error",
                    ErrorKind::Configuration => "Configuration error",
                    _ => "Failed",
                };
                writeln!(self.output, "{label}: {e}")?;
                Ok(false)
            }
        }
    }

    fn print_report(&mut self, report: &ProcessReport) -> io::Result<()> {
        match &report.combine {
            Some(CombineStep::Done(CombineOutcome::Combined { output, tracks })) => {
                let name = output.file_name().map_or_else(
                    || output.display().to_string(),
                    |n| n.to_string_lossy().into_owned(),
                );
                writeln!(self.output, "Combined {tracks} tracks into {name}")?;
            }
            Some(CombineStep::Done(CombineOutcome::NotCombined)) => {
                writeln!(self.output, "Fewer than two tracks, nothing to combine")?;
            }
            Some(CombineStep::Done(CombineOutcome::MuxerUnavailable)) => {
                writeln!(
                    self.output,
                    "{} not found, tracks kept as separate files",
                    self.config.muxer
                )?;
            }
            Some(CombineStep::NoPlaylistFolder) => {
                writeln!(
                    self.output,
                    "Playlist folder not found, tracks kept as separate files"
                )?;
            }
            Some(CombineStep::Failed(reason)) => {
                writeln!(self.output, "Could not combine playlist: {reason}")?;
            }
            None => {}
        }

        let cleanup = &report.cleanup;
        writeln!(
            self.output,
            "Moved {} file(s), deleted {} lyric file(s), renamed {} file(s), \
             updated tags on {} file(s)",
            cleanup.flatten.files_moved,
            cleanup.sidecars.files_deleted,
            cleanup.renames.renamed.len(),
            cleanup.tags_updated()
        )?;
        for quality in &cleanup.quality {
            writeln!(self.output, "  {quality}")?;
        }
        if !cleanup.failures.is_empty() {
            writeln!(
                self.output,
                "{} file(s) could not be fully processed, see the log",
                cleanup.failures.len()
            )?;
        }
        Ok(())
    }
}
