//! Audio quality reporting.
//!
//! Reads stream properties from a container and classifies the bitrate
//! against a fixed tier table. Reports can be aggregated into a
//! [`QualitySummary`] for a whole directory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::file::AudioFile;
use serde::Serialize;
use tracing::warn;

use crate::error::{MetadataError, Result};
use crate::fs::{file_size, find_audio_files};
use crate::metadata::{TagSummary, open_audio_file, read_tags};

/// Bitrate tier, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum QualityTier {
    /// 320 kbps and above.
    Kbps320,
    /// 256 kbps and above.
    Kbps256,
    /// 192 kbps and above.
    Kbps192,
    /// 128 kbps and above.
    Kbps128,
}

/// Tier table as (minimum bits per second, tier), highest first.
const TIER_TABLE: [(u32, QualityTier); 4] = [
    (320_000, QualityTier::Kbps320),
    (256_000, QualityTier::Kbps256),
    (192_000, QualityTier::Kbps192),
    (128_000, QualityTier::Kbps128),
];

impl QualityTier {
    /// Human-readable tier label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kbps320 => "320kbps tier",
            Self::Kbps256 => "256kbps tier",
            Self::Kbps192 => "192kbps tier",
            Self::Kbps128 => "128kbps tier",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of classifying a bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Assigned tier.
    pub tier: QualityTier,
    /// True when the bitrate is below every row of the table. Such files
    /// are labelled with the 256kbps tier, which overstates their quality.
    pub below_table: bool,
}

/// Classify a bitrate in bits per second.
///
/// Bitrates under 128 kbps fall back to [`QualityTier::Kbps256`] with
/// `below_table` set.
#[must_use]
pub fn classify_bitrate(bits_per_second: u32) -> Classification {
    TIER_TABLE
        .iter()
        .find(|(min, _)| bits_per_second >= *min)
        .map_or(
            Classification {
                tier: QualityTier::Kbps256,
                below_table: true,
            },
            |&(_, tier)| Classification {
                tier,
                below_table: false,
            },
        )
}

/// Stream properties of an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioProperties {
    /// Audio bitrate in bits per second.
    pub bitrate_bps: u32,
    /// Sample rate in Hz (0 when unknown).
    pub sample_rate_hz: u32,
    /// Duration.
    pub duration: Duration,
    /// File size in bytes.
    pub size_bytes: u64,
}

impl AudioProperties {
    /// Read properties from an audio file.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be parsed or reports no
    /// bitrate.
    pub fn read(path: &Path) -> Result<Self> {
        let tagged_file = open_audio_file(path)?;
        let properties = tagged_file.properties();

        let kbps = properties
            .audio_bitrate()
            .or_else(|| properties.overall_bitrate())
            .filter(|&kbps| kbps > 0)
            .ok_or_else(|| MetadataError::NoStreamInfo {
                path: path.to_path_buf(),
            })?;

        Ok(Self {
            bitrate_bps: kbps.saturating_mul(1000),
            sample_rate_hz: properties.sample_rate().unwrap_or(0),
            duration: properties.duration(),
            size_bytes: file_size(path)?,
        })
    }

    /// Bitrate as whole kbps.
    #[must_use]
    pub const fn bitrate_kbps(&self) -> u32 {
        self.bitrate_bps / 1000
    }

    /// Size in MiB with two decimals.
    #[must_use]
    pub fn formatted_size(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / (1024.0 * 1024.0))
    }

    /// Duration as `m:ss`.
    #[must_use]
    pub fn formatted_duration(&self) -> String {
        let secs = self.duration.as_secs();
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

/// Quality report for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    /// File inspected.
    pub path: PathBuf,
    /// Stream properties.
    pub properties: AudioProperties,
    /// Bitrate classification.
    pub classification: Classification,
}

impl QualityReport {
    /// Build a report from already-read properties.
    #[must_use]
    pub fn new(path: PathBuf, properties: AudioProperties) -> Self {
        let classification = classify_bitrate(properties.bitrate_bps);
        Self {
            path,
            properties,
            classification,
        }
    }

    /// Read and classify one file.
    ///
    /// Logs a warning when the bitrate falls below the tier table.
    pub fn for_file(path: &Path) -> Result<Self> {
        let report = Self::new(path.to_path_buf(), AudioProperties::read(path)?);
        if report.classification.below_table {
            warn!(
                "{} is {} kbps, below the lowest tier; labelled {}",
                path.display(),
                report.properties.bitrate_kbps(),
                report.classification.tier
            );
        }
        Ok(report)
    }

    /// File name for display.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.properties;
        write!(
            f,
            "{}: {} kbps, {} Hz, {}, {}, {}",
            self.file_name(),
            p.bitrate_kbps(),
            p.sample_rate_hz,
            p.formatted_duration(),
            p.formatted_size(),
            self.classification.tier
        )
    }
}

/// Full per-file inspection: quality plus tag values and cover art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInspection {
    /// Quality report.
    pub quality: QualityReport,
    /// Tags and cover art.
    pub tags: TagSummary,
}

impl FileInspection {
    /// Inspect one file.
    pub fn for_file(path: &Path) -> Result<Self> {
        Ok(Self {
            quality: QualityReport::for_file(path)?,
            tags: read_tags(path)?,
        })
    }
}

impl fmt::Display for FileInspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = &self.quality;
        let p = &q.properties;
        let t = &self.tags.fields;
        let or_unknown = |s: &str| if s.is_empty() { "Unknown".to_string() } else { s.to_string() };

        writeln!(f, "File: {}", q.file_name())?;
        writeln!(f, "Title: {}", or_unknown(&t.title))?;
        writeln!(f, "Artist: {}", or_unknown(&t.artist))?;
        writeln!(f, "Album: {}", or_unknown(&t.album))?;
        writeln!(f, "Album Artist: {}", or_unknown(&t.album_artist))?;
        writeln!(f, "Bitrate: {} kbps", p.bitrate_kbps())?;
        writeln!(f, "Sample Rate: {} Hz", p.sample_rate_hz)?;
        writeln!(f, "Duration: {}", p.formatted_duration())?;
        writeln!(f, "File Size: {}", p.formatted_size())?;
        writeln!(f, "Quality: {}", q.classification.tier)?;
        match &self.tags.cover {
            Some(cover) => write!(
                f,
                "Embedded Album Art: {}, {:.2} KB",
                cover.mime_type.as_deref().unwrap_or("unknown format"),
                cover.size_bytes as f64 / 1024.0
            ),
            None => write!(f, "No embedded album art found"),
        }
    }
}

/// Aggregate of many quality reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualitySummary {
    /// Files per tier.
    pub tiers: BTreeMap<QualityTier, usize>,
    /// Files that fell below the tier table.
    pub below_table: usize,
    /// Files whose properties could not be read.
    pub unreadable: usize,
    /// Sum of sizes of readable files.
    pub total_bytes: u64,
}

impl QualitySummary {
    /// Build a summary from reports plus a count of unreadable files.
    #[must_use]
    pub fn from_reports(reports: &[QualityReport], unreadable: usize) -> Self {
        let mut summary = Self {
            unreadable,
            ..Self::default()
        };
        for report in reports {
            *summary.tiers.entry(report.classification.tier).or_insert(0) += 1;
            if report.classification.below_table {
                summary.below_table += 1;
            }
            summary.total_bytes += report.properties.size_bytes;
        }
        summary
    }

    /// Number of files counted, readable or not.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.tiers.values().sum::<usize>() + self.unreadable
    }

    /// Share of all files in a tier, as a percentage.
    #[must_use]
    pub fn percentage(&self, tier: QualityTier) -> f64 {
        let total = self.total_files();
        if total == 0 {
            return 0.0;
        }
        let count = self.tiers.get(&tier).copied().unwrap_or(0);
        count as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for QualitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (tier, count) in &self.tiers {
            writeln!(
                f,
                "{tier}: {count} files ({:.1}%)",
                self.percentage(*tier)
            )?;
        }
        if self.below_table > 0 {
            writeln!(f, "Below lowest tier: {} files", self.below_table)?;
        }
        if self.unreadable > 0 {
            writeln!(f, "Unreadable: {} files", self.unreadable)?;
        }
        writeln!(f, "Total files: {}", self.total_files())?;
        write!(
            f,
            "Total size: {:.2} MB",
            self.total_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}

/// Report on every audio file under `dir`. Unreadable files are logged and
/// counted in the summary.
pub fn scan_directory(dir: &Path) -> (Vec<QualityReport>, QualitySummary) {
    let mut reports = Vec::new();
    let mut unreadable = 0;

    for path in find_audio_files(dir) {
        match QualityReport::for_file(&path) {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("Error checking {}: {}", path.display(), e);
                unreadable += 1;
            }
        }
    }

    let summary = QualitySummary::from_reports(&reports, unreadable);
    (reports, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn props(bitrate_bps: u32, secs: u64, size_bytes: u64) -> AudioProperties {
        AudioProperties {
            bitrate_bps,
            sample_rate_hz: 44_100,
            duration: Duration::from_secs(secs),
            size_bytes,
        }
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(classify_bitrate(320_001).tier, QualityTier::Kbps320);
        assert_eq!(classify_bitrate(320_000).tier, QualityTier::Kbps320);
        assert_eq!(classify_bitrate(319_999).tier, QualityTier::Kbps256);
        assert_eq!(classify_bitrate(256_000).tier, QualityTier::Kbps256);
        assert_eq!(classify_bitrate(192_000).tier, QualityTier::Kbps192);
        assert_eq!(classify_bitrate(128_000).tier, QualityTier::Kbps128);
        assert!(!classify_bitrate(128_000).below_table);
    }

    #[test]
    fn test_classify_below_table_falls_back_to_256_tier() {
        let c = classify_bitrate(100_000);
        assert_eq!(c.tier, QualityTier::Kbps256);
        assert_eq!(c.tier.label(), "256kbps tier");
        assert!(c.below_table);
    }

    #[test]
    fn test_formatting() {
        let p = props(256_321, 185, 8 * 1024 * 1024 + 512 * 1024);
        assert_eq!(p.bitrate_kbps(), 256);
        assert_eq!(p.formatted_duration(), "3:05");
        assert_eq!(p.formatted_size(), "8.50 MB");
    }

    #[test]
    fn test_report_display() {
        let report =
            QualityReport::new(PathBuf::from("/music/Song.m4a"), props(320_500, 61, 1024 * 1024));
        assert_eq!(
            report.to_string(),
            "Song.m4a: 320 kbps, 44100 Hz, 1:01, 1.00 MB, 320kbps tier"
        );
    }

    #[test]
    fn test_summary_counts_and_percentages() {
        let reports = vec![
            QualityReport::new(PathBuf::from("a.m4a"), props(320_000, 1, 100)),
            QualityReport::new(PathBuf::from("b.m4a"), props(256_000, 1, 200)),
            QualityReport::new(PathBuf::from("c.m4a"), props(90_000, 1, 300)),
        ];
        let summary = QualitySummary::from_reports(&reports, 1);

        assert_eq!(summary.total_files(), 4);
        assert_eq!(summary.tiers.get(&QualityTier::Kbps256), Some(&2));
        assert_eq!(summary.below_table, 1);
        assert_eq!(summary.total_bytes, 600);
        assert_eq!(summary.percentage(QualityTier::Kbps320), 25.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = QualitySummary::default();
        assert_eq!(summary.total_files(), 0);
        assert_eq!(summary.percentage(QualityTier::Kbps320), 0.0);
    }

    #[test]
    fn test_inspection_display() {
        use crate::metadata::{CoverArt, TagFields};

        let inspection = FileInspection {
            quality: QualityReport::new(PathBuf::from("Song.m4a"), props(256_000, 200, 2048)),
            tags: TagSummary {
                fields: TagFields {
                    title: "Song".to_string(),
                    artist: "Artist".to_string(),
                    ..TagFields::default()
                },
                cover: Some(CoverArt {
                    mime_type: Some("image/jpeg".to_string()),
                    size_bytes: 2048,
                }),
            },
        };
        let text = inspection.to_string();

        assert!(text.starts_with("File: Song.m4a\nTitle: Song\nArtist: Artist\nAlbum: Unknown\n"));
        assert!(text.contains("Duration: 3:20"));
        assert!(text.contains("Quality: 256kbps tier"));
        assert!(text.ends_with("Embedded Album Art: image/jpeg, 2.00 KB"));
    }

    #[test]
    fn test_inspection_of_unreadable_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("junk.m4a");
        fs::write(&path, b"not audio").expect("write");
        assert!(FileInspection::for_file(&path).is_err());
    }

    #[test]
    fn test_scan_directory_counts_unreadable() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("junk.m4a"), b"not audio").expect("write");
        fs::write(dir.path().join("notes.txt"), b"ignored").expect("write");

        let (reports, summary) = scan_directory(dir.path());
        assert!(reports.is_empty());
        assert_eq!(summary.unreadable, 1);
        assert_eq!(summary.total_files(), 1);
    }
}
