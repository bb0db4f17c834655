//! Tag cleanup for downloaded MP4/M4A files.
//!
//! Reads the title, artist, album and album-artist atoms, runs each through
//! [`normalize_text`] and writes back the ones that changed.
//!
//! # Example
//!
//! ```rust,ignore
//! use amdl_core::metadata::update_metadata;
//! use std::path::Path;
//!
//! let update = update_metadata(Path::new("downloads/Song.m4a"))?;
//! for change in &update.changes {
//!     println!("{}: {} -> {}", change.field, change.old, change.new);
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MetadataError, Result};
use crate::fs::is_audio_file;
use crate::normalize::normalize_text;

/// One of the four tag fields the updater manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagField {
    /// Track title.
    Title,
    /// Track artist.
    Artist,
    /// Album name.
    Album,
    /// Album artist.
    AlbumArtist,
}

impl TagField {
    /// All managed fields in update order.
    pub const ALL: [Self; 4] = [Self::Title, Self::Artist, Self::Album, Self::AlbumArtist];
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "Title"),
            Self::Artist => write!(f, "Artist"),
            Self::Album => write!(f, "Album"),
            Self::AlbumArtist => write!(f, "Album Artist"),
        }
    }
}

/// The four managed tag values. Absent fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFields {
    /// Track title.
    pub title: String,
    /// Track artist.
    pub artist: String,
    /// Album name.
    pub album: String,
    /// Album artist.
    pub album_artist: String,
}

impl TagFields {
    /// Value of a single field.
    #[must_use]
    pub fn get(&self, field: TagField) -> &str {
        match field {
            TagField::Title => &self.title,
            TagField::Artist => &self.artist,
            TagField::Album => &self.album,
            TagField::AlbumArtist => &self.album_artist,
        }
    }

    /// Changes that [`normalize_text`] would make, in field order.
    ///
    /// Empty fields are never touched.
    #[must_use]
    pub fn pending_changes(&self) -> Vec<FieldChange> {
        TagField::ALL
            .iter()
            .filter_map(|&field| {
                let old = self.get(field);
                if old.is_empty() {
                    return None;
                }
                let new = normalize_text(old);
                (new != old).then(|| FieldChange {
                    field,
                    old: old.to_string(),
                    new,
                })
            })
            .collect()
    }

    fn from_tag(tag: &Tag) -> Self {
        Self {
            title: tag.title().map(|s| s.into_owned()).unwrap_or_default(),
            artist: tag.artist().map(|s| s.into_owned()).unwrap_or_default(),
            album: tag.album().map(|s| s.into_owned()).unwrap_or_default(),
            album_artist: tag
                .get_string(&ItemKey::AlbumArtist)
                .map(String::from)
                .unwrap_or_default(),
        }
    }
}

/// A single rewritten tag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field that changed.
    pub field: TagField,
    /// Value before cleanup.
    pub old: String,
    /// Value after cleanup.
    pub new: String,
}

/// Result of [`update_metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataUpdate {
    /// File that was inspected.
    pub path: PathBuf,
    /// Fields that were rewritten. Empty when nothing changed.
    pub changes: Vec<FieldChange>,
}

impl MetadataUpdate {
    /// Whether the file was rewritten.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Summary of embedded cover art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverArt {
    /// MIME type, when the container records one.
    pub mime_type: Option<String>,
    /// Image size in bytes.
    pub size_bytes: usize,
}

/// Tag values plus cover-art presence, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    /// The managed tag fields.
    pub fields: TagFields,
    /// First embedded picture, if any.
    pub cover: Option<CoverArt>,
}

pub(crate) fn open_audio_file(path: &Path) -> Result<TaggedFile> {
    if !is_audio_file(path) {
        return Err(MetadataError::UnsupportedFormat {
            path: path.to_path_buf(),
        }
        .into());
    }

    let read_failed = |reason: String| MetadataError::ReadFailed {
        path: path.to_path_buf(),
        reason,
    };

    Ok(Probe::open(path)
        .map_err(|e| read_failed(e.to_string()))?
        .read()
        .map_err(|e| read_failed(e.to_string()))?)
}

/// Read the managed tag fields and cover-art summary.
///
/// A file without tags yields empty fields.
pub fn read_tags(path: &Path) -> Result<TagSummary> {
    let tagged_file = open_audio_file(path)?;

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return Ok(TagSummary {
            fields: TagFields::default(),
            cover: None,
        });
    };

    let cover = tag.pictures().first().map(|picture| CoverArt {
        mime_type: picture.mime_type().map(|m| m.as_str().to_string()),
        size_bytes: picture.data().len(),
    });

    Ok(TagSummary {
        fields: TagFields::from_tag(tag),
        cover,
    })
}

/// Normalize the managed tag fields of one audio file in place.
///
/// The container is only rewritten when at least one field changed.
///
/// # Errors
///
/// Returns [`MetadataError`] if the file is not a recognized container or
/// cannot be read or written.
pub fn update_metadata(path: &Path) -> Result<MetadataUpdate> {
    let mut tagged_file = open_audio_file(path)?;

    let Some(tag) = tagged_file.primary_tag_mut() else {
        debug!("No tags in {}", path.display());
        return Ok(MetadataUpdate {
            path: path.to_path_buf(),
            changes: Vec::new(),
        });
    };

    let changes = TagFields::from_tag(tag).pending_changes();
    for change in &changes {
        match change.field {
            TagField::Title => tag.set_title(change.new.clone()),
            TagField::Artist => tag.set_artist(change.new.clone()),
            TagField::Album => tag.set_album(change.new.clone()),
            TagField::AlbumArtist => {
                tag.insert_text(ItemKey::AlbumArtist, change.new.clone());
            }
        }
    }

    if !changes.is_empty() {
        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| MetadataError::WriteFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let name = path.file_name().unwrap_or_default().to_string_lossy();
        for change in &changes {
            info!(
                "Updated {} for {}: {:?} -> {:?}",
                change.field, name, change.old, change.new
            );
        }
    }

    Ok(MetadataUpdate {
        path: path.to_path_buf(),
        changes,
    })
}
