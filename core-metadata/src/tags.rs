//! Embedded Tag IO
//!
//! Reads artist/title from and writes front covers into audio files using
//! the `lofty` crate. It supports ID3v2, Vorbis Comments, MP4 tags, and the
//! other formats lofty can open.
//!
//! The processor only sees the [`TagStore`] trait so it can run without real
//! audio files in tests.

use crate::error::{MetadataError, Result};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag, TagExt};
use std::path::Path;
use tracing::debug;

/// Artist and title as found in a file's tag. Both absent when untagged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedTags {
    pub artist: Option<String>,
    pub title: Option<String>,
}

/// Reads and updates the embedded tags of audio files.
pub trait TagStore: Send + Sync {
    /// Read artist and title from the file's primary tag (or first tag present).
    fn read_tags(&self, path: &Path) -> Result<EmbeddedTags>;

    /// Store `image` as the front cover, replacing any existing front cover.
    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<()>;
}

/// [`TagStore`] backed by `lofty`, editing files in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagStore;

impl LoftyTagStore {
    pub fn new() -> Self {
        Self
    }
}

impl TagStore for LoftyTagStore {
    fn read_tags(&self, path: &Path) -> Result<EmbeddedTags> {
        let tagged_file = Probe::open(path)
            .map_err(|e| MetadataError::TagReadFailed(e.to_string()))?
            .read()
            .map_err(|e| MetadataError::TagReadFailed(e.to_string()))?;

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(EmbeddedTags::default());
        };

        Ok(EmbeddedTags {
            artist: tag.artist().map(|s| s.to_string()),
            title: tag.title().map(|s| s.to_string()),
        })
    }

    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<()> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| MetadataError::TagWriteFailed(e.to_string()))?
            .read()
            .map_err(|e| MetadataError::TagWriteFailed(e.to_string()))?;

        let primary_type = tagged_file.primary_tag_type();
        if tagged_file.tag(primary_type).is_none() {
            debug!("Creating {:?} tag", primary_type);
            tagged_file.insert_tag(Tag::new(primary_type));
        }
        let tag = tagged_file.tag_mut(primary_type).ok_or_else(|| {
            MetadataError::TagWriteFailed(format!("format does not support {:?} tags", primary_type))
        })?;

        let picture = Picture::new_unchecked(
            PictureType::CoverFront,
            Some(detect_mime_type(image)),
            None,
            image.to_vec(),
        );
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| MetadataError::TagWriteFailed(e.to_string()))
    }
}

/// Detect the image MIME type from magic bytes, defaulting to JPEG.
pub fn detect_mime_type(data: &[u8]) -> MimeType {
    match data {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => MimeType::Jpeg,
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => MimeType::Png,
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => MimeType::Gif,
        // BMP: 42 4D
        [0x42, 0x4D, ..] => MimeType::Bmp,
        _ => MimeType::Jpeg,
    }
}
