//! Audio file tag reading and writing.
//!
//! Uses the lofty crate for format-independent metadata access. Published
//! files are FLAC, so tags end up as Vorbis comments plus PICTURE blocks,
//! but nothing here depends on that.
//!
//! # Features
//! - Read the embedded ISRC (idempotency check)
//! - Write the final tag set, including lyrics and one front cover

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::AcquisitionRequest;

/// Fixed description stored in every file we write.
pub const DESCRIPTION: &str = concat!("Downloaded with tunefetch ", env!("CARGO_PKG_VERSION"));

/// Everything written to a published file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    /// Release date as given by the catalog
    pub date: String,
    pub track_number: u32,
    pub total_tracks: u32,
    pub disc_number: u32,
    pub isrc: String,
    pub description: String,
    /// Synced (LRC) or plain lyrics
    pub lyrics: Option<String>,
    /// Front cover image bytes
    pub cover: Option<Vec<u8>>,
}

impl TagSet {
    /// Text fields from a request; lyrics and cover are filled in later.
    pub fn from_request(request: &AcquisitionRequest) -> Self {
        Self {
            title: request.title.clone(),
            artist: request.artist.clone(),
            album: request.album.clone(),
            album_artist: request.album_artist.clone(),
            date: request.release_date.clone(),
            track_number: request.track_number,
            total_tracks: request.total_tracks,
            disc_number: request.disc_number,
            isrc: request.isrc.clone(),
            description: DESCRIPTION.to_string(),
            lyrics: None,
            cover: None,
        }
    }
}

fn read_tag(path: &Path) -> Result<Option<Tag>> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("Failed to open file for probing: {}", e)))?
        .read()
        .map_err(|e| Error::metadata(path, format!("Failed to read file metadata: {}", e)))?;

    // Get the primary tag, or fall back to the first available tag
    Ok(tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .cloned())
}

fn text_item(tag: &Tag, key: ItemKey) -> Option<String> {
    tag.items()
        .find(|item| *item.key() == key)
        .and_then(|item| item.value().text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Embedded ISRC of an audio file, if any.
pub fn read_isrc(path: &Path) -> Result<Option<String>> {
    Ok(read_tag(path)?.and_then(|tag| text_item(&tag, ItemKey::Isrc)))
}

/// Guess the picture MIME type from magic bytes.
fn picture_mime(data: &[u8]) -> Option<MimeType> {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(MimeType::Png)
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(MimeType::Jpeg)
    } else {
        None
    }
}

/// Replace the file's tags with `tags`.
///
/// Existing pictures are dropped; at most one front cover is written.
pub fn write_tags(path: &Path, tags: &TagSet) -> Result<()> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("Failed to open file for writing: {}", e)))?
        .read()
        .map_err(|e| Error::metadata(path, format!("Failed to read file for tag writing: {}", e)))?;

    // Start from the existing primary tag, or an empty one of the right type
    let mut tag = tagged_file
        .primary_tag()
        .cloned()
        .unwrap_or_else(|| Tag::new(tagged_file.primary_tag_type()));

    tag.set_title(tags.title.clone());
    tag.set_artist(tags.artist.clone());
    tag.set_album(tags.album.clone());
    if !tags.album_artist.is_empty() {
        tag.insert_text(ItemKey::AlbumArtist, tags.album_artist.clone());
    }
    if !tags.date.is_empty() {
        tag.insert_text(ItemKey::RecordingDate, tags.date.clone());
    }
    if tags.track_number > 0 {
        tag.set_track(tags.track_number);
    }
    if tags.total_tracks > 0 {
        tag.set_track_total(tags.total_tracks);
    }
    if tags.disc_number > 0 {
        tag.set_disk(tags.disc_number);
    }
    if !tags.isrc.is_empty() {
        tag.insert_text(ItemKey::Isrc, tags.isrc.clone());
    }
    tag.set_comment(tags.description.clone());
    if let Some(ref lyrics) = tags.lyrics {
        tag.insert_text(ItemKey::Lyrics, lyrics.clone());
    }

    while !tag.pictures().is_empty() {
        tag.remove_picture(0);
    }
    if let Some(ref cover) = tags.cover {
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            picture_mime(cover),
            Some("Cover".to_string()),
            cover.clone(),
        ));
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| Error::metadata(path, format!("Failed to write tags to file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{minimal_flac, sample_request};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_read_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "This is just some text, not music.").expect("Failed to write to temp file");

        assert!(read_isrc(file.path()).is_err());
    }

    #[test]
    fn test_read_non_existent_file_returns_error() {
        let path = Path::new("non_existent_file.flac");
        assert!(read_isrc(path).is_err());
    }

    #[test]
    fn test_untagged_flac_has_no_isrc() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "plain.flac");
        assert_eq!(read_isrc(&path).unwrap(), None);
    }

    #[test]
    fn test_write_then_read_isrc() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "song.flac");
        let tags = TagSet::from_request(&sample_request());

        write_tags(&path, &tags).unwrap();

        assert_eq!(read_isrc(&path).unwrap().as_deref(), Some("USUM71703861"));
    }

    #[test]
    fn test_write_fields_and_single_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = minimal_flac(dir.path(), "song.flac");
        let mut tags = TagSet::from_request(&sample_request());
        tags.lyrics = Some("[00:01.00] hello".to_string());
        tags.cover = Some(PNG_MAGIC.to_vec());

        // Written twice: the second write must not accumulate pictures
        write_tags(&path, &tags).unwrap();
        write_tags(&path, &tags).unwrap();

        let tag = read_tag(&path).unwrap().unwrap();
        assert_eq!(tag.title().as_deref(), Some("Test Track"));
        assert_eq!(tag.artist().as_deref(), Some("Test Artist"));
        assert_eq!(tag.track(), Some(3));
        assert_eq!(tag.track_total(), Some(12));
        assert_eq!(text_item(&tag, ItemKey::AlbumArtist).as_deref(), Some("Test Album Artist"));
        assert_eq!(text_item(&tag, ItemKey::Lyrics).as_deref(), Some("[00:01.00] hello"));
        assert_eq!(tag.pictures().len(), 1);
        assert_eq!(tag.pictures()[0].pic_type(), PictureType::CoverFront);
    }

    #[test]
    fn test_picture_mime() {
        assert_eq!(picture_mime(PNG_MAGIC), Some(MimeType::Png));
        assert_eq!(picture_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(MimeType::Jpeg));
        assert_eq!(picture_mime(b"GIF89a"), None);
    }

    #[test]
    fn test_tagset_from_request() {
        let tags = TagSet::from_request(&sample_request());
        assert_eq!(tags.isrc, "USUM71703861");
        assert_eq!(tags.description, DESCRIPTION);
        assert!(tags.lyrics.is_none());
        assert!(tags.cover.is_none());
    }
}
