//! Destination folder and filename expansion.
//!
//! Folder placeholders: `{artist}`, `{album}`, `{album_artist}`, `{year}`,
//! `{service}` (`TIDAL`/`AMZN`/`QOBUZ`), `{source}` (`[TIDAL]`, ...).
//!
//! Filename placeholders: `{title}`, `{artist}`, `{album}`, `{album_artist}`,
//! `{release_date}`, `{track}`/`{track_number}`, `{position}`,
//! `{disc_number}`, `{service}`. Numbers are zero-padded to two digits.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use unicode_general_category::{GeneralCategory, get_general_category};

use crate::model::AcquisitionRequest;

const DEFAULT_FILENAME_TEMPLATE: &str = "{title} - {artist}";

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{([a-z_]+)\}").ok())
        .as_ref()
}

/// Invisible or unassigned characters: controls, bidi overrides, zero-width
/// marks, private-use and unassigned code points, line/paragraph separators.
fn is_invisible(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Unassigned
            | GeneralCategory::PrivateUse
            | GeneralCategory::Surrogate
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

/// Sanitizes a filename by replacing invalid characters and dropping invisible ones.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|&c| !is_invisible(c))
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// A sanitized name usable as one directory level: `.`, `..` and other
/// dot-only names become `_`. Empty stays empty.
fn path_component(name: &str) -> String {
    let name = sanitize_filename(name);
    if !name.is_empty() && name.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    name
}

/// Single-pass placeholder substitution; unknown placeholders are kept.
fn expand(template: &str, values: &[(&str, &str)]) -> String {
    let Some(placeholder) = placeholder_pattern() else {
        return template.to_string();
    };
    placeholder
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Folder for a request, relative to nothing: join it onto the output root.
///
/// Playlist members go to a folder named after the playlist; otherwise the
/// folder template is expanded and each `/`-separated component sanitized.
/// An empty result means the output root itself.
pub fn folder_for(request: &AcquisitionRequest) -> PathBuf {
    if let Some(ref playlist) = request.playlist {
        let name = path_component(playlist);
        if !name.is_empty() {
            return PathBuf::from(name);
        }
    }

    if request.folder_template.is_empty() {
        return PathBuf::new();
    }

    let abbreviation = request.service.abbreviation();
    let source = format!("[{}]", abbreviation);
    let expanded = expand(
        &request.folder_template,
        &[
            ("artist", request.artist.as_str()),
            ("album_artist", request.album_artist.as_str()),
            ("album", request.album.as_str()),
            ("year", request.year()),
            ("service", abbreviation),
            ("source", source.as_str()),
        ],
    );

    expanded
        .split('/')
        .map(path_component)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Final filename for a request, always ending in `.flac`.
pub fn filename_for(request: &AcquisitionRequest) -> String {
    let template = if request.filename_template.is_empty() {
        DEFAULT_FILENAME_TEMPLATE
    } else {
        request.filename_template.as_str()
    };

    let track = if request.position > 0 {
        request.position
    } else {
        request.track_number
    };
    let track = format!("{:02}", track);
    let position = format!("{:02}", request.position);
    let disc = format!("{:02}", request.disc_number);

    let expanded = expand(
        template,
        &[
            ("title", request.title.as_str()),
            ("artist", request.artist.as_str()),
            ("album_artist", request.album_artist.as_str()),
            ("album", request.album.as_str()),
            ("release_date", request.release_date.as_str()),
            ("track_number", track.as_str()),
            ("track", track.as_str()),
            ("position", position.as_str()),
            ("disc_number", disc.as_str()),
            ("service", request.service.as_str()),
        ],
    );

    let mut name = sanitize_filename(&expanded);
    if !name.ends_with(".flac") {
        name.push_str(".flac");
    }
    name
}

/// Absolute destination for a request: `(folder, file path)`.
pub fn destination_for(request: &AcquisitionRequest) -> (PathBuf, PathBuf) {
    let relative = folder_for(request);
    let folder = if relative.as_os_str().is_empty() {
        request.output_dir.clone()
    } else {
        request.output_dir.join(relative)
    };
    let path = folder.join(filename_for(request));
    (folder, path)
}
