//! Adapter layer: Convert Spotify DTOs to catalog tracks
//!
//! This is the ONLY place where DTO types are converted to domain types.

use super::{CatalogAlbum, CatalogTrack};
use super::dto;

fn join_artists(artists: &[dto::Artist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert a Spotify track; album fields stay empty when the listing omitted them.
pub fn to_track(track: dto::Track) -> CatalogTrack {
    let mut result = CatalogTrack {
        id: track.id.unwrap_or_default(),
        isrc: track
            .external_ids
            .and_then(|ids| ids.isrc)
            .map(|isrc| isrc.trim().to_ascii_uppercase())
            .unwrap_or_default(),
        title: track.name,
        artist: join_artists(&track.artists),
        track_number: track.track_number,
        disc_number: track.disc_number.max(1),
        ..Default::default()
    };
    if let Some(album) = track.album {
        result.apply_album(&to_album(album));
    }
    result
}

/// Convert a Spotify album.
pub fn to_album(album: dto::Album) -> CatalogAlbum {
    CatalogAlbum {
        artist: join_artists(&album.artists),
        cover_url: album.images.into_iter().next().map(|i| i.url),
        name: album.name,
        release_date: album.release_date,
        total_tracks: album.total_tracks,
    }
}
