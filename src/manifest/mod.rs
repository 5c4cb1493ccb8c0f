//! Stream manifests and their reconstruction into one file.
//!
//! A Tidal stream lookup yields either a plain URL or a base64 manifest.
//! Manifests come in two shapes:
//!
//! - **BTS**: a JSON object listing direct file URLs
//! - **DASH**: an MPD document with an init segment, a `$Number$` media
//!   template and a segment timeline
//!
//! [`StreamDescriptor::parse`] classifies the manifest and
//! [`Reconstructor`] turns either shape into bytes on disk.

pub mod encoder;
mod reconstruct;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use regex::Regex;
use serde::Deserialize;

use crate::error::FetchError;

pub use encoder::Encoder;
pub use reconstruct::{Reconstructor, container_path, raw_container_path};

/// Segment count assumed when a DASH timeline lists no `<S>` entries.
/// Approximate: real tracks vary in length.
pub const FALLBACK_SEGMENT_COUNT: usize = 50;

/// What a service stream lookup returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    /// Base64 manifest (Tidal V2)
    Manifest(String),
    /// Plain file URL
    Url(String),
}

/// Decoded manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDescriptor {
    /// BTS: one file, downloaded verbatim
    Direct {
        url: String,
        mime_type: String,
        codecs: String,
    },
    /// DASH: init segment plus ordered media segments (never empty)
    Segmented {
        init_url: String,
        media_urls: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BtsManifest {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    codecs: String,
    #[serde(default)]
    urls: Vec<String>,
}

fn pattern(re: &str) -> Result<Regex, FetchError> {
    Regex::new(re).map_err(|e| FetchError::Parse(e.to_string()))
}

impl StreamDescriptor {
    /// Decode a base64 manifest.
    pub fn parse(manifest_b64: &str) -> Result<Self, FetchError> {
        let bytes = BASE64
            .decode(manifest_b64.trim())
            .map_err(|e| FetchError::ManifestMalformed(format!("bad base64: {}", e)))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| FetchError::ManifestMalformed(format!("not UTF-8: {}", e)))?;

        if text.trim_start().starts_with('{') {
            Self::parse_bts(&text)
        } else {
            Self::parse_dash(&text)
        }
    }

    fn parse_bts(text: &str) -> Result<Self, FetchError> {
        let bts: BtsManifest = serde_json::from_str(text)
            .map_err(|e| FetchError::ManifestMalformed(format!("bad BTS manifest: {}", e)))?;

        let url = bts
            .urls
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ManifestMalformed("no URLs in BTS manifest".into()))?;

        Ok(Self::Direct {
            url,
            mime_type: bts.mime_type,
            codecs: bts.codecs,
        })
    }

    fn parse_dash(text: &str) -> Result<Self, FetchError> {
        let init_url = pattern(r#"initialization="([^"]+)""#)?
            .captures(text)
            .map(|c| unescape(&c[1]))
            .ok_or_else(|| FetchError::ManifestMalformed("no initialization URL".into()))?;

        let media_template = pattern(r#"media="([^"]+)""#)?
            .captures(text)
            .map(|c| unescape(&c[1]))
            .ok_or_else(|| FetchError::ManifestMalformed("no media template".into()))?;

        let mut segment_count: usize = pattern(r#"<S d="\d+"(?: r="(\d+)")?"#)?
            .captures_iter(text)
            .map(|c| {
                c.get(1)
                    .and_then(|r| r.as_str().parse::<usize>().ok())
                    .unwrap_or(0)
                    + 1
            })
            .sum();

        if segment_count == 0 {
            tracing::warn!(
                "Manifest has no segment timeline, assuming {} segments",
                FALLBACK_SEGMENT_COUNT
            );
            segment_count = FALLBACK_SEGMENT_COUNT;
        }

        let media_urls = (1..=segment_count)
            .map(|n| media_template.replace("$Number$", &n.to_string()))
            .collect();

        Ok(Self::Segmented {
            init_url,
            media_urls,
        })
    }
}

fn unescape(s: &str) -> String {
    s.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        BASE64.encode(s)
    }

    fn dash(timeline: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><MPD><Period><AdaptationSet><Representation>
<SegmentTemplate initialization="https://cdn.test/init.mp4?a=1&amp;b=2" media="https://cdn.test/$Number$.mp4?a=1&amp;b=2" startNumber="1">
<SegmentTimeline>{}</SegmentTimeline></SegmentTemplate></Representation></AdaptationSet></Period></MPD>"#,
            timeline
        )
    }

    #[test]
    fn test_parse_bts() {
        let json = r#"{"mimeType":"audio/flac","codecs":"flac","encryptionType":"NONE","urls":["https://cdn.test/a.flac","https://cdn.test/b.flac"]}"#;
        let descriptor = StreamDescriptor::parse(&encode(json)).unwrap();
        assert_eq!(
            descriptor,
            StreamDescriptor::Direct {
                url: "https://cdn.test/a.flac".into(),
                mime_type: "audio/flac".into(),
                codecs: "flac".into(),
            }
        );
    }

    #[test]
    fn test_parse_bts_with_leading_whitespace() {
        let json = "  \n{\"urls\":[\"https://cdn.test/a.flac\"]}";
        assert!(matches!(
            StreamDescriptor::parse(&encode(json)).unwrap(),
            StreamDescriptor::Direct { .. }
        ));
    }

    #[test]
    fn test_bts_without_urls_is_malformed() {
        let result = StreamDescriptor::parse(&encode(r#"{"mimeType":"audio/flac","urls":[]}"#));
        assert!(matches!(result, Err(FetchError::ManifestMalformed(_))));
    }

    #[test]
    fn test_repeat_count_expansion() {
        // r=2 -> 3, r=0 -> 1, none -> 1
        let manifest = dash(r#"<S d="176128" r="2"/><S d="176128" r="0"/><S d="94208"/>"#);
        let StreamDescriptor::Segmented {
            init_url,
            media_urls,
        } = StreamDescriptor::parse(&encode(&manifest)).unwrap()
        else {
            panic!("expected segmented descriptor");
        };

        assert_eq!(init_url, "https://cdn.test/init.mp4?a=1&b=2");
        assert_eq!(media_urls.len(), 5);
        assert_eq!(media_urls[0], "https://cdn.test/1.mp4?a=1&b=2");
        assert_eq!(media_urls[4], "https://cdn.test/5.mp4?a=1&b=2");
    }

    #[test]
    fn test_missing_timeline_uses_fallback_count() {
        let manifest = dash("");
        match StreamDescriptor::parse(&encode(&manifest)).unwrap() {
            StreamDescriptor::Segmented { media_urls, .. } => {
                assert_eq!(media_urls.len(), FALLBACK_SEGMENT_COUNT)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_initialization_is_malformed() {
        let manifest = r#"<MPD><SegmentTemplate media="https://cdn.test/$Number$.mp4"/></MPD>"#;
        assert!(matches!(
            StreamDescriptor::parse(&encode(manifest)),
            Err(FetchError::ManifestMalformed(_))
        ));
    }

    #[test]
    fn test_missing_media_is_malformed() {
        let manifest = r#"<MPD><SegmentTemplate initialization="https://cdn.test/init.mp4"/></MPD>"#;
        assert!(matches!(
            StreamDescriptor::parse(&encode(manifest)),
            Err(FetchError::ManifestMalformed(_))
        ));
    }

    #[test]
    fn test_invalid_base64_is_malformed() {
        assert!(matches!(
            StreamDescriptor::parse("%%% not base64 %%%"),
            Err(FetchError::ManifestMalformed(_))
        ));
    }

    #[test]
    fn test_non_utf8_is_malformed() {
        let encoded = BASE64.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(
            StreamDescriptor::parse(&encoded),
            Err(FetchError::ManifestMalformed(_))
        ));
    }
}
