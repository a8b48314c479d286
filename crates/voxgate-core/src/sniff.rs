//! Container-format sniffing over raw upload bytes.
//!
//! One strategy for all supported families: fixed-offset magic
//! markers with a per-family minimum length gate. The pipeline only
//! needs to classify a body well enough to pick a decoder command;
//! it never parses the container, so structural EBML/box walking is
//! out of scope here.

use serde::Serialize;

/// Classified container format of an uploaded body.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Opus,
    Webm,
    ThreeGp,
    Unknown,
}

impl AudioFormat {
    /// Content type used when archiving the original body.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Opus => "audio/opus",
            Self::Webm => "audio/webm",
            Self::ThreeGp => "audio/3gpp",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// File extension for the archived audio artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Webm => "webm",
            Self::ThreeGp => "3gp",
            Self::Unknown => "bin",
        }
    }
}

/// Ogg page header magic, offset 0.
const OGG_MAGIC: &[u8] = b"OggS";
/// Opus identification header, fixed offset inside the first Ogg page.
const OPUS_MAGIC: &[u8] = b"OpusHead";
const OPUS_MAGIC_OFFSET: usize = 28;
/// EBML document header, offset 0 (WebM and Matroska share it).
const EBML_MAGIC: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];
/// ISO BMFF `ftyp` box name, offset 4.
const FTYP_MAGIC: &[u8] = b"ftyp";
/// 3GP major brands all start with `3g` at offset 8.
const THREEGP_BRAND: &[u8] = b"3g";

/// Classify raw body bytes by container signature. Bodies too short
/// to hold a family's markers can never match that family.
pub fn sniff(body: &[u8]) -> AudioFormat {
    if is_opus(body) {
        AudioFormat::Opus
    } else if is_webm(body) {
        AudioFormat::Webm
    } else if is_threegp(body) {
        AudioFormat::ThreeGp
    } else {
        AudioFormat::Unknown
    }
}

/// An Ogg container alone is not enough: the embedded stream must
/// identify itself as Opus, otherwise generic Ogg (e.g. Vorbis) would
/// be fed to the wrong decoder.
fn is_opus(body: &[u8]) -> bool {
    body.len() >= OPUS_MAGIC_OFFSET + OPUS_MAGIC.len()
        && body.starts_with(OGG_MAGIC)
        && &body[OPUS_MAGIC_OFFSET..OPUS_MAGIC_OFFSET + OPUS_MAGIC.len()] == OPUS_MAGIC
}

fn is_webm(body: &[u8]) -> bool {
    body.starts_with(EBML_MAGIC)
}

fn is_threegp(body: &[u8]) -> bool {
    body.len() >= 8 + THREEGP_BRAND.len()
        && &body[4..8] == FTYP_MAGIC
        && &body[8..8 + THREEGP_BRAND.len()] == THREEGP_BRAND
}

/// Build a minimal byte prefix that classifies as Opus. Test helper
/// shared with the server integration tests.
pub fn opus_preamble() -> Vec<u8> {
    let mut body = vec![0u8; 36];
    body[..4].copy_from_slice(OGG_MAGIC);
    body[28..36].copy_from_slice(OPUS_MAGIC);
    body
}
