//! Syntactic validation of request metadata headers.
//!
//! Pure function over the parsed metadata. Fields are checked in a
//! fixed order and the first offender is reported by header name;
//! the user-agent and product-tag character class is restricted
//! because those values are echoed into logs and archived metadata.

use crate::context::RequestMeta;
use crate::lang;

/// Maximum accepted length for user-agent and product-tag values.
const MAX_ECHOED_LEN: usize = 1024;

/// Validate metadata headers; returns the name of the first invalid
/// field, or `None` when every present field is well-formed.
pub fn validate(meta: &RequestMeta) -> Option<&'static str> {
    if let Some(language) = &meta.language {
        if !valid_language(language) {
            return Some("Accept-Language");
        }
    }
    if let Some(flag) = &meta.store_sample {
        if !valid_store_flag(flag) {
            return Some("Store-Sample");
        }
    }
    if let Some(flag) = &meta.store_transcription {
        if !valid_store_flag(flag) {
            return Some("Store-Transcription");
        }
    }
    if let Some(ua) = &meta.user_agent {
        if !valid_echoed_value(ua) {
            return Some("User-Agent");
        }
    }
    if let Some(tag) = &meta.product_tag {
        if !valid_echoed_value(tag) {
            return Some("Product-Tag");
        }
    }
    None
}

/// A 2-character tag must prefix-match a known entry; a 5-character
/// `xx-yy` tag must match one exactly. Both case-insensitive.
fn valid_language(tag: &str) -> bool {
    match tag.len() {
        2 => tag.chars().all(|c| c.is_ascii_alphabetic()) && lang::matches_primary_tag(tag),
        5 => {
            let bytes = tag.as_bytes();
            bytes[2] == b'-'
                && tag.chars().enumerate().all(|(i, c)| i == 2 || c.is_ascii_alphabetic())
                && lang::matches_full_tag(tag)
        }
        _ => false,
    }
}

fn valid_store_flag(flag: &str) -> bool {
    flag == "0" || flag == "1"
}

/// Letters, digits, and a small punctuation set; anything else
/// (control characters in particular) is rejected.
fn valid_echoed_value(value: &str) -> bool {
    value.len() <= MAX_ECHOED_LEN
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '-' | '_' | ' ' | '\t' | '/' | '\\' | '.' | ';' | ':')
        })
}

/// Hex-encode a header value for logging. Rejected header sets are
/// never logged raw so a crafted value cannot poison log consumers.
pub fn hex_encode(value: &str) -> String {
    value.bytes().map(|b| format!("{b:02x}")).collect()
}
