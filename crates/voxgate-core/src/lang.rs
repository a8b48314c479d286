//! Static table of language tags the gateway accepts, in `xx-yy`
//! form, lowercase. Read-only, shared by every request.

pub const LANGUAGES: &[&str] = &[
    "ar-sa", "cs-cz", "da-dk", "de-at", "de-ch", "de-de", "el-gr", "en-au", "en-ca",
    "en-gb", "en-ie", "en-in", "en-nz", "en-us", "en-za", "es-ar", "es-cl", "es-co",
    "es-es", "es-mx", "es-us", "fi-fi", "fr-be", "fr-ca", "fr-ch", "fr-fr", "he-il",
    "hi-in", "hu-hu", "id-id", "it-ch", "it-it", "ja-jp", "ko-kr", "nb-no", "nl-be",
    "nl-nl", "pl-pl", "pt-br", "pt-pt", "ro-ro", "ru-ru", "sk-sk", "sv-se", "th-th",
    "tr-tr", "uk-ua", "vi-vn", "zh-cn", "zh-hk", "zh-tw",
];

/// Whether a 5-character `xx-yy` tag exactly matches a table entry,
/// case-insensitively.
pub fn matches_full_tag(tag: &str) -> bool {
    let lowered = tag.to_ascii_lowercase();
    LANGUAGES.contains(&lowered.as_str())
}

/// Whether a 2-character tag is a case-insensitive prefix of at least
/// one table entry's primary subtag.
pub fn matches_primary_tag(tag: &str) -> bool {
    let lowered = tag.to_ascii_lowercase();
    LANGUAGES.iter().any(|entry| entry.starts_with(&lowered))
}
