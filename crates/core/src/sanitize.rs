//! File name sanitizing for recipient names.
//!
//! Names may contain any script, so letters and digits of every alphabet are
//! kept. Whitespace and punctuation become `-`, runs of separators collapse,
//! and the result never starts with a dot or a separator.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of separators left behind by replacement.
static SEPARATOR_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_]*-[-_]*").unwrap());

/// Stem used when nothing usable is left of a name.
const FALLBACK_STEM: &str = "recipient";

/// Longest stem we produce, in characters. Leaves room for a suffix and
/// extension under common 255-byte file name limits even for multi-byte text.
const MAX_STEM_CHARS: usize = 80;

/// Zero-width joiners that belong inside words in Persian and Indic scripts.
const JOINERS: &[char] = &['\u{200c}', '\u{200d}'];

/// Base names that Windows refuses to create.
const RESERVED_STEMS: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "lpt1", "lpt2", "lpt3",
];

/// Turn a recipient name into a filesystem-safe file stem.
pub fn sanitize_file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());

    for c in name.nfc() {
        if c.is_alphanumeric() || c == '_' || c == '.' || JOINERS.contains(&c) {
            stem.push(c);
        } else {
            stem.push('-');
        }
    }

    let collapsed = SEPARATOR_COLLAPSE_REGEX.replace_all(&stem, "-");
    let trimmed = collapsed.trim_matches(|c| c == '-' || c == '.' || c == '_');

    let mut stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    while stem.ends_with(|c| c == '-' || c == '.' || c == '_') {
        stem.pop();
    }

    if stem.is_empty() {
        return FALLBACK_STEM.to_string();
    }
    if RESERVED_STEMS.contains(&stem.to_lowercase().as_str()) {
        stem.push('_');
    }
    stem
}

/// Key used to detect stems that would collide on a case-insensitive filesystem.
pub fn collision_key(stem: &str) -> String {
    stem.to_lowercase()
}
