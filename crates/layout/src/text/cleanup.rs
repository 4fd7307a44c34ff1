use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalize the text of a single glyph record before line assembly.
///
/// Control characters become spaces, the text is NFC-normalized, Latin
/// ligatures are expanded and the Unicode replacement character is dropped.
/// Whitespace is left in place; [`collapse_whitespace`] runs on the
/// assembled line.
pub fn normalize_glyph_text(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let mut out = String::with_capacity(spaced.len());
    for c in spaced.nfc() {
        match expand_ligature(c) {
            Some(expanded) => out.push_str(expanded),
            None if c == char::REPLACEMENT_CHARACTER => {}
            None => out.push(c),
        }
    }
    out
}

fn expand_ligature(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{FB00}' => "ff",
        '\u{FB01}' => "fi",
        '\u{FB02}' => "fl",
        '\u{FB03}' => "ffi",
        '\u{FB04}' => "ffl",
        _ => return None,
    })
}

/// Collapse every whitespace run to one space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    whitespace.replace_all(text, " ").trim().to_string()
}
