//! Post-processing of raw model output. Models occasionally ignore the
//! "translation only" instruction; these passes recover the bare string.

use std::sync::OnceLock;

use regex::Regex;

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('“', '”'),
    ('‘', '’'),
    ('«', '»'),
    ('„', '“'),
];

fn translates_to() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)translates to").expect("valid meta pattern"))
}

/// Trailing word sequence, optionally wrapped in quotes and followed by a period.
fn trailing_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"['‘’"“”«]?([\p{L}\- ]+)[.'‘’"“”»]*$"#)
            .expect("valid trailing pattern")
    })
}

/// `Hola translates to "Hello".` → `Hello`
fn strip_meta_commentary(text: &str) -> String {
    let Some(meta) = translates_to().find_iter(text).last() else {
        return text.to_string();
    };
    // Only look after the meta phrase so the source text cannot leak in.
    let tail = &text[meta.end()..];
    trailing_phrase()
        .captures(tail)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| text.to_string())
}

/// Remove one matching quote pair wrapping the whole response.
fn strip_wrapping_quotes(text: &str) -> String {
    let mut chars = text.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return text.to_string();
    };
    if QUOTE_PAIRS.iter().any(|&(open, close)| first == open && last == close) {
        let inner = &text[first.len_utf8()..text.len() - last.len_utf8()];
        return inner.to_string();
    }
    text.to_string()
}

/// Full cleanup pipeline.
pub fn clean_response(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_meta = strip_meta_commentary(trimmed);
    strip_wrapping_quotes(without_meta.trim())
}
