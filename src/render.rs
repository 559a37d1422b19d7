//! Rendering of rewritten message content: flag lookup, quote blocks,
//! placeholders, and the untranslatable-content check.

use std::sync::OnceLock;

use regex::Regex;

use crate::message::Message;

/// Present in every rewrite that carries a quoted block after the first line.
/// A message containing it has already been processed.
pub const QUOTE_MARKER: &str = "\n> ";
pub const PENDING_SUFFIX: &str = "[⏳ Translating...]";
pub const UNKNOWN_FLAG: &str = "🌐";

pub fn flag_for_language(language: &str) -> &'static str {
    match language.trim() {
        "English" => "🇺🇸",
        "French" => "🇫🇷",
        "Spanish" => "🇪🇸",
        "German" => "🇩🇪",
        "Italian" => "🇮🇹",
        "Japanese" => "🇯🇵",
        "Chinese" => "🇨🇳",
        "Korean" => "🇰🇷",
        "Russian" => "🇷🇺",
        "Portuguese" => "🇵🇹",
        "Arabic" => "🇸🇦",
        "Dutch" => "🇳🇱",
        "Polish" => "🇵🇱",
        "Turkish" => "🇹🇷",
        "Hindi" => "🇮🇳",
        "Ukrainian" => "🇺🇦",
        "Greek" => "🇬🇷",
        "Hebrew" => "🇮🇱",
        "Swedish" => "🇸🇪",
        "Norwegian" => "🇳🇴",
        "Danish" => "🇩🇰",
        "Finnish" => "🇫🇮",
        "Czech" => "🇨🇿",
        "Hungarian" => "🇭🇺",
        _ => UNKNOWN_FLAG,
    }
}

/// `> {flag} line1\n> line2 ...`
pub fn quote(text: &str, flag: &str) -> String {
    format!("> {flag} {}", text.replace('\n', QUOTE_MARKER))
}

pub fn is_already_rendered(content: &str) -> bool {
    content.contains(QUOTE_MARKER)
}

/// Shown while the remote round-trip is in flight.
pub fn pending(original: &str) -> String {
    format!("{}\n{PENDING_SUFFIX}", quote(original, UNKNOWN_FLAG))
}

/// Final incoming rewrite: quoted original above the quoted translation.
pub fn incoming(original: &str, detected: &str, translated: &str, target: &str) -> String {
    format!(
        "{}\n{}",
        quote(original, flag_for_language(detected)),
        quote(translated, flag_for_language(target))
    )
}

/// Self-echo rewrite: the transmitted text with the composed original quoted.
pub fn echo(translated: &str, original: &str, language: &str) -> String {
    format!("{translated}\n{}", quote(original, flag_for_language(language)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    TooShort,
    UrlOnly,
    NoLetters,
    Sticker,
}

fn url_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(https?://\S+\s*)+$").expect("valid url-only pattern"))
}

/// Content that is not meaningfully translatable is re-emitted unchanged.
pub fn skip_reason(message: &Message) -> Option<SkipReason> {
    if message.is_sticker() {
        return Some(SkipReason::Sticker);
    }
    let content = message.content.trim();
    if content.is_empty() {
        return Some(SkipReason::Empty);
    }
    if content.chars().count() < 2 {
        return Some(SkipReason::TooShort);
    }
    if url_only().is_match(content) {
        return Some(SkipReason::UrlOnly);
    }
    if !content.chars().any(char::is_alphabetic) {
        return Some(SkipReason::NoLetters);
    }
    None
}

/// Case-insensitive, whitespace-trimmed equality.
pub fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message::new("c1", "u2", content)
    }

    #[test]
    fn echo_matches_expected_layout() {
        assert_eq!(echo("Hello", "Bonjour", "English"), "Hello\n> 🇺🇸 Bonjour");
    }

    #[test]
    fn multiline_quotes_prefix_every_line() {
        assert_eq!(quote("a\nb\nc", "🇫🇷"), "> 🇫🇷 a\n> b\n> c");
        assert!(is_already_rendered(&incoming("hola", "Spanish", "hello", "English")));
    }

    #[test]
    fn pending_placeholder_shape() {
        assert_eq!(pending("hola amigo"), "> 🌐 hola amigo\n[⏳ Translating...]");
    }

    #[test]
    fn unknown_language_gets_globe() {
        assert_eq!(flag_for_language("Klingon"), UNKNOWN_FLAG);
        assert_eq!(flag_for_language("Czech"), "🇨🇿");
    }

    #[test]
    fn skip_conditions() {
        assert_eq!(skip_reason(&msg("")), Some(SkipReason::Empty));
        assert_eq!(skip_reason(&msg("   ")), Some(SkipReason::Empty));
        assert_eq!(skip_reason(&msg("a")), Some(SkipReason::TooShort));
        assert_eq!(
            skip_reason(&msg("https://x.com/a https://x.com/b")),
            Some(SkipReason::UrlOnly)
        );
        assert_eq!(skip_reason(&msg("123")), Some(SkipReason::NoLetters));
        assert_eq!(skip_reason(&msg("!? 42")), Some(SkipReason::NoLetters));

        let mut sticker = msg("look at this");
        sticker.sticker_items.push(serde_json::json!({ "id": "s1" }));
        assert_eq!(skip_reason(&sticker), Some(SkipReason::Sticker));

        assert_eq!(skip_reason(&msg("bonjour")), None);
        assert_eq!(skip_reason(&msg("see https://x.com/a")), None);
        assert_eq!(skip_reason(&msg("你好")), None);
    }

    #[test]
    fn same_text_ignores_case_and_padding() {
        assert!(same_text(" Hello ", "hello"));
        assert!(!same_text("hello", "hola"));
    }
}
