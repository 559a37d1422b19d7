//! Two-stage language detection: a pure word-list classifier first, the
//! remote model only when the classifier is ambiguous.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, warn};

use super::cache::{CacheKey, CacheKind, LanguageCache};
use super::openai::{ChatBackend, ChatRequest};
use crate::lifecycle::Lifecycle;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::settings::{SharedSettings, DEFAULT_LANGUAGE};

const DETECT_PROMPT: &str = "Detect the language name only (e.g. English, French)";

fn french_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(le|la|les|un|une|des|est|et|à|de|pour|avec)\b")
            .expect("valid french list")
    })
}

fn english_words() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(the|and|is|to|for|with|of|in|on|at)\b").expect("valid english list")
    })
}

/// Exactly one word list matching decides; both or neither is ambiguous.
pub fn classify_locally(text: &str) -> Option<&'static str> {
    match (french_words().is_match(text), english_words().is_match(text)) {
        (true, false) => Some("French"),
        (false, true) => Some("English"),
        _ => None,
    }
}

pub struct LanguageDetector {
    backend: Arc<dyn ChatBackend>,
    cache: Arc<LanguageCache>,
    settings: SharedSettings,
    lifecycle: Arc<Lifecycle>,
    metrics: Arc<MetricsRegistry>,
}

impl LanguageDetector {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        cache: Arc<LanguageCache>,
        settings: SharedSettings,
        lifecycle: Arc<Lifecycle>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self { backend, cache, settings, lifecycle, metrics }
    }

    /// Never fails: any problem resolves to the baseline language.
    pub async fn detect_language(&self, text: &str) -> String {
        if !self.lifecycle.is_active() {
            return DEFAULT_LANGUAGE.to_string();
        }
        let (api_key, model) = {
            let settings = self.settings.read();
            (settings.api_key.trim().to_string(), settings.model.clone())
        };
        if api_key.is_empty() {
            return DEFAULT_LANGUAGE.to_string();
        }

        let key = CacheKey::detection(text);
        if let Some(hit) = self.cache.get(CacheKind::Detection, &key) {
            debug!(language = %hit, "detection cache hit");
            return hit;
        }

        if let Some(language) = classify_locally(text) {
            self.cache.put(CacheKind::Detection, key, language.to_string());
            return language.to_string();
        }

        let request = ChatRequest {
            api_key,
            model,
            temperature: 0.0,
            system: DETECT_PROMPT.to_string(),
            user: text.to_string(),
        };

        let span = self.metrics.span(metric_names::DETECT_REMOTE);
        let result = self.backend.complete(&request).await;
        span.finish();

        match result {
            Ok(raw) => {
                let language = normalize_language_name(&raw);
                self.cache.put(CacheKind::Detection, key, language.clone());
                language
            }
            Err(e) => {
                warn!(error = %e, "language detection failed, using default");
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }
}

/// "french." / "\"Spanish\"" → "French" / "Spanish"; empty → default.
fn normalize_language_name(raw: &str) -> String {
    let name = raw
        .trim()
        .trim_matches(|c: char| c == '.' || c == '"' || c == '\'' || c.is_whitespace());
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => DEFAULT_LANGUAGE.to_string(),
    }
}
