//! Translation client: cache-first, one remote call on miss, fail-open.

pub mod cache;
pub mod cleanup;
pub mod detect;
pub mod openai;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::TranslateError;
use crate::host::{NoticeLevel, Notifier};
use crate::lifecycle::Lifecycle;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::settings::SharedSettings;

use cache::{CacheKey, CacheKind, LanguageCache};
use openai::{ChatBackend, ChatRequest};

const SYSTEM_PROMPT: &str = "You are a translation machine. Only output the translation, nothing else. \
No explanations, no quotes, no context, just the translated text.";

const TRANSLATE_TEMPERATURE: f32 = 0.2;

pub struct TranslationClient {
    backend: Arc<dyn ChatBackend>,
    cache: Arc<LanguageCache>,
    settings: SharedSettings,
    lifecycle: Arc<Lifecycle>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<MetricsRegistry>,
}

impl TranslationClient {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        cache: Arc<LanguageCache>,
        settings: SharedSettings,
        lifecycle: Arc<Lifecycle>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            backend,
            cache,
            settings,
            lifecycle,
            notifier,
            metrics,
        }
    }

    /// Translate `text` into `target_lang`. Returns `text` unchanged when
    /// inactive or on any failure; an invalid credential is also surfaced to
    /// the user.
    pub async fn translate(&self, text: &str, target_lang: &str) -> String {
        if !self.lifecycle.is_active() {
            return text.to_string();
        }
        match self.try_translate(text, target_lang).await {
            Ok(translated) => translated,
            Err(TranslateError::CredentialRejected) => {
                self.notifier
                    .notify(NoticeLevel::Error, "Invalid OpenAI API key (401 Unauthorized)");
                text.to_string()
            }
            Err(e) => {
                warn!(error = %e, target = target_lang, "translation failed, keeping original");
                text.to_string()
            }
        }
    }

    async fn try_translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError> {
        let key = CacheKey::translation(text, target_lang);
        if let Some(hit) = self.cache.get(CacheKind::Translation, &key) {
            debug!(target = target_lang, "translation cache hit");
            return Ok(hit);
        }

        let request = {
            let settings = self.settings.read();
            ChatRequest {
                api_key: settings.api_key.trim().to_string(),
                model: settings.model.clone(),
                temperature: TRANSLATE_TEMPERATURE,
                system: SYSTEM_PROMPT.to_string(),
                user: format!("Translate to {target_lang}:\n\n{text}"),
            }
        };
        if request.api_key.is_empty() {
            return Err(TranslateError::MissingCredential);
        }

        let span = self.metrics.span(metric_names::TRANSLATE_REMOTE);
        let raw = self.backend.complete(&request).await;
        span.finish();

        let cleaned = cleanup::clean_response(&raw?);
        let result = if cleaned.is_empty() { text.to_string() } else { cleaned };

        self.cache.put(CacheKind::Translation, key, result.clone());
        Ok(result)
    }
}
