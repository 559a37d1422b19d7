//! Channel policy: which channels are enabled and which language each one
//! uses. Read by every classification decision; mutated only by explicit
//! toggles and by the remembered-language update after a translation.

use std::sync::Arc;

use tracing::info;

use crate::settings::{DebouncedSaver, SharedSettings, DEFAULT_LANGUAGE};

pub struct ChannelPolicy {
    settings: SharedSettings,
    saver: Arc<DebouncedSaver>,
}

impl ChannelPolicy {
    pub fn new(settings: SharedSettings, saver: Arc<DebouncedSaver>) -> Self {
        Self { settings, saver }
    }

    pub fn is_enabled(&self, channel_id: &str) -> bool {
        self.settings.read().enabled_channels.contains(channel_id)
    }

    pub fn translate_incoming(&self) -> bool {
        self.settings.read().translate_incoming
    }

    pub fn translate_outgoing(&self) -> bool {
        self.settings.read().translate_outgoing
    }

    /// Global target for incoming messages.
    pub fn default_language(&self) -> String {
        let settings = self.settings.read();
        non_empty_or_default(&settings.incoming_target_lang)
    }

    /// Language incoming messages in `channel_id` are translated into.
    pub fn incoming_target(&self, channel_id: &str) -> String {
        let settings = self.settings.read();
        match settings.incoming_lang_per_channel.get(channel_id) {
            Some(lang) if !lang.trim().is_empty() => lang.clone(),
            _ => non_empty_or_default(&settings.incoming_target_lang),
        }
    }

    /// Language outgoing messages in `channel_id` are translated into:
    /// the channel's remembered language, else the global default.
    pub fn outgoing_target(&self, channel_id: &str) -> String {
        let settings = self.settings.read();
        match settings.lang_per_channel.get(channel_id) {
            Some(lang) if !lang.trim().is_empty() => lang.clone(),
            _ => non_empty_or_default(&settings.incoming_target_lang),
        }
    }

    /// Flip the channel's enabled state. Returns the new state.
    pub fn toggle(&self, channel_id: &str) -> bool {
        let enabled = {
            let mut settings = self.settings.write();
            if settings.enabled_channels.remove(channel_id) {
                false
            } else {
                settings.enabled_channels.insert(channel_id.to_string());
                if !settings.lang_per_channel.contains_key(channel_id) {
                    let seed = non_empty_or_default(&settings.incoming_target_lang);
                    settings.lang_per_channel.insert(channel_id.to_string(), seed);
                }
                true
            }
        };
        info!(channel_id, enabled, "channel_toggled");
        self.saver.schedule();
        enabled
    }

    pub fn remember_language(&self, channel_id: &str, language: &str) {
        let changed = {
            let mut settings = self.settings.write();
            let previous = settings
                .lang_per_channel
                .insert(channel_id.to_string(), language.to_string());
            previous.as_deref() != Some(language)
        };
        if changed {
            info!(channel_id, language, "channel_language_remembered");
        }
        self.saver.schedule();
    }

    pub fn set_incoming_target(&self, channel_id: &str, language: Option<&str>) {
        {
            let mut settings = self.settings.write();
            match language {
                Some(lang) => {
                    settings
                        .incoming_lang_per_channel
                        .insert(channel_id.to_string(), lang.to_string());
                }
                None => {
                    settings.incoming_lang_per_channel.remove(channel_id);
                }
            }
        }
        self.saver.schedule();
    }

    pub fn set_default_language(&self, language: &str) {
        self.settings.write().incoming_target_lang = language.to_string();
        self.saver.schedule();
    }

    pub fn set_translate_incoming(&self, on: bool) {
        self.settings.write().translate_incoming = on;
        self.saver.schedule();
    }

    pub fn set_translate_outgoing(&self, on: bool) {
        self.settings.write().translate_outgoing = on;
        self.saver.schedule();
    }

    pub fn set_api_key(&self, key: &str) {
        self.settings.write().api_key = key.trim().to_string();
        self.saver.schedule();
    }

    pub fn set_model(&self, model: &str) {
        self.settings.write().model = model.to_string();
        self.saver.schedule();
    }
}

fn non_empty_or_default(lang: &str) -> String {
    if lang.trim().is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        lang.to_string()
    }
}
