//! `ChatTranslator`: owns the shared state and wires the pipeline to a host.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::bridge::{DispatchBridge, Subscription};
use crate::error::TranslateError;
use crate::host::{HostEvents, MessageSender, NoticeLevel, Notifier};
use crate::lifecycle::Lifecycle;
use crate::metrics::{MetricSummary, MetricsRegistry};
use crate::outgoing::{OutgoingInterceptor, PendingEchoes};
use crate::policy::ChannelPolicy;
use crate::queue::{IncomingQueue, JobProcessor};
use crate::settings::{
    self, ApiConfig, DebouncedSaver, SettingsStore, SharedSettings, SAVE_DEBOUNCE,
};
use crate::translate::cache::LanguageCache;
use crate::translate::detect::LanguageDetector;
use crate::translate::openai::{ChatBackend, OpenAiClient};
use crate::translate::TranslationClient;

const PLUGIN_NAME: &str = "ChatTranslator";

pub struct ChatTranslator {
    settings: SharedSettings,
    saver: Arc<DebouncedSaver>,
    policy: Arc<ChannelPolicy>,
    lifecycle: Arc<Lifecycle>,
    cache: Arc<LanguageCache>,
    translator: Arc<TranslationClient>,
    detector: Arc<LanguageDetector>,
    echoes: Arc<PendingEchoes>,
    queue: Arc<IncomingQueue>,
    bridge: Arc<DispatchBridge>,
    host: Arc<dyn HostEvents>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<MetricsRegistry>,
    subscription: Mutex<Option<Subscription>>,
}

impl ChatTranslator {
    /// Build against the OpenAI-compatible endpoint in `api`.
    pub fn new<H>(
        api: &ApiConfig,
        store: Arc<dyn SettingsStore>,
        host: Arc<H>,
    ) -> Result<Self, TranslateError>
    where
        H: HostEvents + Notifier + 'static,
    {
        let backend = Arc::new(OpenAiClient::new(api)?);
        Ok(Self::with_backend(backend, store, host))
    }

    /// Build with any chat backend. Settings are loaded once here. Building
    /// inside a Tokio runtime lets host callbacks from other threads use it.
    pub fn with_backend<H>(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn SettingsStore>,
        host: Arc<H>,
    ) -> Self
    where
        H: HostEvents + Notifier + 'static,
    {
        let settings = settings::load_or_default(store.as_ref())
            .with_env_overrides()
            .into_shared();
        let events: Arc<dyn HostEvents> = host.clone();
        let notifier: Arc<dyn Notifier> = host;

        let saver = Arc::new(DebouncedSaver::new(Arc::clone(&settings), store, SAVE_DEBOUNCE));
        let policy = Arc::new(ChannelPolicy::new(Arc::clone(&settings), Arc::clone(&saver)));
        let lifecycle = Arc::new(Lifecycle::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let cache = Arc::new(LanguageCache::new());

        let translator = Arc::new(TranslationClient::new(
            Arc::clone(&backend),
            Arc::clone(&cache),
            Arc::clone(&settings),
            Arc::clone(&lifecycle),
            Arc::clone(&notifier),
            Arc::clone(&metrics),
        ));
        let detector = Arc::new(LanguageDetector::new(
            backend,
            Arc::clone(&cache),
            Arc::clone(&settings),
            Arc::clone(&lifecycle),
            Arc::clone(&metrics),
        ));
        let processor = JobProcessor::new(
            Arc::clone(&translator),
            Arc::clone(&detector),
            Arc::clone(&policy),
            Arc::clone(&events),
            Arc::clone(&metrics),
        );
        let queue = Arc::new(IncomingQueue::new(
            processor,
            Arc::clone(&lifecycle),
            Arc::clone(&metrics),
        ));
        let echoes = Arc::new(PendingEchoes::new());
        let bridge = Arc::new(DispatchBridge::new(
            Arc::clone(&policy),
            Arc::clone(&echoes),
            Arc::clone(&queue),
            Arc::clone(&events),
            Arc::clone(&lifecycle),
        ));

        Self {
            settings,
            saver,
            policy,
            lifecycle,
            cache,
            translator,
            detector,
            echoes,
            queue,
            bridge,
            host: events,
            notifier,
            metrics,
            subscription: Mutex::new(None),
        }
    }

    /// Activate and subscribe to the host event bus. Idempotent.
    pub fn start(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }
        let generation = self.lifecycle.activate();
        *subscription = Some(self.bridge.start());

        let has_key = self.settings.read().has_credential();
        info!(generation, has_key, "translator started");
        let level = if has_key { NoticeLevel::Success } else { NoticeLevel::Warning };
        self.notifier.notify(level, &format!("{PLUGIN_NAME} OK"));
    }

    /// Deactivate, unsubscribe, drop queued jobs and flush settings.
    pub fn stop(&self) {
        self.lifecycle.deactivate();
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.stop();
        }
        self.queue.clear();
        self.echoes.clear();
        if let Err(e) = self.saver.flush() {
            warn!(error = %e, "settings flush on stop failed");
        }
        info!("translator stopped");
        self.notifier.notify(NoticeLevel::Warning, &format!("{PLUGIN_NAME} stopped"));
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Wrap the host's original send operation.
    pub fn intercept<S: MessageSender>(&self, original: S) -> OutgoingInterceptor<S> {
        OutgoingInterceptor::new(
            original,
            Arc::clone(&self.policy),
            Arc::clone(&self.translator),
            Arc::clone(&self.echoes),
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.metrics),
        )
    }

    /// Flip translation for `channel_id` and tell the user.
    pub fn toggle_channel(&self, channel_id: &str) -> bool {
        let enabled = self.policy.toggle(channel_id);
        let (level, text) = if enabled {
            (NoticeLevel::Success, "Translation enabled for this channel")
        } else {
            (NoticeLevel::Warning, "Translation disabled for this channel")
        };
        self.notifier.notify(level, text);
        enabled
    }

    /// Toggle the host's currently selected channel, if any.
    pub fn toggle_current_channel(&self) -> Option<bool> {
        let channel_id = self.host.selected_channel_id()?;
        Some(self.toggle_channel(&channel_id))
    }

    pub fn policy(&self) -> &Arc<ChannelPolicy> {
        &self.policy
    }

    pub fn translator(&self) -> &Arc<TranslationClient> {
        &self.translator
    }

    pub fn detector(&self) -> &Arc<LanguageDetector> {
        &self.detector
    }

    pub fn queue(&self) -> &Arc<IncomingQueue> {
        &self.queue
    }

    pub fn cache(&self) -> &Arc<LanguageCache> {
        &self.cache
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn metrics_summary(&self) -> std::collections::HashMap<String, MetricSummary> {
        self.metrics.summary()
    }
}

impl Drop for ChatTranslator {
    fn drop(&mut self) {
        self.lifecycle.deactivate();
    }
}
