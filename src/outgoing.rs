//! Outgoing interception: translate the composed text before it leaves the
//! client, and remember the original for echo reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::SendError;
use crate::host::MessageSender;
use crate::lifecycle::Lifecycle;
use crate::message::OutgoingMessage;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::policy::ChannelPolicy;
use crate::translate::TranslationClient;

/// A sent translation awaiting its echo in the incoming stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEcho {
    pub translated: String,
    pub original: String,
}

/// One pending echo per channel. A newer send in the same channel replaces
/// an unreconciled one, whose echo then renders untranslated.
#[derive(Default)]
pub struct PendingEchoes {
    inner: Mutex<HashMap<String, PendingEcho>>,
}

impl PendingEchoes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, channel_id: &str, echo: PendingEcho) {
        if let Some(dropped) = self.inner.lock().insert(channel_id.to_string(), echo) {
            debug!(channel_id, dropped = %dropped.translated, "unreconciled echo replaced");
        }
    }

    /// Does `content` match the channel's pending translated text?
    pub fn matches(&self, channel_id: &str, content: &str) -> bool {
        self.inner
            .lock()
            .get(channel_id)
            .is_some_and(|echo| echo.translated == content)
    }

    /// Remove and return the channel's echo if `content` matches it.
    pub fn take_matching(&self, channel_id: &str, content: &str) -> Option<PendingEcho> {
        let mut inner = self.inner.lock();
        match inner.get(channel_id) {
            Some(echo) if echo.translated == content => inner.remove(channel_id),
            _ => None,
        }
    }

    pub fn get(&self, channel_id: &str) -> Option<PendingEcho> {
        self.inner.lock().get(channel_id).cloned()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

/// Wraps the host send operation. Always calls through to `inner`.
pub struct OutgoingInterceptor<S> {
    inner: S,
    policy: Arc<ChannelPolicy>,
    translator: Arc<TranslationClient>,
    echoes: Arc<PendingEchoes>,
    lifecycle: Arc<Lifecycle>,
    metrics: Arc<MetricsRegistry>,
}

impl<S: MessageSender> OutgoingInterceptor<S> {
    pub fn new(
        inner: S,
        policy: Arc<ChannelPolicy>,
        translator: Arc<TranslationClient>,
        echoes: Arc<PendingEchoes>,
        lifecycle: Arc<Lifecycle>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            inner,
            policy,
            translator,
            echoes,
            lifecycle,
            metrics,
        }
    }

    fn should_intervene(&self, channel_id: &str, payload: &OutgoingMessage) -> bool {
        self.lifecycle.is_active()
            && self.policy.is_enabled(channel_id)
            && self.policy.translate_outgoing()
            && !payload.content.is_empty()
    }

    async fn intercept(
        &self,
        channel_id: &str,
        mut payload: OutgoingMessage,
    ) -> Result<(), SendError> {
        if self.should_intervene(channel_id, &payload) {
            let target = self.policy.outgoing_target(channel_id);
            let original = payload.content.clone();

            let span = self.metrics.span(metric_names::OUTGOING_TRANSLATE);
            let translated = self.translator.translate(&original, &target).await;
            span.finish();

            if !translated.is_empty() && translated != original {
                info!(channel_id, target = %target, "outgoing message translated");
                payload.content = translated.clone();
                self.echoes.record(channel_id, PendingEcho { translated, original });
            }
        }
        self.inner.send_message(channel_id, payload).await
    }
}

impl<S: MessageSender> MessageSender for OutgoingInterceptor<S> {
    fn send_message<'a>(
        &'a self,
        channel_id: &'a str,
        payload: OutgoingMessage,
    ) -> BoxFuture<'a, Result<(), SendError>> {
        Box::pin(self.intercept(channel_id, payload))
    }
}
