//! Dispatch bridge: classifies each "message created" event as a self-echo,
//! a foreign-incoming message, or something to leave alone.

use std::sync::Arc;

use tracing::{debug, info};

use crate::host::{HostEvents, ListenerId, MessageHandler};
use crate::lifecycle::Lifecycle;
use crate::message::Message;
use crate::outgoing::PendingEchoes;
use crate::policy::ChannelPolicy;
use crate::queue::{IncomingQueue, TranslationJob};
use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Inactive,
    ChannelDisabled,
    OwnMessage,
    /// The host could not say who the local user is.
    UnknownIdentity,
    IncomingDisabled,
    AlreadyRendered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ignore(IgnoreReason),
    /// Our own translated send coming back from the host.
    SelfEcho,
    ForeignIncoming { target_language: String },
}

pub struct DispatchBridge {
    policy: Arc<ChannelPolicy>,
    echoes: Arc<PendingEchoes>,
    queue: Arc<IncomingQueue>,
    host: Arc<dyn HostEvents>,
    lifecycle: Arc<Lifecycle>,
}

impl DispatchBridge {
    pub fn new(
        policy: Arc<ChannelPolicy>,
        echoes: Arc<PendingEchoes>,
        queue: Arc<IncomingQueue>,
        host: Arc<dyn HostEvents>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            policy,
            echoes,
            queue,
            host,
            lifecycle,
        }
    }

    /// Pure decision; does not consume the pending echo.
    pub fn classify(&self, message: &Message, local_user_id: Option<&str>) -> Classification {
        if !self.lifecycle.is_active() {
            return Classification::Ignore(IgnoreReason::Inactive);
        }
        let channel_id = message.channel_id.as_str();
        if !self.policy.is_enabled(channel_id) {
            return Classification::Ignore(IgnoreReason::ChannelDisabled);
        }

        let Some(local_user_id) = local_user_id else {
            return Classification::Ignore(IgnoreReason::UnknownIdentity);
        };
        if message.author_id() == Some(local_user_id) {
            if self.echoes.matches(channel_id, &message.content) {
                return Classification::SelfEcho;
            }
            return Classification::Ignore(IgnoreReason::OwnMessage);
        }

        if !self.policy.translate_incoming() {
            return Classification::Ignore(IgnoreReason::IncomingDisabled);
        }
        if render::is_already_rendered(&message.content) {
            return Classification::Ignore(IgnoreReason::AlreadyRendered);
        }
        Classification::ForeignIncoming {
            target_language: self.policy.incoming_target(channel_id),
        }
    }

    /// Handler for the host's "message created" event. Never blocks; safe to
    /// call from host threads outside the Tokio runtime.
    pub fn on_message_created(&self, message: Message) {
        let local_user_id = self.host.current_user_id();
        let classification = self.classify(&message, local_user_id.as_deref());
        debug!(channel_id = %message.channel_id, ?classification, "message classified");

        match classification {
            Classification::Ignore(_) => {}
            Classification::SelfEcho => {
                let Some(echo) = self
                    .echoes
                    .take_matching(&message.channel_id, &message.content)
                else {
                    return;
                };
                let language = self.policy.incoming_target(&message.channel_id);
                let content = render::echo(&echo.translated, &echo.original, &language);
                self.host.dispatch_update(message.with_content(content));
            }
            Classification::ForeignIncoming { target_language } => {
                self.queue.enqueue(TranslationJob::new(message, target_language));
            }
        }
    }

    /// Register with the host event bus.
    pub fn start(self: &Arc<Self>) -> Subscription {
        let bridge = Arc::clone(self);
        let handler: MessageHandler = Arc::new(move |message| bridge.on_message_created(message));
        let id = self.host.subscribe(handler);
        info!(listener = id.0, "dispatch bridge subscribed");
        Subscription {
            host: Arc::clone(&self.host),
            id: Some(id),
        }
    }
}

/// The only handle needed to stop receiving events. Unsubscribes on drop.
pub struct Subscription {
    host: Arc<dyn HostEvents>,
    id: Option<ListenerId>,
}

impl Subscription {
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.host.unsubscribe(id);
            info!(listener = id.0, "dispatch bridge unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use crate::outgoing::PendingEcho;
    use crate::queue::JobProcessor;
    use crate::settings::{DebouncedSaver, Settings, SAVE_DEBOUNCE};
    use crate::testing::{MemoryStore, RecordingHost, ScriptedBackend};
    use crate::translate::cache::LanguageCache;
    use crate::translate::detect::LanguageDetector;
    use crate::translate::TranslationClient;

    struct Fixture {
        bridge: Arc<DispatchBridge>,
        host: Arc<RecordingHost>,
        echoes: Arc<PendingEchoes>,
        queue: Arc<IncomingQueue>,
        backend: Arc<ScriptedBackend>,
        policy: Arc<ChannelPolicy>,
    }

    fn fixture() -> Fixture {
        fixture_with_host(RecordingHost::new("me"))
    }

    fn fixture_with_host(host: RecordingHost) -> Fixture {
        let mut settings = Settings { api_key: "sk-test".into(), ..Default::default() };
        settings.enabled_channels.insert("c1".into());
        let settings = settings.into_shared();
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.activate();
        let host = Arc::new(host);
        let backend = Arc::new(ScriptedBackend::replying(|req| {
            Ok(if req.user.starts_with("Translate to") {
                "translated".into()
            } else {
                "Spanish".into()
            })
        }));
        let metrics = Arc::new(MetricsRegistry::new());
        let cache = Arc::new(LanguageCache::new());
        let saver = Arc::new(DebouncedSaver::new(
            Arc::clone(&settings),
            Arc::new(MemoryStore::default()),
            SAVE_DEBOUNCE,
        ));
        let policy = Arc::new(ChannelPolicy::new(Arc::clone(&settings), saver));
        let translator = Arc::new(TranslationClient::new(
            backend.clone(),
            Arc::clone(&cache),
            Arc::clone(&settings),
            Arc::clone(&lifecycle),
            host.clone(),
            Arc::clone(&metrics),
        ));
        let detector = Arc::new(LanguageDetector::new(
            backend.clone(),
            cache,
            settings,
            Arc::clone(&lifecycle),
            Arc::clone(&metrics),
        ));
        let processor = JobProcessor::new(
            translator,
            detector,
            Arc::clone(&policy),
            host.clone(),
            Arc::clone(&metrics),
        );
        let queue = Arc::new(IncomingQueue::new(processor, Arc::clone(&lifecycle), metrics));
        let echoes = Arc::new(PendingEchoes::new());
        let bridge = Arc::new(DispatchBridge::new(
            Arc::clone(&policy),
            Arc::clone(&echoes),
            Arc::clone(&queue),
            host.clone(),
            lifecycle,
        ));
        Fixture { bridge, host, echoes, queue, backend, policy }
    }

    #[tokio::test(start_paused = true)]
    async fn self_echo_is_reconciled_once() {
        let f = fixture();
        f.echoes.record(
            "c1",
            PendingEcho { translated: "Hello".into(), original: "Bonjour".into() },
        );

        f.bridge.on_message_created(Message::new("c1", "me", "Hello"));
        assert_eq!(f.host.update_contents(), vec!["Hello\n> 🇺🇸 Bonjour"]);
        assert_eq!(f.echoes.get("c1"), None);

        f.bridge.on_message_created(Message::new("c1", "me", "Hello"));
        f.queue.wait_idle().await;
        assert_eq!(f.host.updates().len(), 1);
        assert_eq!(f.backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn classification_rules() {
        let f = fixture();
        let me = Some("me");

        assert_eq!(
            f.bridge.classify(&Message::new("c2", "u2", "hola"), me),
            Classification::Ignore(IgnoreReason::ChannelDisabled)
        );
        assert_eq!(
            f.bridge.classify(&Message::new("c1", "me", "hola"), me),
            Classification::Ignore(IgnoreReason::OwnMessage)
        );
        assert_eq!(
            f.bridge.classify(&Message::new("c1", "u2", "> 🌐 hola\n> 🇺🇸 hello"), me),
            Classification::Ignore(IgnoreReason::AlreadyRendered)
        );
        assert_eq!(
            f.bridge.classify(&Message::new("c1", "u2", "hola"), me),
            Classification::ForeignIncoming { target_language: "English".into() }
        );

        assert_eq!(
            f.bridge.classify(&Message::new("c1", "u2", "hola"), None),
            Classification::Ignore(IgnoreReason::UnknownIdentity)
        );

        f.policy.set_incoming_target("c1", Some("German"));
        assert_eq!(
            f.bridge.classify(&Message::new("c1", "u2", "hola"), me),
            Classification::ForeignIncoming { target_language: "German".into() }
        );

        f.policy.set_translate_incoming(false);
        assert_eq!(
            f.bridge.classify(&Message::new("c1", "u2", "hola"), me),
            Classification::Ignore(IgnoreReason::IncomingDisabled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_local_identity_translates_nothing() {
        let f = fixture_with_host(RecordingHost::anonymous());
        f.echoes.record(
            "c1",
            PendingEcho { translated: "Hello".into(), original: "Bonjour".into() },
        );

        f.bridge.on_message_created(Message::new("c1", "me", "Hello"));
        f.bridge.on_message_created(Message::new("c1", "u2", "hola amigo"));
        f.queue.wait_idle().await;

        assert!(f.host.updates().is_empty());
        assert_eq!(f.backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn already_rendered_content_is_never_enqueued() {
        let f = fixture();
        let rendered = render::incoming("hola amigo", "Spanish", "hello friend", "English");
        f.bridge.on_message_created(Message::new("c1", "u2", rendered));
        f.queue.wait_idle().await;

        assert!(f.host.updates().is_empty());
        assert_eq!(f.backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_message_is_translated_through_the_queue() {
        let f = fixture();
        f.bridge.on_message_created(Message::new("c1", "u2", "hola amigo"));
        f.queue.wait_idle().await;

        let contents = f.host.update_contents();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1], "> 🇪🇸 hola amigo\n> 🇺🇸 translated");
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_routes_events_until_stopped() {
        let f = fixture();
        let subscription = f.bridge.start();
        assert_eq!(f.host.subscriber_count(), 1);

        f.echoes.record(
            "c1",
            PendingEcho { translated: "Hello".into(), original: "Bonjour".into() },
        );
        f.host.emit_created(Message::new("c1", "me", "Hello"));
        assert_eq!(f.host.updates().len(), 1);

        subscription.stop();
        assert_eq!(f.host.subscriber_count(), 0);

        f.echoes.record("c1", PendingEcho { translated: "Hi".into(), original: "Salut".into() });
        f.host.emit_created(Message::new("c1", "me", "Hi"));
        assert_eq!(f.host.updates().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_subscription_unsubscribes() {
        let f = fixture();
        {
            let _subscription = f.bridge.start();
            assert_eq!(f.host.subscriber_count(), 1);
        }
        assert_eq!(f.host.subscriber_count(), 0);
    }
}
