//! In-crate fakes for the backend, the host, and the settings store.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::{SendError, SettingsError, TranslateError};
use crate::host::{HostEvents, ListenerId, MessageHandler, MessageSender, NoticeLevel, Notifier};
use crate::message::{Message, OutgoingMessage};
use crate::settings::{Settings, SettingsStore};
use crate::translate::openai::{ChatBackend, ChatRequest};

type Reply = Box<dyn Fn(&ChatRequest) -> Result<String, TranslateError> + Send + Sync>;

/// Backend answering from a closure, optionally after a delay, and recording
/// which messages had calls in flight at the same time.
pub struct ScriptedBackend {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
    in_flight: Mutex<Vec<String>>,
    cross_message_overlap: Mutex<bool>,
}

impl ScriptedBackend {
    pub fn replying<F>(reply: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String, TranslateError> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            in_flight: Mutex::new(Vec::new()),
            cross_message_overlap: Mutex::new(false),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    /// True if calls for two different source texts were ever in flight together.
    pub fn saw_cross_message_overlap(&self) -> bool {
        *self.cross_message_overlap.lock()
    }

    fn source_text(request: &ChatRequest) -> String {
        match request.user.split_once(":\n\n") {
            Some((prefix, text)) if prefix.starts_with("Translate to ") => text.to_string(),
            _ => request.user.clone(),
        }
    }
}

impl ChatBackend for ScriptedBackend {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<String, TranslateError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request.clone());
            let source = Self::source_text(request);
            {
                let mut active = self.in_flight.lock();
                if active.iter().any(|other| other != &source) {
                    *self.cross_message_overlap.lock() = true;
                }
                active.push(source.clone());
            }

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            {
                let mut active = self.in_flight.lock();
                if let Some(pos) = active.iter().position(|s| s == &source) {
                    active.remove(pos);
                }
            }
            (self.reply)(request)
        })
    }
}

/// Host that records dispatched updates and notices, and can replay
/// "message created" events to its subscribers.
pub struct RecordingHost {
    user_id: Option<String>,
    selected: Mutex<Option<String>>,
    next_id: AtomicU64,
    handlers: Mutex<Vec<(ListenerId, MessageHandler)>>,
    updates: Mutex<Vec<Message>>,
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingHost {
    pub fn new(user_id: &str) -> Self {
        Self::with_identity(Some(user_id.to_string()))
    }

    /// A host that cannot report the local user.
    pub fn anonymous() -> Self {
        Self::with_identity(None)
    }

    fn with_identity(user_id: Option<String>) -> Self {
        Self {
            user_id,
            selected: Mutex::new(None),
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn select_channel(&self, channel_id: &str) {
        *self.selected.lock() = Some(channel_id.to_string());
    }

    /// Deliver a "message created" event to every subscriber.
    pub fn emit_created(&self, message: Message) {
        let handlers: Vec<MessageHandler> =
            self.handlers.lock().iter().map(|(_, h)| Arc::clone(h)).collect();
        for handler in handlers {
            handler(message.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn updates(&self) -> Vec<Message> {
        self.updates.lock().clone()
    }

    pub fn update_contents(&self) -> Vec<String> {
        self.updates.lock().iter().map(|m| m.content.clone()).collect()
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().clone()
    }
}

impl HostEvents for RecordingHost {
    fn subscribe(&self, handler: MessageHandler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.handlers.lock().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.handlers.lock().retain(|(existing, _)| *existing != id);
    }

    fn dispatch_update(&self, message: Message) {
        self.updates.lock().push(message);
    }

    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn selected_channel_id(&self) -> Option<String> {
        self.selected.lock().clone()
    }
}

impl Notifier for RecordingHost {
    fn notify(&self, level: NoticeLevel, text: &str) {
        self.notices.lock().push((level, text.to_string()));
    }
}

/// Stands in for the host's original send operation.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().clone()
    }
}

impl MessageSender for RecordingSender {
    fn send_message<'a>(
        &'a self,
        channel_id: &'a str,
        payload: OutgoingMessage,
    ) -> BoxFuture<'a, Result<(), SendError>> {
        Box::pin(async move {
            self.sent.lock().push((channel_id.to_string(), payload));
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<Settings>>,
    initial: Mutex<Option<Settings>>,
}

impl MemoryStore {
    pub fn with(settings: Settings) -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            initial: Mutex::new(Some(settings)),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn last_saved(&self) -> Option<Settings> {
        self.saved.lock().last().cloned()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.initial.lock().clone().unwrap_or_default())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.saved.lock().push(settings.clone());
        Ok(())
    }
}
