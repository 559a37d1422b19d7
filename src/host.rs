//! Narrow interfaces to the host messaging client.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::SendError;
use crate::message::{Message, OutgoingMessage};

pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// Opaque handle for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Host event bus plus the identity/selection lookups the pipeline needs.
pub trait HostEvents: Send + Sync {
    /// Register for "message created". Handlers run on the host's event loop
    /// and must not block.
    fn subscribe(&self, handler: MessageHandler) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);

    /// Emit "message update" with a replacement message object.
    fn dispatch_update(&self, message: Message);

    fn current_user_id(&self) -> Option<String>;

    /// Currently selected channel. Only used by toggle glue.
    fn selected_channel_id(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-facing notices (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, text: &str);
}

/// The host's send-message operation.
pub trait MessageSender: Send + Sync {
    fn send_message<'a>(
        &'a self,
        channel_id: &'a str,
        payload: OutgoingMessage,
    ) -> BoxFuture<'a, Result<(), SendError>>;
}

impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    fn send_message<'a>(
        &'a self,
        channel_id: &'a str,
        payload: OutgoingMessage,
    ) -> BoxFuture<'a, Result<(), SendError>> {
        (**self).send_message(channel_id, payload)
    }
}
