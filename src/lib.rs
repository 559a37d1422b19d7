//! Chat translator: translates outgoing messages before they are sent and
//! rewrites incoming messages in enabled channels with a translated quote.
//! The host client is reached only through the traits in [`host`].

pub mod bridge;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod message;
pub mod metrics;
pub mod outgoing;
pub mod plugin;
pub mod policy;
pub mod queue;
pub mod render;
mod runtime;
pub mod settings;
pub mod translate;

#[cfg(test)]
mod testing;

pub use error::{SendError, SettingsError, TranslateError};
pub use host::{HostEvents, MessageSender, NoticeLevel, Notifier};
pub use message::{Message, OutgoingMessage};
pub use plugin::ChatTranslator;
pub use settings::{ApiConfig, JsonFileStore, Settings, SettingsStore};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. A second call is a no-op.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chat_translator=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
