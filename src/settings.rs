//! Persisted settings blob, its file-backed store, and the debounced saver.
//! Settings are loaded once at startup and live in memory behind a shared
//! lock; every mutation schedules a debounced write.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SettingsError;
use crate::runtime;

/// Baseline language used whenever nothing better is known.
pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
/// Delay between the last mutation and the write.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(200);

pub type SharedSettings = Arc<RwLock<Settings>>;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub enabled_channels: BTreeSet<String>,
    pub translate_incoming: bool,
    pub translate_outgoing: bool,
    pub incoming_target_lang: String,
    /// Channel → language spoken there. Drives the outgoing target and is
    /// refreshed from detection of incoming messages.
    pub lang_per_channel: HashMap<String, String>,
    /// Channel → language incoming messages are translated into.
    pub incoming_lang_per_channel: HashMap<String, String>,
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            enabled_channels: BTreeSet::new(),
            translate_incoming: true,
            translate_outgoing: true,
            incoming_target_lang: DEFAULT_LANGUAGE.to_string(),
            lang_per_channel: HashMap::new(),
            incoming_lang_per_channel: HashMap::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("enabled_channels", &self.enabled_channels)
            .field("translate_incoming", &self.translate_incoming)
            .field("translate_outgoing", &self.translate_outgoing)
            .field("incoming_target_lang", &self.incoming_target_lang)
            .field("lang_per_channel", &self.lang_per_channel)
            .field("incoming_lang_per_channel", &self.incoming_lang_per_channel)
            .field("model", &self.model)
            .finish()
    }
}

impl Settings {
    /// Fill an empty API key from `OPENAI_API_KEY`.
    pub fn with_env_overrides(mut self) -> Self {
        if self.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.api_key = key.trim().to_string();
            }
        }
        self
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn into_shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }
}

/// Remote endpoint configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// `None` keeps the transport default; a hung call then stalls the
    /// incoming queue until the transport gives up.
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl ApiConfig {
    /// Defaults, with `OPENAI_BASE_URL` overriding the endpoint.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                config.base_url = url.to_string();
            }
        }
        config
    }
}

/// Persistence collaborator: an opaque blob store for [`Settings`].
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, SettingsError>;
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// JSON file on disk. A missing file loads defaults.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no settings file, using defaults");
                Ok(Settings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Load settings, falling back to defaults when the blob is unreadable.
pub fn load_or_default(store: &dyn SettingsStore) -> Settings {
    store.load().unwrap_or_else(|e| {
        warn!(error = %e, "settings load failed, using defaults");
        Settings::default()
    })
}

/// Owns the single pending save timer. A new request cancels and restarts it;
/// the write takes a snapshot of the settings when the timer fires.
pub struct DebouncedSaver {
    settings: SharedSettings,
    store: Arc<dyn SettingsStore>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    runtime: Option<Handle>,
}

impl DebouncedSaver {
    /// Captures the current Tokio runtime, if any, for calls made from
    /// threads outside it.
    pub fn new(settings: SharedSettings, store: Arc<dyn SettingsStore>, delay: Duration) -> Self {
        Self {
            settings,
            store,
            delay,
            pending: Mutex::new(None),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Supersedes any pending write. With no runtime to run the timer on,
    /// writes immediately.
    pub fn schedule(&self) {
        let Some(rt) = runtime::resolve(self.runtime.as_ref()) else {
            if let Err(e) = self.flush() {
                warn!(error = %e, "settings save failed");
            }
            return;
        };
        let settings = Arc::clone(&self.settings);
        let store = Arc::clone(&self.store);
        let delay = self.delay;

        let handle = rt.spawn(async move {
            tokio::time::sleep(delay).await;
            let snapshot = settings.read().clone();
            match store.save(&snapshot) {
                Ok(()) => debug!("settings saved"),
                Err(e) => warn!(error = %e, "settings save failed"),
            }
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Cancel the timer and write now.
    pub fn flush(&self) -> Result<(), SettingsError> {
        if let Some(pending) = self.pending.lock().take() {
            pending.abort();
        }
        let snapshot = self.settings.read().clone();
        self.store.save(&snapshot)
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.abort();
        }
    }
}
