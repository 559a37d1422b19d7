//! Process-lifetime language cache: translations and detections.
//! Key: blake3 hash of (text | target) for translations, of text for detections.
//!
//! Known limitation: no eviction, no TTL, no size bound. An entry once written
//! is never replaced, so a repeated message always renders identically.

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Translation,
    Detection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn translation(text: &str, target_lang: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(text.as_bytes());
        hasher.update(b"::");
        hasher.update(target_lang.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn detection(text: &str) -> Self {
        Self(*blake3::hash(text.as_bytes()).as_bytes())
    }
}

#[derive(Default)]
pub struct LanguageCache {
    translations: Mutex<HashMap<CacheKey, String>>,
    detections: Mutex<HashMap<CacheKey, String>>,
}

impl LanguageCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, kind: CacheKind) -> &Mutex<HashMap<CacheKey, String>> {
        match kind {
            CacheKind::Translation => &self.translations,
            CacheKind::Detection => &self.detections,
        }
    }

    pub fn get(&self, kind: CacheKind, key: &CacheKey) -> Option<String> {
        self.store(kind).lock().get(key).cloned()
    }

    /// First write wins.
    pub fn put(&self, kind: CacheKind, key: CacheKey, value: String) {
        self.store(kind).lock().entry(key).or_insert(value);
    }

    pub fn len(&self, kind: CacheKind) -> usize {
        self.store(kind).lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.lock().is_empty() && self.detections.lock().is_empty()
    }
}
