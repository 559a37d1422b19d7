//! Liveness: CancellationToken + generation guard.
//! Ensures work started before a stop cannot write rewrites after it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Tracks whether the translator is active. Each activation issues a fresh
/// token and advances the generation; deactivation cancels the token.
pub struct Lifecycle {
    current_token: RwLock<CancellationToken>,
    generation: Arc<AtomicU64>,
}

impl Lifecycle {
    /// Starts inactive.
    pub fn new() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self {
            current_token: RwLock::new(token),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cancel the previous generation (if any) and start a new one.
    pub fn activate(&self) -> u64 {
        let mut token_guard = self.current_token.write();
        token_guard.cancel();
        *token_guard = CancellationToken::new();
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn deactivate(&self) {
        self.current_token.read().cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.current_token.read().is_cancelled()
    }

    /// Guard bound to the current generation.
    pub fn guard(&self) -> LivenessGuard {
        let token_guard = self.current_token.read();
        LivenessGuard {
            generation: Arc::clone(&self.generation),
            my_generation: self.generation.load(Ordering::SeqCst),
            token: token_guard.child_token(),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Checked at job boundaries. Stale once its generation is cancelled or
/// superseded.
#[derive(Clone)]
pub struct LivenessGuard {
    generation: Arc<AtomicU64>,
    my_generation: u64,
    token: CancellationToken,
}

impl LivenessGuard {
    #[inline]
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.my_generation
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[inline]
    pub fn should_continue(&self) -> bool {
        !self.is_cancelled() && self.is_current()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn my_generation(&self) -> u64 {
        self.my_generation
    }
}
