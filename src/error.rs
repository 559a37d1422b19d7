//! Error types for the translation path, settings persistence and the host
//! send operation. None of these are fatal: the public pipeline entry points
//! degrade to the original text on every error.

use thiserror::Error;

/// Failure of a single remote chat-completion call.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("API credential rejected (401 Unauthorized)")]
    CredentialRejected,

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Parse(String),
}

impl TranslateError {
    /// Missing or invalid credential. Surfaced to the user, never fatal.
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            TranslateError::MissingCredential | TranslateError::CredentialRejected
        )
    }
}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TranslateError::Parse(e.to_string())
        } else {
            TranslateError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Raised by the host's send operation; passed through the interceptor untouched.
#[derive(Debug, Error)]
#[error("send failed: {0}")]
pub struct SendError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_class_covers_missing_and_rejected() {
        assert!(TranslateError::MissingCredential.is_credential());
        assert!(TranslateError::CredentialRejected.is_credential());
        assert!(!TranslateError::Transport("reset".into()).is_credential());
        assert!(!TranslateError::Status { status: 500, body: String::new() }.is_credential());
    }

    #[test]
    fn status_error_displays_code_and_body() {
        let e = TranslateError::Status { status: 503, body: "overloaded".into() };
        assert_eq!(e.to_string(), "unexpected status 503: overloaded");
    }
}
