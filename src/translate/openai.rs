//! OpenAI-compatible chat/completions client.
//! Connection pooling via reqwest; one request per call, no retry.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TranslateError;
use crate::settings::ApiConfig;

/// One chat-completion exchange: a system instruction and a user message.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub system: String,
    pub user: String,
}

/// Remote stage shared by translation and detection. Returns the trimmed
/// content of the first choice (possibly empty).
pub trait ChatBackend: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<String, TranslateError>>;
}

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, TranslateError> {
        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(4);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, TranslateError> {
        let api_key = request.api_key.trim();
        if api_key.is_empty() {
            return Err(TranslateError::MissingCredential);
        }

        let body = CompletionBody {
            model: &request.model,
            temperature: request.temperature,
            messages: [
                WireMessage { role: "system", content: &request.system },
                WireMessage { role: "user", content: &request.user },
            ],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("chat completion rejected: invalid credential");
            return Err(TranslateError::CredentialRejected);
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                status: status.as_u16(),
                body: body_text.chars().take(200).collect(),
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(model = %request.model, chars = content.chars().count(), "chat completion received");
        Ok(content.trim().to_string())
    }
}

impl ChatBackend for OpenAiClient {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<String, TranslateError>> {
        Box::pin(self.send(request))
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    temperature: f32,
    messages: [WireMessage<'a>; 2],
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}
