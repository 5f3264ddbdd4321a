//! Completion client.
//!
//! One blocking round against the selected provider's chat-completions
//! endpoint, with the degrade-and-stay fallback policy: when the designated
//! primary provider fails and the secondary has a credential, the session's
//! selection is permanently reassigned to the secondary and the call is
//! retried exactly once. The reassignment is not reverted afterwards, even
//! when the retry also fails.

use crate::provider::{PRIMARY_PROVIDER, ProviderRegistry, SECONDARY_PROVIDER};
use async_trait::async_trait;
use quill_core::agent::ConversationMessage;
use quill_core::session::SessionState;
use quill_core::{QuillError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Fixed sampling temperature used when config.toml does not override it.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A fully resolved call target handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionTarget {
    pub provider: String,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// The raw transport boundary: one request, one response, no policy.
///
/// The HTTP implementation lives in [`HttpCompletionBackend`]; tests script
/// this trait to exercise the fallback policy without a network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        target: &CompletionTarget,
        turns: &[ConversationMessage],
        temperature: f32,
    ) -> Result<String>;
}

/// reqwest-based transport speaking the OpenAI-compatible wire format.
pub struct HttpCompletionBackend {
    client: Client,
}

impl HttpCompletionBackend {
    /// No request timeout beyond the transport defaults; a chat round blocks
    /// the dispatch loop until it returns or fails.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpCompletionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(
        &self,
        target: &CompletionTarget,
        turns: &[ConversationMessage],
        temperature: f32,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: target.model.clone(),
            messages: turns
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_wire_str().to_string(),
                    content: turn.content.clone(),
                })
                .collect(),
            temperature,
        };

        let response = self
            .client
            .post(&target.endpoint)
            .header("Authorization", format!("Bearer {}", target.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                QuillError::remote_call(&target.provider, format!("request failed: {err}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(&target.provider, status, &body));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            QuillError::remote_call(&target.provider, format!("failed to parse response: {err}"))
        })?;

        extract_text_response(&target.provider, parsed)
    }
}

/// Completion policy layer: resolution, transport, and fallback.
pub struct CompletionClient {
    registry: ProviderRegistry,
    backend: Box<dyn CompletionBackend>,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            backend: Box::new(HttpCompletionBackend::new()),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Overrides the sampling temperature after construction.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replaces the transport. Used by tests to script failures.
    pub fn with_backend(mut self, backend: Box<dyn CompletionBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Runs one chat round for `user_line` against the session's current
    /// selection.
    ///
    /// The request turns are the session's in-memory history plus a new user
    /// turn; nothing is recorded here. Failures never escape: they are
    /// logged, fed to the fallback policy, and an unrecoverable round yields
    /// `None`.
    ///
    /// Fallback is a bounded walk, not recursion: each candidate selection
    /// is tried at most once, and moving to the secondary provider rewrites
    /// the session's selection cells before the retry. The rewrite sticks
    /// for the rest of the session regardless of the retry's outcome.
    pub async fn complete(&self, session: &mut SessionState, user_line: &str) -> Option<String> {
        let turns = session.turns_for_request(user_line);

        loop {
            let provider = session.provider().to_string();
            let model = session.model().to_string();

            match self.try_once(&provider, &model, &turns).await {
                Ok(content) => return Some(content),
                Err(err) => {
                    tracing::warn!("completion via '{provider}' failed: {err}");
                    if provider == PRIMARY_PROVIDER
                        && self.registry.has_credential(SECONDARY_PROVIDER)
                    {
                        let (fb_provider, fb_model) = self.registry.fallback_selection();
                        tracing::warn!(
                            "degrading to provider '{fb_provider}' model '{fb_model}' \
                             for the rest of the session"
                        );
                        session.set_selection(fb_provider, fb_model);
                        continue;
                    }
                    return None;
                }
            }
        }
    }

    async fn try_once(
        &self,
        provider: &str,
        model: &str,
        turns: &[ConversationMessage],
    ) -> Result<String> {
        // A missing credential or unknown model key fails here, before any
        // remote call, and is subject to the same fallback handling.
        let resolved = self.registry.resolve(provider, model)?;
        let target = CompletionTarget {
            provider: resolved.provider.to_string(),
            endpoint: resolved.endpoint.to_string(),
            api_key: resolved.api_key.to_string(),
            model: resolved.remote_model.to_string(),
        };
        self.backend
            .complete(&target, turns, self.temperature)
            .await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(provider: &str, response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| QuillError::remote_call(provider, "no content in the response"))
}

fn map_http_error(provider: &str, status: StatusCode, body: &str) -> QuillError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());
    QuillError::remote_call(provider, format!("{status}: {message}"))
}
