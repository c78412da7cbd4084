//! Completion gateway: send the composed prompt to the LLM and classify
//! failures.
//!
//! The HTTP layer only sees the [`CompletionClient`] trait, so tests can put a
//! recording mock in place of the real service. [`LlmGateway`] is the
//! production implementation on top of `edgequake-llm`.
//!
//! ## One provider per request
//!
//! The credential belongs to the caller, not to the process, so a provider is
//! built for every call with that caller's key and dropped afterwards. Nothing
//! about the key outlives the request.
//!
//! ## No retry
//!
//! A failed call is reported straight back. Temperature is pinned to 0 to
//! minimise sampling variance; the remote service still does not promise
//! identical output for identical input.

use crate::config::ServiceConfig;
use crate::error::GatewayError;
use crate::pipeline::input::ApiKey;
use crate::prompts::SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError, OpenAIProvider};
use std::time::Instant;
use tracing::{debug, warn};

/// Lower-cased fragments that mark a rejected credential in an error
/// description.
const CREDENTIAL_MARKERS: [&str; 2] = ["invalid api key", "incorrect api key"];

/// Anything that can turn a prompt into a completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` authenticated with `credential` and return the text of
    /// the first response.
    async fn complete(&self, prompt: &str, credential: &ApiKey) -> Result<String, GatewayError>;
}

/// Completion client backed by the OpenAI chat API.
#[derive(Debug, Clone)]
pub struct LlmGateway {
    model: String,
}

impl LlmGateway {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.model.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for LlmGateway {
    async fn complete(&self, prompt: &str, credential: &ApiKey) -> Result<String, GatewayError> {
        let start = Instant::now();
        let provider = OpenAIProvider::new(credential.expose()).with_model(&self.model);

        let messages = build_messages(prompt);
        let options = build_options();

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Completion from {}: {} input tokens, {} output tokens, {:?}",
                    self.model,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                let classified = classify_error(&e);
                warn!(
                    "Completion from {} failed after {:?}: {}",
                    self.model,
                    start.elapsed(),
                    classified
                );
                Err(classified)
            }
        }
    }
}

/// System instruction followed by the composed prompt as the user turn.
fn build_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

/// Sampling options: temperature pinned to zero, everything else default.
fn build_options() -> CompletionOptions {
    CompletionOptions {
        temperature: Some(0.0),
        ..Default::default()
    }
}

/// Classify a provider error.
///
/// The provider's own authentication kind is trusted first; the description
/// is only inspected when the error kind says nothing about credentials.
pub fn classify_error(err: &LlmError) -> GatewayError {
    if matches!(err, LlmError::AuthError(_)) {
        return GatewayError::InvalidCredential;
    }
    classify_description(&err.to_string())
}

/// Classify a failure from its textual description alone.
pub fn classify_description(description: &str) -> GatewayError {
    let lower = description.to_lowercase();
    if CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        GatewayError::InvalidCredential
    } else {
        GatewayError::Failed {
            detail: description.to_string(),
        }
    }
}
