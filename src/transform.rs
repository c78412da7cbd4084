//! Request-level entry points.
//!
//! [`transform`] runs the whole pipeline for one request: validate the form,
//! read the coding standard, compose the prompt, call the completion client.
//! The HTTP handler is a thin shim over it, and library callers can use it
//! directly without going through HTTP.

use crate::error::ServiceError;
use crate::pipeline::input::{self, RawForm, TransformRequest};
use crate::pipeline::llm::CompletionClient;
use crate::prompts::compose_prompt;
use std::time::Instant;
use tracing::{debug, info};

/// Run one request end to end and return the transformed code.
///
/// # Errors
/// - [`ServiceError::MissingCredential`] / [`ServiceError::MissingInstruction`]
///   before anything else happens; the client is not called.
/// - [`ServiceError::Gateway`] when the completion call fails.
///
/// A bad coding-standard document is never an error.
pub async fn transform(form: RawForm, client: &dyn CompletionClient) -> Result<String, ServiceError> {
    let start = Instant::now();

    // ── Step 1: Validate + extract ───────────────────────────────────────
    let request = input::normalize(form).await?;

    // ── Step 2: Compose + complete ───────────────────────────────────────
    let response = complete_request(&request, client).await?;

    info!(
        "Transformed {} chars of code → {} chars in {}ms",
        request.code.len(),
        response.len(),
        start.elapsed().as_millis()
    );
    Ok(response)
}

/// Compose the prompt for an already-normalised request and send it.
pub async fn complete_request(
    request: &TransformRequest,
    client: &dyn CompletionClient,
) -> Result<String, ServiceError> {
    if request.options.is_noop() {
        debug!("No tasks requested; sending the code with the closing directive only");
    }
    let prompt = compose_prompt(&request.standard, &request.code, request.options);
    debug!(
        "Composed prompt: {} chars (standard: {} chars, rename: {}, comments: {:?})",
        prompt.len(),
        request.standard.len(),
        request.options.rename_identifiers,
        request.options.comments
    );

    Ok(client.complete(&prompt, &request.credential).await?)
}
