//! HTTP surface: one `POST /api/chat` endpoint over the transform pipeline.
//!
//! The handler reads the multipart form into a [`RawForm`], hands it to
//! [`crate::transform::transform`], and relays the result as
//! `{"response": ...}` or `{"error": ...}`. Everything request-specific
//! lives in the pipeline; this module only owns routing, CORS, body limits
//! and the listener.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::pipeline::extract::UploadedFile;
use crate::pipeline::input::{RawForm, FIELD_FILE};
use crate::pipeline::llm::CompletionClient;
use crate::transform::transform;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{Method, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Path of the only endpoint.
pub const CHAT_ROUTE: &str = "/api/chat";

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    client: Arc<dyn CompletionClient>,
    max_upload_bytes: usize,
}

/// Success body: `{"response": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Build the application router.
///
/// Layers, outermost first: request tracing, CORS for the single configured
/// origin (credentials allowed), and the request body cap. The cap is
/// enforced while the multipart stream is read, so an oversized upload is
/// reported through [`ServiceError::PayloadTooLarge`] as a JSON body.
pub fn router(config: &ServiceConfig, client: Arc<dyn CompletionClient>) -> Result<Router, ServiceError> {
    let cors = CorsLayer::new()
        .allow_origin(config.allowed_origin_header()?)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let state = AppState {
        client,
        max_upload_bytes: config.max_upload_bytes,
    };

    Ok(Router::new()
        .route(CHAT_ROUTE, post(chat))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// `POST /api/chat`
///
/// A body that is not multipart at all is read as an empty form, which then
/// fails validation with the usual 400 instead of a framework rejection.
async fn chat(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ChatResponse>, ServiceError> {
    let form = match multipart {
        Ok(multipart) => read_form(multipart, state.max_upload_bytes).await?,
        Err(rejection) => {
            debug!("Body is not multipart ({}); treating as an empty form", rejection);
            RawForm::default()
        }
    };

    let response = transform(form, state.client.as_ref()).await?;
    Ok(Json(ChatResponse { response }))
}

/// Drain the multipart stream into a [`RawForm`].
///
/// The `file` field is kept as bytes with its client filename; every other
/// field is read as text. Unknown fields are dropped. When a field repeats,
/// the first occurrence wins.
async fn read_form(mut multipart: Multipart, limit: usize) -> Result<RawForm, ServiceError> {
    let mut form = RawForm::default();
    let to_service_error = |e: MultipartError| multipart_error(e, limit);

    while let Some(field) = multipart.next_field().await.map_err(to_service_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == FIELD_FILE {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(to_service_error)?;
            debug!("Received upload {:?} ({} bytes)", file_name, bytes.len());
            if form.file.is_none() {
                form.file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field.text().await.map_err(to_service_error)?;
            if !form.set_text(&name, value) {
                debug!("Ignoring unknown form field '{}'", name);
            }
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError, limit: usize) -> ServiceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge { limit }
    } else {
        ServiceError::Internal(format!("Failed to read multipart body: {}", e))
    }
}

/// Bind `config.bind_addr` and serve until Ctrl-C / SIGTERM.
pub async fn serve(config: ServiceConfig, client: Arc<dyn CompletionClient>) -> Result<(), ServiceError> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| ServiceError::Bind {
            addr: config.bind_addr,
            source,
        })?;
    serve_on(listener, &config, client, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on<F>(
    listener: TcpListener,
    config: &ServiceConfig,
    client: Arc<dyn CompletionClient>,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(config, client)?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServiceError::Internal(format!("Listener has no local address: {}", e)))?;

    info!(
        "Listening on http://{}{} (origin: {}, model: {})",
        addr, CHAT_ROUTE, config.allowed_origin, config.model
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServiceError::Internal(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
