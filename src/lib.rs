//! # codescribe
//!
//! An HTTP service that asks a large language model to comment and/or rename
//! identifiers in a block of source code, optionally following a coding
//! standard supplied as a PDF.
//!
//! ## Request Flow
//!
//! ```text
//! POST /api/chat (multipart)
//!  │
//!  ├─ 1. Input    validate apiKey + prompt, default the options
//!  ├─ 2. Extract  coding-standard PDF → text (spawn_blocking, never fatal)
//!  ├─ 3. Compose  pure prompt template: standard, tasks, code, directive
//!  ├─ 4. Complete one chat call with the caller's key, temperature 0
//!  └─ 5. Relay    {"response": ...} or {"error": ...}
//! ```
//!
//! Requests share nothing but the immutable [`ServiceConfig`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codescribe::{serve, LlmGateway, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .allowed_origin("http://localhost:4200")
//!         .build()?;
//!     let gateway = Arc::new(LlmGateway::from_config(&config));
//!     serve(config, gateway).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `codescribe` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod transform;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DetailLevel, ServiceConfig, ServiceConfigBuilder, TransformOptions};
pub use error::{ExtractionError, GatewayError, ServiceError};
pub use pipeline::extract::{extract_standard, UploadedFile};
pub use pipeline::input::{ApiKey, RawForm, TransformRequest};
pub use pipeline::llm::{CompletionClient, LlmGateway};
pub use prompts::compose_prompt;
pub use server::{router, serve, serve_on, ChatResponse, CHAT_ROUTE};
pub use transform::{complete_request, transform};
