//! Configuration types for the codescribe service.
//!
//! Process-wide settings live in [`ServiceConfig`], built once at startup via
//! [`ServiceConfigBuilder`] and handed to the router. Nothing here is mutated
//! after `build()`; every request reads the same immutable value.
//!
//! Per-request knobs (which transformations to apply) are modelled by
//! [`TransformOptions`] and [`DetailLevel`].

use crate::error::ServiceError;
use axum::http::HeaderValue;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default bind address for `codescribe serve`.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Default cross-origin allowlist entry (the editor front-end in development).
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:4200";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default request body cap: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const MIN_UPLOAD_BYTES: usize = 1024;

/// Configuration for the HTTP service.
///
/// Built via [`ServiceConfig::builder()`] or using
/// [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use codescribe::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .allowed_origin("https://editor.example.com")
///     .model("gpt-4o")
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gpt-4o");
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Socket address the listener binds to. Default: `127.0.0.1:5000`.
    pub bind_addr: SocketAddr,

    /// The single origin allowed to make credentialed cross-origin requests.
    /// Default: `http://localhost:4200`.
    pub allowed_origin: String,

    /// Completion model identifier sent with every request. Default: `gpt-4`.
    pub model: String,

    /// Maximum accepted request body in bytes, uploads included. Default: 10 MiB.
    ///
    /// Coding-standard PDFs are typically a few hundred KiB; the cap keeps a
    /// single request from pinning memory while the document is parsed.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("allowed_origin", &self.allowed_origin)
            .field("model", &self.model)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// The allowed origin as a header value, ready for the CORS layer.
    pub fn allowed_origin_header(&self) -> Result<HeaderValue, ServiceError> {
        HeaderValue::from_str(&self.allowed_origin).map_err(|e| {
            ServiceError::InvalidConfig(format!(
                "allowed origin '{}' is not a valid header value: {}",
                self.allowed_origin, e
            ))
        })
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origin = origin.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n.max(MIN_UPLOAD_BYTES);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ServiceError> {
        let c = &self.config;
        if !(c.allowed_origin.starts_with("http://") || c.allowed_origin.starts_with("https://"))
        {
            return Err(ServiceError::InvalidConfig(format!(
                "allowed origin must be an http:// or https:// URL, got '{}'",
                c.allowed_origin
            )));
        }
        c.allowed_origin_header()?;
        if c.model.trim().is_empty() {
            return Err(ServiceError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_upload_bytes < MIN_UPLOAD_BYTES {
            return Err(ServiceError::InvalidConfig(format!(
                "max upload size must be ≥ {} bytes, got {}",
                MIN_UPLOAD_BYTES, c.max_upload_bytes
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How much explanatory commentary the model is asked to add.
///
/// | Level | Requested output |
/// |-------|------------------|
/// | basic | short inline comments (default) |
/// | intermediate | per-function docs with parameters and return values |
/// | advanced | structured docs with examples and optimisation notes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetailLevel {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl DetailLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Basic => "basic",
            DetailLevel::Intermediate => "intermediate",
            DetailLevel::Advanced => "advanced",
        }
    }

    /// Lenient form-field parsing: trimmed, case-insensitive, and anything
    /// unrecognised (including an absent field) falls back to
    /// [`DetailLevel::Basic`] without reporting an error.
    pub fn from_form_value(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(DetailLevel::Basic),
            "intermediate" => Ok(DetailLevel::Intermediate),
            "advanced" => Ok(DetailLevel::Advanced),
            other => Err(ServiceError::InvalidConfig(format!(
                "unknown detail level '{other}' (expected basic, intermediate or advanced)"
            ))),
        }
    }
}

/// Which transformations the model should apply.
///
/// The detail level only exists inside `comments`, so it cannot be set
/// without comments being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformOptions {
    /// Ask the model to rename identifiers.
    pub rename_identifiers: bool,
    /// Ask the model to add comments at the given level.
    pub comments: Option<DetailLevel>,
}

impl TransformOptions {
    /// Options from the three raw form values.
    ///
    /// `detail_level` is ignored unless `add_comments` is set.
    pub fn from_flags(rename_identifiers: bool, add_comments: bool, detail_level: DetailLevel) -> Self {
        Self {
            rename_identifiers,
            comments: add_comments.then_some(detail_level),
        }
    }

    /// `true` when neither transformation was requested.
    pub fn is_noop(&self) -> bool {
        !self.rename_identifiers && self.comments.is_none()
    }
}

/// Parse a form flag: trimmed, case-insensitive `"true"` is true, anything
/// else (absence included) is false.
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
