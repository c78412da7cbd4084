//! Input normalisation: raw form fields → a validated [`TransformRequest`].
//!
//! Validation runs before any document is parsed, so a request missing its
//! credential or code is rejected cheaply and never reaches the gateway.
//! Optional fields are never rejected: an unknown detail level becomes
//! `basic` and anything other than `"true"` turns a flag off.

use crate::config::{parse_flag, DetailLevel, TransformOptions};
use crate::error::ServiceError;
use crate::pipeline::extract::{self, UploadedFile};
use std::fmt;

/// Form field carrying the caller's credential.
pub const FIELD_API_KEY: &str = "apiKey";
/// Form field carrying the code to transform.
pub const FIELD_PROMPT: &str = "prompt";
/// Form field carrying the comment detail level.
pub const FIELD_DETAIL_LEVEL: &str = "detailLevel";
/// Form field toggling identifier renaming.
pub const FIELD_RENAME_VARIABLES: &str = "renameVariables";
/// Form field toggling comment generation.
pub const FIELD_ADD_COMMENTS: &str = "addComments";
/// Form field carrying the coding-standard document.
pub const FIELD_FILE: &str = "file";

/// Caller-supplied completion-service credential.
///
/// Held only for the lifetime of one request. `Debug` is redacted so the key
/// cannot leak through a stray log line.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a non-blank key, trimming surrounding whitespace.
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        (!key.is_empty()).then(|| Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Form fields exactly as received, before any validation.
#[derive(Debug, Clone, Default)]
pub struct RawForm {
    pub api_key: Option<String>,
    pub prompt: Option<String>,
    pub detail_level: Option<String>,
    pub rename_variables: Option<String>,
    pub add_comments: Option<String>,
    pub file: Option<UploadedFile>,
}

impl RawForm {
    /// Store a text field by its wire name. Unknown names are ignored, and a
    /// repeated field keeps its first value.
    ///
    /// Returns `false` when the name was not recognised.
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            FIELD_API_KEY => &mut self.api_key,
            FIELD_PROMPT => &mut self.prompt,
            FIELD_DETAIL_LEVEL => &mut self.detail_level,
            FIELD_RENAME_VARIABLES => &mut self.rename_variables,
            FIELD_ADD_COMMENTS => &mut self.add_comments,
            _ => return false,
        };
        slot.get_or_insert(value);
        true
    }
}

/// A validated, defaulted request ready for the composer.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub credential: ApiKey,
    /// The caller's code, trimmed.
    pub code: String,
    pub options: TransformOptions,
    /// Extracted coding standard; empty when none was usable.
    pub standard: String,
}

/// Validated fields, before the document has been read.
#[derive(Debug, Clone)]
pub struct ValidatedForm {
    pub credential: ApiKey,
    pub code: String,
    pub options: TransformOptions,
    pub file: Option<UploadedFile>,
}

/// Check required fields and default the optional ones.
///
/// The credential is checked before the code, so a form missing both
/// reports [`ServiceError::MissingCredential`].
pub fn validate(form: RawForm) -> Result<ValidatedForm, ServiceError> {
    let credential = form
        .api_key
        .as_deref()
        .and_then(ApiKey::new)
        .ok_or(ServiceError::MissingCredential)?;

    let code = form
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(ServiceError::MissingInstruction)?
        .to_string();

    let options = TransformOptions::from_flags(
        parse_flag(form.rename_variables.as_deref()),
        parse_flag(form.add_comments.as_deref()),
        DetailLevel::from_form_value(form.detail_level.as_deref()),
    );

    Ok(ValidatedForm {
        credential,
        code,
        options,
        file: form.file,
    })
}

/// Validate the form, then extract the coding standard.
pub async fn normalize(form: RawForm) -> Result<TransformRequest, ServiceError> {
    let ValidatedForm {
        credential,
        code,
        options,
        file,
    } = validate(form)?;

    let standard = extract::extract_standard(file).await;

    Ok(TransformRequest {
        credential,
        code,
        options,
        standard,
    })
}
