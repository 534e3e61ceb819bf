use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Validation,
    Conflict,
    Upstream,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure taxonomy shared by the Graph client, the form controller and the
/// web front.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The identity provider rejected the credentials or could not be reached.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The reference read did not have the expected shape.
    #[error("reference data schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid input: {0}")]
    Validation(String),
}

impl FormError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FormError::Authentication(_) => ErrorCode::Unauthorized,
            FormError::SchemaMismatch(_) | FormError::Transport(_) => ErrorCode::Upstream,
            FormError::Submission(_) => ErrorCode::Upstream,
            FormError::Validation(_) => ErrorCode::Validation,
        }
    }
}

impl From<FormError> for ApiError {
    fn from(value: FormError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
