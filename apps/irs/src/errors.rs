use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::llm_client::LlmError;

/// The kind of record a data source is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Irs,
    Intent,
    ApiKey,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Irs => "IRS record",
            EntityKind::Intent => "intent",
            EntityKind::ApiKey => "API key",
        };
        f.write_str(label)
    }
}

/// A record failed the domain schema. Signals a data-integrity defect in the
/// source system, so it is never retried.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid {entity} '{id}': {reason}")]
pub struct ValidationError {
    pub entity: EntityKind,
    pub id: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(entity: EntityKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// A referenced record could not be resolved.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} not found: {id}")]
pub struct NotFoundError {
    pub kind: EntityKind,
    pub id: String,
}

impl NotFoundError {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Raw model output that matches none of the Output Contract shapes.
///
/// Distinct from a valid `intent-not-recognized` outcome, which is a normal
/// classification result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponseContractViolation {
    #[error("Model output is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Model output must be a JSON object")]
    NotAnObject,

    #[error("Model output has no string 'code' field")]
    MissingCode,

    #[error("Unknown response code '{0}'")]
    UnknownCode(String),

    #[error("Invalid '{code}' response: {reason}")]
    ShapeMismatch { code: String, reason: String },

    #[error("Recognized intent code '{0}' is not one of the available intents")]
    UnknownIntent(String),

    #[error("Response for intent '{intent_code}' is missing data attribute '{attribute}'")]
    MissingAttribute {
        intent_code: String,
        attribute: String,
    },

    #[error("Response for intent '{intent_code}' contains undeclared data attribute '{attribute}'")]
    UndeclaredAttribute {
        intent_code: String,
        attribute: String,
    },

    #[error("need-more-info references unknown data attribute '{0}'")]
    UnknownMissingAttribute(String),
}

impl ResponseContractViolation {
    pub(crate) fn mismatch(code: &str, reason: impl Into<String>) -> Self {
        ResponseContractViolation::ShapeMismatch {
            code: code.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a data-source adapter.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Data source backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for DataSourceError {
    fn from(e: sqlx::Error) -> Self {
        DataSourceError::Backend(e.to_string())
    }
}

impl From<reqwest::Error> for DataSourceError {
    fn from(e: reqwest::Error) -> Self {
        DataSourceError::Backend(e.to_string())
    }
}

/// Raised while building an endpoint configuration. No endpoint is ever
/// partially configured: any of these aborts the whole assembly.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Data source error: {0}")]
    Source(String),

    #[error("Failed to serialize intent '{intent_id}': {message}")]
    Serialize { intent_id: String, message: String },

    #[error("IRS '{0}' is inactive")]
    InactiveService(String),

    #[error("IRS '{0}' has no intents available for recognition")]
    NoIntents(String),

    #[error("Authentication is enabled but IRS '{0}' has no API keys")]
    NoApiKeys(String),

    #[error("Invalid endpoint configuration: {0}")]
    Config(String),
}

impl From<DataSourceError> for AssemblyError {
    fn from(e: DataSourceError) -> Self {
        match e {
            DataSourceError::NotFound(e) => AssemblyError::NotFound(e),
            DataSourceError::Validation(e) => AssemblyError::Validation(e),
            DataSourceError::Backend(msg) => AssemblyError::Source(msg),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Response contract violation: {0}")]
    ContractViolation(#[from] ResponseContractViolation),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UidMismatch | AuthError::EndpointNotAllowed(_) => {
                AppError::Forbidden(e.to_string())
            }
            _ => AppError::Unauthorized(e.to_string()),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Llm(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::ContractViolation(e) => {
                tracing::error!("Model output rejected: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "RESPONSE_CONTRACT_VIOLATION",
                    e.to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
