use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

use crate::storage::StorageError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error body returned by the backend: either `{"detail": "..."}` or a map of
/// field names to validation messages.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ApiErrorResponse {
    pub fn is_empty(&self) -> bool {
        self.detail.is_none() && self.fields.is_empty()
    }
}

impl Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(|(field, value)| match value {
                serde_json::Value::Array(messages) => {
                    let messages = messages
                        .iter()
                        .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                        .collect::<Vec<_>>()
                        .join(" ");
                    format!("{field}: {messages}")
                }
                serde_json::Value::String(message) => format!("{field}: {message}"),
                other => format!("{field}: {other}"),
            })
            .collect::<Vec<_>>();

        match (&self.detail, fields.is_empty()) {
            (Some(detail), true) => write!(f, "{detail}"),
            (Some(detail), false) => write!(f, "{detail} ({})", fields.join(", ")),
            (None, _) => write!(f, "{}", fields.join(", ")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Session expired or missing credentials")]
    Unauthorized,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(#[source] BoxError),

    #[error("API error: {0}")]
    ApiError(ApiErrorResponse),

    #[error("JSON error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Response format error: {0}")]
    ResponseError(#[from] ResponseError),

    #[error("Data error: {0}")]
    DataError(#[from] DataError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Unknown news source '{0}'")]
    UnknownSource(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(Box::new(err))
    }
}

impl ClientError {
    pub fn network(err: impl Into<BoxError>) -> Self {
        Self::Network(err.into())
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl DataError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("Empty response when data was expected")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    Invalid(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
}

impl ResponseError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    pub fn http_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }
}

/// Failure to read identity claims out of an access token.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Access token is not a three-part signed token")]
    Format,

    #[error("Access token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Access token payload is not valid claims JSON: {0}")]
    Claims(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("The entered email or password was incorrect. Please try again.")]
    InvalidCredentials,

    #[error("Token response is missing the access or refresh token")]
    MalformedTokenResponse,

    #[error("Failed to decode access token: {0}")]
    Decode(#[from] DecodeError),

    #[error("Network error: {0}")]
    Network(#[source] BoxError),

    #[error("Login cancelled")]
    Cancelled,

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No authenticated session")]
    NotAuthenticated,

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<ClientError> for AuthError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized
            | ClientError::ApiError(_)
            | ClientError::ResponseError(ResponseError::HttpStatus { .. }) => {
                Self::InvalidCredentials
            }
            ClientError::Network(source) => Self::Network(source),
            ClientError::Cancelled => Self::Cancelled,
            ClientError::SerdeError(_)
            | ClientError::ResponseError(ResponseError::EmptyResponse | ResponseError::Invalid(_)) => {
                Self::MalformedTokenResponse
            }
            other => Self::Unexpected(other.to_string()),
        }
    }
}
