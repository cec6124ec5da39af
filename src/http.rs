use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

use crate::error::{ApiErrorResponse, ClientError, ResponseError};

#[cfg(test)]
pub(crate) mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthLevel {
    None,          // Public endpoint
    Authenticated, // Requires a bearer access token
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) auth_level: AuthLevel,
}

impl HttpRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: Vec::new(),
            body: None,
            auth_level: AuthLevel::None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn auth_level(&self) -> AuthLevel {
        self.auth_level
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.auth_level = AuthLevel::Authenticated;
        self
    }

    /// Path with its percent-encoded query string appended. This is what the
    /// gateway joins onto the base URL.
    pub fn path_and_query(&self) -> String {
        if self.query_params.is_empty() {
            return self.path.clone();
        }
        let params: Vec<String> = self
            .query_params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.path, params.join("&"))
    }
}

/// The gateway every component talks to the backend through.
///
/// Implementors only need to provide [`HttpClient::request_text`]; a non-success
/// status must be reported through [`status_error`] so callers can classify it.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn request_text(&self, req: HttpRequest) -> Result<String, ClientError>;

    async fn request_empty(&self, req: HttpRequest) -> Result<(), ClientError> {
        self.request_text(req).await?;
        Ok(())
    }

    /// Empty bodies decode as `null`.
    async fn request_json(&self, req: HttpRequest) -> Result<serde_json::Value, ClientError> {
        let text = self.request_text(req).await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn request<T: DeserializeOwned + Send>(&self, req: HttpRequest) -> Result<T, ClientError> {
        let value = self.request_json(req).await?;
        if value.is_null() {
            return Err(ResponseError::EmptyResponse.into());
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait::async_trait]
impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    async fn request_text(&self, req: HttpRequest) -> Result<String, ClientError> {
        (**self).request_text(req).await
    }
}

/// Map a non-success status and its body onto the client error taxonomy.
pub fn status_error(status: StatusCode, body: String) -> ClientError {
    if status == StatusCode::UNAUTHORIZED {
        warn!("Received 401 Unauthorized");
        return ClientError::Unauthorized;
    }

    error!(
        "Received HTTP error: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );

    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_error) if !api_error.is_empty() => {
            error!("API error response: {}", api_error);
            ClientError::ApiError(api_error)
        }
        _ => ResponseError::http_status(status, body).into(),
    }
}
