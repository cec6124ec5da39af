use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Login form input. Lives only for one login attempt and is never persisted.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Access and refresh token, always both present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    access: String,
    refresh: String,
}

impl TokenPair {
    /// Returns `None` unless both tokens are non-empty.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Option<Self> {
        let (access, refresh) = (access.into(), refresh.into());
        if access.is_empty() || refresh.is_empty() {
            return None;
        }
        Some(Self { access, refresh })
    }

    pub fn access(&self) -> &str {
        &self.access
    }

    pub fn refresh(&self) -> &str {
        &self.refresh
    }

    pub fn is_complete(&self) -> bool {
        !self.access.is_empty() && !self.refresh.is_empty()
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair(<redacted>)")
    }
}

/// Raw body of the token endpoint; either field may be missing.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_pair(self) -> Option<TokenPair> {
        TokenPair::new(self.access?, self.refresh?)
    }
}

/// Claims carried in the access token payload. The signature is not verified
/// client-side; these are for display and gating only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionIdentity {
    pub user_id: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub iat: Option<DateTime<Utc>>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionIdentity {
    /// Decode the payload segment of a `header.payload.signature` token.
    pub fn decode(access_token: &str) -> Result<Self, DecodeError> {
        let mut parts = access_token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(DecodeError::Format);
        };

        let payload = general_purpose::URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&payload)?)
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now()
    }
}
