//! API error taxonomy
//!
//! Every failure surfaced by the request executor is an [`ApiError`]. Its
//! [`ApiErrorKind`] is fixed at construction so callers branch on data
//! rather than on error variants. Retry and auth-expiry decisions are pure
//! functions of the error value.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Backend code for an expired access token
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
/// Local code for a request aborted by the client-side timer
pub const TIMEOUT: &str = "TIMEOUT";
/// Local code for connection-level failures
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
/// Local code for a success response whose body could not be decoded
pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";
/// Local code for a request that could not be built
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

/// Coarse classification of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Network unreachable, DNS, connection reset, timeout
    Transport,
    /// 4xx other than 408/429; never retried
    Client,
    /// 408, 429 and 5xx; retried
    RateLimited,
    /// 401 or backend code `TOKEN_EXPIRED`
    AuthExpired,
    /// Undecodable response body
    Malformed,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Client => "client",
            Self::RateLimited => "rate_limited",
            Self::AuthExpired => "auth_expired",
            Self::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

/// Classified API failure
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    kind: ApiErrorKind,
}

impl ApiError {
    /// Classify a non-success response.
    ///
    /// The message is `body.error`, else `body.message`, else
    /// `"API Error: <status> <status_text>"`. `code` and `details` are taken
    /// from the body when present.
    pub fn from_response(status: u16, status_text: &str, body: &Value) -> Self {
        let message = string_field(body, "error")
            .or_else(|| string_field(body, "message"))
            .unwrap_or_else(|| format!("API Error: {status} {status_text}").trim_end().to_string());
        let code = string_field(body, "code");
        let details = body.get("details").filter(|d| !d.is_null()).cloned();
        let kind = classify(Some(status), code.as_deref());

        Self { message, status: Some(status), code, details, kind }
    }

    /// The client-side timer fired before a response arrived.
    pub fn timeout() -> Self {
        Self {
            message: "Request timeout".to_string(),
            status: Some(408),
            code: Some(TIMEOUT.to_string()),
            details: None,
            kind: ApiErrorKind::Transport,
        }
    }

    /// Connection-level failure with no HTTP status.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: Some(NETWORK_ERROR.to_string()),
            details: None,
            kind: ApiErrorKind::Transport,
        }
    }

    /// A success response whose body could not be decoded.
    pub fn malformed(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            code: Some(MALFORMED_RESPONSE.to_string()),
            details: None,
            kind: ApiErrorKind::Malformed,
        }
    }

    /// The request could not be built (bad path, unserializable body).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: Some(INVALID_REQUEST.to_string()),
            details: None,
            kind: ApiErrorKind::Client,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        is_retryable(self)
    }

    pub fn is_auth_expired(&self) -> bool {
        is_auth_expired(self)
    }
}

fn string_field(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn classify(status: Option<u16>, code: Option<&str>) -> ApiErrorKind {
    if status == Some(401) || code == Some(TOKEN_EXPIRED) {
        return ApiErrorKind::AuthExpired;
    }
    match status {
        Some(408 | 429) => ApiErrorKind::RateLimited,
        Some(s) if s >= 500 => ApiErrorKind::RateLimited,
        Some(400..=499) => ApiErrorKind::Client,
        _ => ApiErrorKind::Transport,
    }
}

/// Whether a failed attempt is worth repeating.
///
/// 5xx, 408 and 429 are retryable; any other 4xx is not. Client-kind errors
/// never retry, even without a status. Other errors without a status
/// (transport failures) and any other status retry.
pub fn is_retryable(error: &ApiError) -> bool {
    if error.kind == ApiErrorKind::Client {
        return false;
    }
    match error.status {
        Some(status) if status >= 500 => true,
        Some(408 | 429) => true,
        Some(400..=499) => false,
        _ => true,
    }
}

/// Whether the backend rejected the access token.
pub fn is_auth_expired(error: &ApiError) -> bool {
    error.status == Some(401) || error.code.as_deref() == Some(TOKEN_EXPIRED)
}
