//! Unified error type for every API and session operation.
//!
//! ERROR HANDLING
//! ==============
//! The API reports failures as JSON with an optional `detail` field that may
//! be a string, a list of validation items, or a nested object. All of those
//! shapes are normalized once, in [`ApiError::from_response`], so call sites
//! only ever match on variants.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

/// Display text of the terminal unauthorized error.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Errors produced by the session layer and the typed API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Authorization failed and could not be recovered. Both tokens are gone.
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// The server rejected the request with a readable `detail` message.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The server rejected the request without a usable message.
    #[error("API request failed: {status} {reason}")]
    Status { status: u16, reason: String },

    /// The request never produced an HTTP status.
    #[error("http request failed: {0}")]
    Transport(String),

    /// A response body could not be decoded into the expected type.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// A request body could not be encoded as JSON.
    #[error("request encode failed: {0}")]
    Encode(String),

    /// Reading or writing persisted tokens failed.
    #[error("token storage failed: {0}")]
    Storage(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),
}

impl ApiError {
    /// Build the error for a non-success response from its status and raw body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        match extract_message(body) {
            Some(message) => Self::Server { status, message },
            None => Self::Status { status, reason: canonical_reason(status).to_owned() },
        }
    }

    /// HTTP status carried by the error, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Whether repeating the same request could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Server { status, .. } | Self::Status { status, .. } => {
                matches!(status, 429 | 500..=599)
            }
            _ => false,
        }
    }
}

fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Status")
}

/// Pull a human-readable message out of an error body, if it has one.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    value.get("detail").and_then(detail_message)
}

fn detail_message(detail: &Value) -> Option<String> {
    let message = match detail {
        Value::String(text) => text.trim().to_owned(),
        Value::Array(items) => items
            .iter()
            .filter_map(item_message)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => ["message", "msg"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map_or_else(|| detail.to_string(), str::to_owned),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    (!message.is_empty()).then_some(message)
}

fn item_message(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => {
            let msg = map.get("msg").and_then(Value::as_str)?;
            // FastAPI-style items carry the offending field path in `loc`.
            let field = map
                .get("loc")
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .and_then(Value::as_str);
            Some(match field {
                Some(field) => format!("{field}: {msg}"),
                None => msg.to_owned(),
            })
        }
        _ => None,
    }
}
