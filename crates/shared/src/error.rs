use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const FALLBACK_ERROR_MESSAGE: &str = "failed to load data";

/// Error body emitted by the monitoring backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ApiErrorBody {
    /// Human-readable detail. Validation failures carry a list of objects with a `msg` field.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Array(entries) => {
                let messages: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            Value::Null | Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed page payload: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// The stored session token is no longer accepted and the user must sign in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, FetchError::Unauthorized(_))
    }

    /// Message shown to the user; falls back to a generic text when the failure carried none.
    pub fn display_message(&self) -> String {
        let message = match self {
            FetchError::Other(message) => message.trim().to_string(),
            other => other.to_string(),
        };
        if message.is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource '{0}' (expected devices, fields, collection-sessions or raw-data)")]
pub struct UnknownResource(pub String);
