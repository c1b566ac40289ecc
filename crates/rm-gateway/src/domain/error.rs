//! Gateway error taxonomy.
//!
//! Every failure a tool caller can observe is one of the [`GatewayError`]
//! variants. Classification is structural: callers branch on [`ErrorKind`]
//! and [`GatewayError::status`], never on message text.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Coarse error category exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed caller input, unknown family/operation, or unexpected upstream data
    Validation,
    /// Upstream answered 404
    NotFound,
    /// Upstream answered 401 or 403
    Auth,
    /// Upstream answered 429, or local admission wait expired
    RateLimit,
    /// Any other upstream failure, including transport errors
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Upstream => "upstream",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway error with enough structure to branch on
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Caller input or upstream payload failed validation
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Requested resource does not exist upstream
    #[error("resource not found: {path}")]
    NotFound { path: String, body: Value },

    /// Credentials rejected upstream
    #[error("authorization failed with status {status} for {path}")]
    Auth {
        status: u16,
        path: String,
        body: Value,
    },

    /// Quota exhausted, upstream (status present) or local admission (no status)
    #[error("rate limit exceeded")]
    RateLimit {
        status: Option<u16>,
        retry_after_ms: Option<u64>,
        body: Value,
    },

    /// Upstream failure; `status` is `None` for transport errors
    #[error("upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        body: Value,
    },
}

impl GatewayError {
    /// Invalid caller input
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Lookup miss in the operation table
    pub fn unknown_operation(family: &str, operation: &str) -> Self {
        Self::validation(format!(
            "unsupported operation '{}' for resource family '{}'",
            operation, family
        ))
    }

    /// Upstream returned a 2xx with a payload we cannot use
    pub fn unexpected_payload(path: &str, details: impl fmt::Display) -> Self {
        Self::validation(format!(
            "upstream returned unexpected data for {}: {}",
            path, details
        ))
    }

    /// Network-level failure before any status was received
    pub fn transport(details: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: details.into(),
            body: Value::Null,
        }
    }

    /// Local admission queue gave up waiting
    pub fn admission_timeout(waited: Duration) -> Self {
        Self::RateLimit {
            status: None,
            retry_after_ms: None,
            body: serde_json::json!({
                "message": format!("admission wait exceeded {}ms", waited.as_millis())
            }),
        }
    }

    /// Map a non-2xx upstream status onto the taxonomy
    pub fn from_status(
        status: u16,
        path: &str,
        body: Value,
        retry_after: Option<Duration>,
    ) -> Self {
        match status {
            401 | 403 => Self::Auth {
                status,
                path: path.to_string(),
                body,
            },
            404 => Self::NotFound {
                path: path.to_string(),
                body,
            },
            429 => Self::RateLimit {
                status: Some(status),
                retry_after_ms: retry_after.map(|d| d.as_millis() as u64),
                body,
            },
            _ => Self::Upstream {
                status: Some(status),
                message: format!("{} returned status {}", path, status),
                body,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }

    /// Upstream HTTP status, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { .. } => None,
            Self::NotFound { .. } => Some(404),
            Self::Auth { status, .. } => Some(*status),
            Self::RateLimit { status, .. } => *status,
            Self::Upstream { status, .. } => *status,
        }
    }

    /// Decoded upstream error body, when one was received
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Validation { .. } => None,
            Self::NotFound { body, .. }
            | Self::Auth { body, .. }
            | Self::RateLimit { body, .. }
            | Self::Upstream { body, .. } => Some(body),
        }
    }

    /// Structured JSON form handed back to tool callers
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "kind": self.kind(), "message": self.to_string() })
        })
    }
}

impl Serialize for GatewayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("GatewayError", 5)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        if let Some(status) = self.status() {
            state.serialize_field("status", &status)?;
        }
        if let Some(body) = self.body().filter(|b| !b.is_null()) {
            state.serialize_field("body", body)?;
        }
        if let Self::RateLimit {
            retry_after_ms: Some(ms),
            ..
        } = self
        {
            state.serialize_field("retry_after_ms", ms)?;
        }
        state.end()
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::validation(format!("invalid parameters: {}", e))
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
