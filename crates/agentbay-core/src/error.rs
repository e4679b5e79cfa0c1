//! SDK error type.

use thiserror::Error;

use crate::sanitize::{sanitize_error, sanitize_string};

/// Result alias used throughout the SDK.
pub type Result<T, E = AgentBayError> = std::result::Result<T, E>;

/// Error returned by every SDK operation.
///
/// Messages that may echo a request (URLs, headers, server bodies) are
/// redacted when the error is constructed through the helper functions.
#[derive(Debug, Error)]
pub enum AgentBayError {
    /// The remote call could not complete.
    #[error("{context}: {message}")]
    Transport { context: String, message: String },

    /// The remote service reported a failure.
    #[error("{message}")]
    Remote {
        message: String,
        request_id: String,
        code: Option<String>,
    },

    /// An argument was rejected before any call was made.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The response payload did not have the expected shape.
    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },
}

impl AgentBayError {
    /// Wrap an underlying failure with a short contextual prefix.
    #[must_use]
    pub fn transport(context: impl Into<String>, err: &dyn std::fmt::Display) -> Self {
        Self::Transport {
            context: context.into(),
            message: sanitize_error(err),
        }
    }

    /// Remote failure carrying the request id of the failed call.
    #[must_use]
    pub fn remote(message: impl AsRef<str>, request_id: impl Into<String>) -> Self {
        Self::Remote {
            message: sanitize_string(message.as_ref()),
            request_id: request_id.into(),
            code: None,
        }
    }

    /// Remote failure with the service error code.
    #[must_use]
    pub fn remote_with_code(
        message: impl AsRef<str>,
        request_id: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Remote {
            message: sanitize_string(message.as_ref()),
            request_id: request_id.into(),
            code: Some(code.into()),
        }
    }

    /// Payload decode failure.
    #[must_use]
    pub fn decode(what: impl Into<String>, err: &dyn std::fmt::Display) -> Self {
        Self::Decode {
            what: what.into(),
            message: sanitize_error(err),
        }
    }

    /// Prefix the context of a transport error; other kinds pass through.
    #[must_use]
    pub fn with_context(self, prefix: &str) -> Self {
        match self {
            Self::Transport { context, message } => Self::Transport {
                context: format!("{prefix}: {context}"),
                message,
            },
            other => other,
        }
    }

    /// Request id of the failed call, when the service returned one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Remote { request_id, .. } if !request_id.is_empty() => Some(request_id),
            _ => None,
        }
    }

    /// Whether the failure was reported by the remote service.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}
