//! Error surface of the wire protocol.

use thiserror::Error;

/// Errors raised while decoding a command or response line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The input was not parseable as the base JSON envelope; no correlation
    /// id could be recovered.
    #[error("protocol error: {message}")]
    Protocol {
        /// Human-readable description of the failure.
        message: String,
    },
    /// The envelope parsed but a field violated the action schema.
    #[error("invalid field '{field}': {constraint}")]
    Validation {
        /// Correlation id recovered from the envelope, when present.
        id: Option<String>,
        /// Path of the offending field.
        field: String,
        /// Description of the violated constraint.
        constraint: String,
    },
}

impl DecodeError {
    /// Builds a protocol-level error with no recoverable id.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Builds a validation error for the named field.
    pub fn validation(
        id: Option<String>,
        field: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::Validation {
            id,
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Correlation id recovered from the offending input, when any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Protocol { .. } => None,
            Self::Validation { id, .. } => id.as_deref(),
        }
    }
}

/// Errors raised while encoding a command or response line.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Serialisation to JSON failed.
    #[error("failed to serialise message: {0}")]
    Serialise(#[from] serde_json::Error),
}
