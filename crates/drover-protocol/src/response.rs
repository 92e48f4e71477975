//! Typed responses and their wire form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;

/// Immutable response value correlated to one command.
///
/// Exactly one of the `data` payload or the `error` string is present; the
/// constructors enforce the invariant and decoding re-checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Correlation id echoed from the originating command. Absent only for
    /// protocol-level failures where no id was extractable.
    pub id: Option<String>,
    /// Success payload or failure description.
    pub outcome: Outcome,
}

/// The two legal response outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The command succeeded; the payload shape depends on the action.
    Success(Value),
    /// The command failed with a human-readable description.
    Failure(String),
}

impl Response {
    /// Builds a success response carrying a data payload.
    #[must_use]
    pub fn success(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(id.into()),
            outcome: Outcome::Success(data),
        }
    }

    /// Builds a failure response correlated to the given id.
    #[must_use]
    pub fn failure(id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Outcome::Failure(error.into()),
        }
    }

    /// True when the response reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Returns the data payload of a successful response.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    /// Returns the error text of a failed response.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message),
        }
    }
}

/// Flat JSON form used on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl From<&Response> for WireResponse {
    fn from(response: &Response) -> Self {
        match &response.outcome {
            Outcome::Success(data) => Self {
                id: response.id.clone(),
                success: true,
                data: Some(data.clone()),
                error: None,
            },
            Outcome::Failure(message) => Self {
                id: response.id.clone(),
                success: false,
                data: None,
                error: Some(message.clone()),
            },
        }
    }
}

impl TryFrom<WireResponse> for Response {
    type Error = DecodeError;

    fn try_from(wire: WireResponse) -> Result<Self, DecodeError> {
        match (wire.success, wire.data, wire.error) {
            (true, Some(data), None) => Ok(Self {
                id: wire.id,
                outcome: Outcome::Success(data),
            }),
            (false, None, Some(message)) => Ok(Self {
                id: wire.id,
                outcome: Outcome::Failure(message),
            }),
            _ => Err(DecodeError::protocol(
                "response must carry exactly one of data or error, matching its success flag",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_carries_data_only() {
        let response = Response::success("r-1", json!({"clicked": true}));
        let wire = WireResponse::from(&response);
        assert!(wire.success);
        assert!(wire.data.is_some());
        assert!(wire.error.is_none());
    }

    #[test]
    fn failure_carries_error_only() {
        let response = Response::failure(Some("r-2".to_owned()), "selector not found");
        let wire = WireResponse::from(&response);
        assert!(!wire.success);
        assert!(wire.data.is_none());
        assert_eq!(wire.error.as_deref(), Some("selector not found"));
    }

    #[test]
    fn rejects_contradictory_wire_forms() {
        let wire = WireResponse {
            id: Some("r-3".to_owned()),
            success: true,
            data: None,
            error: Some("but also failed".to_owned()),
        };
        assert!(Response::try_from(wire).is_err());
    }
}
