//! JSONL encoding and schema-driven decoding.
//!
//! Decoding happens in three phases so a failure as late as possible still
//! correlates to the caller: the base envelope is parsed first (recovering
//! the `id`), the action schema is enforced field by field, and only then is
//! the typed command materialised and value-validated.

use serde_json::{Map, Value};

use crate::command::{ActionSchema, Command};
use crate::errors::{DecodeError, EncodeError};
use crate::response::{Response, WireResponse};

/// Serialises a command to one JSONL line (newline included).
///
/// # Errors
///
/// Returns [`EncodeError`] when serialisation fails.
pub fn encode_command(command: &Command) -> Result<Vec<u8>, EncodeError> {
    let mut line = serde_json::to_vec(command)?;
    line.push(b'\n');
    Ok(line)
}

/// Serialises a response to one JSONL line (newline included).
///
/// # Errors
///
/// Returns [`EncodeError`] when serialisation fails.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, EncodeError> {
    let mut line = serde_json::to_vec(&WireResponse::from(response))?;
    line.push(b'\n');
    Ok(line)
}

/// Parses and validates a command line.
///
/// # Errors
///
/// Returns [`DecodeError::Protocol`] when the input is not a JSON object and
/// [`DecodeError::Validation`] when a field violates the action schema; the
/// latter carries the caller's `id` whenever it was extractable.
pub fn decode_command(line: &[u8]) -> Result<Command, DecodeError> {
    let trimmed = trim_trailing_whitespace(line);
    if trimmed.is_empty() {
        return Err(DecodeError::protocol("empty command line"));
    }
    let value: Value = serde_json::from_slice(trimmed)
        .map_err(|error| DecodeError::protocol(format!("malformed JSON: {error}")))?;
    let Some(object) = value.as_object() else {
        return Err(DecodeError::protocol("command must be a JSON object"));
    };

    let id = extract_id(object)?;
    let schema = extract_schema(object, &id)?;
    enforce_schema(object, schema, &id)?;

    let command: Command = serde_json::from_value(value.clone()).map_err(|error| {
        DecodeError::validation(Some(id.clone()), schema.tag, error.to_string())
    })?;
    command.validate()?;
    Ok(command)
}

/// Parses a response line.
///
/// # Errors
///
/// Returns [`DecodeError::Protocol`] when the line is unparseable or violates
/// the exactly-one-of-data-or-error invariant.
pub fn decode_response(line: &[u8]) -> Result<Response, DecodeError> {
    let trimmed = trim_trailing_whitespace(line);
    if trimmed.is_empty() {
        return Err(DecodeError::protocol("empty response line"));
    }
    let wire: WireResponse = serde_json::from_slice(trimmed)
        .map_err(|error| DecodeError::protocol(format!("malformed response: {error}")))?;
    Response::try_from(wire)
}

fn extract_id(object: &Map<String, Value>) -> Result<String, DecodeError> {
    match object.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        Some(Value::String(_)) => Err(DecodeError::validation(
            None,
            "id",
            "must not be empty",
        )),
        Some(_) => Err(DecodeError::validation(None, "id", "must be a string")),
        None => Err(DecodeError::validation(None, "id", "required field missing")),
    }
}

fn extract_schema(
    object: &Map<String, Value>,
    id: &str,
) -> Result<&'static ActionSchema, DecodeError> {
    match object.get("action") {
        Some(Value::String(tag)) => ActionSchema::lookup(tag).ok_or_else(|| {
            DecodeError::validation(
                Some(id.to_owned()),
                "action",
                format!("unknown action '{tag}'"),
            )
        }),
        Some(_) => Err(DecodeError::validation(
            Some(id.to_owned()),
            "action",
            "must be a string",
        )),
        None => Err(DecodeError::validation(
            Some(id.to_owned()),
            "action",
            "required field missing",
        )),
    }
}

fn enforce_schema(
    object: &Map<String, Value>,
    schema: &ActionSchema,
    id: &str,
) -> Result<(), DecodeError> {
    for field in schema.required {
        if !object.contains_key(*field) {
            return Err(DecodeError::validation(
                Some(id.to_owned()),
                *field,
                "required field missing",
            ));
        }
    }
    for key in object.keys() {
        if key == "id" || key == "action" {
            continue;
        }
        if !schema.allows(key) {
            return Err(DecodeError::validation(
                Some(id.to_owned()),
                key.clone(),
                format!("unknown field for action '{}'", schema.tag),
            ));
        }
    }
    Ok(())
}

fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;
    use crate::command::{Action, MouseButton, ScrollDirection, Viewport, WaitUntil};
    use rstest::rstest;
    use serde_json::json;

    fn roundtrip(command: &Command) {
        let encoded = encode_command(command).expect("encode");
        let decoded = decode_command(&encoded).expect("decode");
        assert_eq!(&decoded, command);
    }

    #[test]
    fn commands_round_trip() {
        let commands = vec![
            Command {
                id: "a".to_owned(),
                action: Action::Navigate {
                    url: "https://example.com".to_owned(),
                    wait_until: Some(WaitUntil::Networkidle),
                },
            },
            Command {
                id: "b".to_owned(),
                action: Action::Click {
                    selector: "#submit".to_owned(),
                    button: Some(MouseButton::Right),
                    click_count: Some(2),
                    delay: None,
                },
            },
            Command {
                id: "c".to_owned(),
                action: Action::Scroll {
                    selector: None,
                    x: None,
                    y: None,
                    direction: Some(ScrollDirection::Down),
                    amount: Some(250),
                },
            },
            Command {
                id: "d".to_owned(),
                action: Action::WindowNew {
                    viewport: Some(Viewport {
                        width: 1280,
                        height: 800,
                    }),
                },
            },
            Command {
                id: "e".to_owned(),
                action: Action::TabClose { index: None },
            },
            Command {
                id: "f".to_owned(),
                action: Action::Snapshot,
            },
        ];
        for command in &commands {
            roundtrip(command);
        }
    }

    #[test]
    fn decode_accepts_trailing_newline() {
        let line = br#"{"id":"x","action":"tab_new"}
"#;
        let command = decode_command(line).expect("decode");
        assert_eq!(command.action.tag(), "tab_new");
    }

    #[test]
    fn unparseable_input_is_a_protocol_error() {
        let error = decode_command(b"not json at all").expect_err("protocol");
        assert!(matches!(error, DecodeError::Protocol { .. }));
        assert!(error.id().is_none());
    }

    #[rstest]
    #[case::missing_url(br#"{"id":"q","action":"navigate"}"# as &[u8], "url")]
    #[case::missing_selector(br#"{"id":"q","action":"hover"}"#, "selector")]
    #[case::missing_index(br#"{"id":"q","action":"tab_switch"}"#, "index")]
    #[case::missing_values(br##"{"id":"q","action":"select","selector":"#s"}"##, "values")]
    fn missing_required_field_names_it(#[case] line: &[u8], #[case] expected: &str) {
        let error = decode_command(line).expect_err("validation");
        match error {
            DecodeError::Validation { id, field, .. } => {
                assert_eq!(id.as_deref(), Some("q"));
                assert_eq!(field, expected);
            }
            DecodeError::Protocol { .. } => panic!("expected validation error"),
        }
    }

    #[test]
    fn unknown_field_is_rejected() {
        let line = br##"{"id":"q","action":"tab_new","selector":"#x"}"##;
        let error = decode_command(line).expect_err("validation");
        match error {
            DecodeError::Validation { field, .. } => assert_eq!(field, "selector"),
            DecodeError::Protocol { .. } => panic!("expected validation error"),
        }
    }

    #[test]
    fn unknown_action_preserves_the_id() {
        let line = br#"{"id":"q","action":"teleport"}"#;
        let error = decode_command(line).expect_err("validation");
        assert_eq!(error.id(), Some("q"));
    }

    #[test]
    fn missing_id_is_a_validation_error_without_id() {
        let line = br#"{"action":"tab_new"}"#;
        let error = decode_command(line).expect_err("validation");
        assert!(matches!(error, DecodeError::Validation { .. }));
        assert!(error.id().is_none());
    }

    #[test]
    fn empty_selector_is_rejected_before_dispatch() {
        let line = br#"{"id":"q","action":"click","selector":""}"#;
        let error = decode_command(line).expect_err("validation");
        match error {
            DecodeError::Validation { field, constraint, .. } => {
                assert_eq!(field, "selector");
                assert_eq!(constraint, "must not be empty");
            }
            DecodeError::Protocol { .. } => panic!("expected validation error"),
        }
    }

    #[test]
    fn responses_round_trip() {
        let success = Response::success("r-1", json!({"url": "https://example.com", "title": "Example"}));
        let encoded = encode_response(&success).expect("encode");
        assert_eq!(decode_response(&encoded).expect("decode"), success);

        let failure = Response::failure(Some("r-2".to_owned()), "navigation timeout");
        let encoded = encode_response(&failure).expect("encode");
        assert_eq!(decode_response(&encoded).expect("decode"), failure);
    }

    #[test]
    fn response_id_round_trips_even_when_absent() {
        let failure = Response::failure(None, "malformed JSON");
        let encoded = encode_response(&failure).expect("encode");
        let decoded = decode_response(&encoded).expect("decode");
        assert!(decoded.id.is_none());
    }
}
