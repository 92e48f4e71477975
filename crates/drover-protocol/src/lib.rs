//! Wire protocol for the drover client/daemon exchange.
//!
//! Commands and responses travel as single JSONL lines. A command carries a
//! caller-generated correlation `id` and an `action` tag from a closed
//! catalogue; every response echoes the `id` and carries exactly one of a
//! `data` payload or an `error` string. Decoding is schema driven: each
//! action declares its required and optional fields, and violations surface
//! as [`DecodeError::Validation`] values naming the offending field while
//! preserving the caller's `id` whenever it was extractable.

mod codec;
mod command;
mod errors;
mod response;

pub use codec::{decode_command, decode_response, encode_command, encode_response};
pub use command::{
    Action, Command, ImageFormat, MouseButton, ScrollDirection, Viewport, WaitState, WaitUntil,
};
pub use errors::{DecodeError, EncodeError};
pub use response::{Outcome, Response};
