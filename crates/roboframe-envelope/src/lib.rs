//! Text-safe transport envelopes for single-record Arrow frames.
//!
//! An envelope is the JSON object that travels over the event channel:
//! `{message_type, schema_name, arrow_data, timestamp}`, where `arrow_data`
//! is the base64 text of a serialized frame. This crate wraps and unwraps
//! envelopes, validates inbound ones against an embedded JSON Schema, and
//! runs the full record <-> envelope pipeline.

pub mod envelope;
pub mod error;
pub mod pipeline;
pub mod validator;

pub use envelope::{unwrap, wrap, wrap_with_clock, Envelope};
pub use error::{EnvelopeError, Result};
pub use pipeline::{decode_envelope, Decoder, Encoder};
pub use validator::{validate_envelope, ENVELOPE_SCHEMA};
