use std::sync::OnceLock;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{EnvelopeError, Result};

/// JSON Schema (2020-12) every inbound envelope must satisfy.
pub const ENVELOPE_SCHEMA: &str = include_str!("../schemas/envelope.schema.json");

fn envelope_validator() -> Result<&'static Validator> {
    static VALIDATOR: OnceLock<std::result::Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: Value =
                serde_json::from_str(ENVELOPE_SCHEMA).map_err(|err| err.to_string())?;
            jsonschema::validator_for(&schema).map_err(|err| err.to_string())
        })
        .as_ref()
        .map_err(|message| EnvelopeError::SchemaCompile(message.clone()))
}

/// Validate a JSON value against the envelope schema.
pub fn validate_envelope(value: &Value) -> Result<()> {
    let validator = envelope_validator()?;

    let mut errors = validator.iter_errors(value);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(EnvelopeError::InvalidEnvelope(message));
    }

    Ok(())
}
