use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use roboframe_frame::{serialize, Clock, Frame, SystemClock};
use roboframe_schema::{MessageKind, SchemaName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{EnvelopeError, Result};
use crate::validator::validate_envelope;

/// Text-safe container for one serialized frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub message_type: MessageKind,
    pub schema_name: SchemaName,
    /// Base64 (standard alphabet, padded) of the Arrow IPC stream bytes.
    pub arrow_data: String,
    /// Wrap time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Envelope {
    /// Parse and validate an inbound envelope.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| EnvelopeError::InvalidEnvelope(err.to_string()))?;
        Self::from_value(value)
    }

    /// Validate a JSON value and convert it into an envelope.
    ///
    /// Besides the JSON Schema check, the declared `message_type` must be the
    /// kind of the declared schema. Keys outside the four envelope fields are
    /// dropped.
    pub fn from_value(value: Value) -> Result<Self> {
        validate_envelope(&value)?;
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|err| EnvelopeError::InvalidEnvelope(err.to_string()))?;

        let expected = envelope.schema_name.message_kind();
        if envelope.message_type != expected {
            return Err(EnvelopeError::InvalidEnvelope(format!(
                "schema {} is a {expected} schema, envelope says {}",
                envelope.schema_name, envelope.message_type
            )));
        }
        Ok(envelope)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Event channel this envelope is published on.
    pub fn event_name(&self) -> &'static str {
        match self.schema_name {
            SchemaName::ArmTelemetry | SchemaName::RoverTelemetry => "arrow_telemetry",
            SchemaName::ArmCommand => "arrow_arm_command",
            SchemaName::RoverCommand => "arrow_rover_command",
        }
    }
}

/// Wrap a frame using the system clock.
pub fn wrap(frame: &Frame, kind: MessageKind, schema: SchemaName) -> Result<Envelope> {
    wrap_with_clock(frame, kind, schema, &SystemClock)
}

/// Serialize a frame and wrap it, stamping the envelope with `clock`.
pub fn wrap_with_clock<C: Clock + ?Sized>(
    frame: &Frame,
    kind: MessageKind,
    schema: SchemaName,
    clock: &C,
) -> Result<Envelope> {
    let bytes = serialize(frame)?;
    let envelope = Envelope {
        message_type: kind,
        schema_name: schema,
        arrow_data: STANDARD.encode(&bytes),
        timestamp: clock.now_millis(),
    };
    debug!(
        schema = %schema,
        bytes = bytes.len(),
        text = envelope.arrow_data.len(),
        "wrapped frame"
    );
    Ok(envelope)
}

/// Recover the serialized frame bytes from an envelope.
pub fn unwrap(envelope: &Envelope) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(envelope.arrow_data.as_bytes())?)
}

#[cfg(test)]
mod tests {
    use roboframe_frame::{
        deserialize, BuilderConfig, ColumnBuilder, FixedClock, SequentialIds,
    };
    use roboframe_schema::RoverCommand;
    use serde_json::json;

    use super::*;

    const NOW: u64 = 1_735_689_600_123;

    fn rover_frame() -> Frame {
        ColumnBuilder::with_parts(
            FixedClock::new(NOW),
            SequentialIds::new("cmd"),
            BuilderConfig::default(),
        )
        .build(&RoverCommand::new(0.8, 0.0, -0.2))
        .unwrap()
    }

    fn rover_envelope() -> Envelope {
        wrap_with_clock(
            &rover_frame(),
            MessageKind::Command,
            SchemaName::RoverCommand,
            &FixedClock::new(NOW + 5),
        )
        .unwrap()
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let frame = rover_frame();
        let envelope = rover_envelope();

        assert_eq!(envelope.timestamp, NOW + 5);
        assert_eq!(envelope.message_type, MessageKind::Command);
        let bytes = unwrap(&envelope).unwrap();
        assert_eq!(bytes, serialize(&frame).unwrap().to_vec());
        assert_eq!(deserialize(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_payload_is_text_safe() {
        let envelope = rover_envelope();
        assert!(envelope
            .arrow_data
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='));
    }

    #[test]
    fn test_unwrap_rejects_bad_alphabet() {
        let mut envelope = rover_envelope();
        envelope.arrow_data = "not*base64!".to_string();
        assert!(matches!(
            unwrap(&envelope),
            Err(EnvelopeError::TransportDecoding(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_bad_padding() {
        let mut envelope = rover_envelope();
        envelope.arrow_data = "QUJDRA=".to_string();
        assert!(matches!(
            unwrap(&envelope),
            Err(EnvelopeError::TransportDecoding(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_uses_wire_names() {
        let envelope = rover_envelope();
        let value = envelope.to_value().unwrap();
        assert_eq!(value["message_type"], "command");
        assert_eq!(value["schema_name"], "rover_command");
        assert_eq!(value["timestamp"], NOW + 5);

        let parsed = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_from_value_ignores_extra_keys() {
        let envelope = rover_envelope();
        let mut value = envelope.to_value().unwrap();
        value["relay"] = json!("ground-station-2");

        let parsed = Envelope::from_value(value).unwrap();
        assert_eq!(parsed, envelope);
        assert!(parsed.to_value().unwrap().get("relay").is_none());
    }

    #[test]
    fn test_from_json_rejects_non_json() {
        assert!(matches!(
            Envelope::from_json("{not json"),
            Err(EnvelopeError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_from_value_rejects_kind_schema_disagreement() {
        let value = json!({
            "message_type": "telemetry",
            "schema_name": "rover_command",
            "arrow_data": "QUJD",
            "timestamp": NOW,
        });
        assert!(matches!(
            Envelope::from_value(value),
            Err(EnvelopeError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_event_names() {
        let mut envelope = rover_envelope();
        assert_eq!(envelope.event_name(), "arrow_rover_command");
        envelope.schema_name = SchemaName::ArmCommand;
        assert_eq!(envelope.event_name(), "arrow_arm_command");
        envelope.schema_name = SchemaName::ArmTelemetry;
        assert_eq!(envelope.event_name(), "arrow_telemetry");
        envelope.schema_name = SchemaName::RoverTelemetry;
        assert_eq!(envelope.event_name(), "arrow_telemetry");
    }
}
