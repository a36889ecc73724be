use roboframe_frame::{
    decode, decode_record, deserialize_with_config, BuilderConfig, Clock, CodecConfig,
    ColumnBuilder, Decoded, IdSource, RandomIds, SystemClock,
};
use roboframe_schema::{Record, RecordFields, SchemaName};
use tracing::{debug, warn};

use crate::envelope::{unwrap, wrap_with_clock, Envelope};
use crate::error::{EnvelopeError, Result};

/// Record -> frame -> bytes -> envelope.
#[derive(Debug)]
pub struct Encoder<C = SystemClock, I = RandomIds> {
    builder: ColumnBuilder<C, I>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::from_builder(ColumnBuilder::new())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self::from_builder(ColumnBuilder::with_config(config))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock, I: IdSource> Encoder<C, I> {
    pub fn from_builder(builder: ColumnBuilder<C, I>) -> Self {
        Self { builder }
    }

    pub fn builder(&self) -> &ColumnBuilder<C, I> {
        &self.builder
    }

    /// Encode one record into an envelope on its schema's event channel.
    pub fn encode(&self, record: &Record) -> Result<Envelope> {
        let schema = record.schema();
        let frame = self.builder.build_record(record)?;
        let envelope = wrap_with_clock(
            &frame,
            schema.message_kind(),
            schema,
            self.builder.clock(),
        )?;
        debug!(schema = %schema, event = envelope.event_name(), "encoded record");
        Ok(envelope)
    }
}

/// Envelope -> bytes -> frame -> record.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    codec: CodecConfig,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(codec: CodecConfig) -> Self {
        Self { codec }
    }

    /// Decode an envelope as the record kind its `schema_name` declares.
    ///
    /// Any failure rejects the whole message; per-field payload corruption
    /// is reported in [`Decoded::corrupted`] instead.
    pub fn decode(&self, envelope: &Envelope) -> Result<Decoded<Record>> {
        self.run(envelope, |frame| decode_record(frame, envelope.schema_name))
    }

    /// Decode an envelope that must carry `expected`.
    pub fn decode_expecting(
        &self,
        envelope: &Envelope,
        expected: SchemaName,
    ) -> Result<Decoded<Record>> {
        check_schema(envelope, expected)?;
        self.decode(envelope)
    }

    /// Decode an envelope that must carry `R`'s schema.
    pub fn decode_as<R: RecordFields>(&self, envelope: &Envelope) -> Result<Decoded<R>> {
        check_schema(envelope, R::SCHEMA)?;
        self.run(envelope, decode::<R>)
    }

    /// Validate, parse and decode an inbound envelope from JSON text.
    pub fn decode_json(&self, text: &str) -> Result<Decoded<Record>> {
        let envelope = Envelope::from_json(text)
            .inspect_err(|err| warn!(error = %err, "dropping inbound message"))?;
        self.decode(&envelope)
    }

    fn run<T>(
        &self,
        envelope: &Envelope,
        read: impl FnOnce(&roboframe_frame::Frame) -> roboframe_frame::Result<Decoded<T>>,
    ) -> Result<Decoded<T>> {
        let decoded = unwrap(envelope)
            .and_then(|bytes| Ok(deserialize_with_config(&bytes, &self.codec)?))
            .and_then(|frame| Ok(read(&frame)?))
            .inspect_err(|err| {
                warn!(
                    schema = %envelope.schema_name,
                    error = %err,
                    "dropping inbound message"
                )
            })?;

        for err in &decoded.corrupted {
            warn!(schema = %envelope.schema_name, error = %err, "dropped corrupt field");
        }
        Ok(decoded)
    }
}

/// Decode an envelope with the default codec limits, requiring `expected`.
pub fn decode_envelope(envelope: &Envelope, expected: SchemaName) -> Result<Decoded<Record>> {
    Decoder::new().decode_expecting(envelope, expected)
}

fn check_schema(envelope: &Envelope, expected: SchemaName) -> Result<()> {
    if envelope.schema_name != expected {
        warn!(
            expected = %expected,
            found = %envelope.schema_name,
            "dropping inbound message"
        );
        return Err(EnvelopeError::SchemaMismatch {
            expected,
            found: envelope.schema_name,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use roboframe_frame::{CodecError, FixedClock, SequentialIds};
    use roboframe_schema::{
        ArmCommand, ArmCommandType, ArmTelemetry, MessageKind, RoverCommand, RoverTelemetry,
        SchemaError, SchemaName,
    };

    use super::*;

    const NOW: u64 = 1_735_689_600_123;

    fn encoder() -> Encoder<FixedClock, SequentialIds> {
        Encoder::from_builder(ColumnBuilder::with_parts(
            FixedClock::new(NOW),
            SequentialIds::new("cmd"),
            BuilderConfig::default(),
        ))
    }

    fn arm_telemetry() -> ArmTelemetry {
        ArmTelemetry {
            end_effector_pose: [0.3, 0.1, 0.5, 0.0, 1.57, 0.0],
            is_moving: true,
            timestamp: NOW - 40,
            source: "arm_sim".to_string(),
            joint_angles: Some(vec![0.0, 0.4, -0.2, 0.0, 1.1, 0.0]),
            joint_velocities: None,
        }
    }

    #[test]
    fn test_cartesian_move_end_to_end() {
        let command = ArmCommand {
            x: Some(0.3),
            y: Some(0.1),
            z: Some(0.5),
            ..ArmCommand::new(ArmCommandType::CartesianMove)
        };
        let envelope = encoder().encode(&command.into()).unwrap();

        assert_eq!(envelope.message_type, MessageKind::Command);
        assert_eq!(envelope.schema_name, SchemaName::ArmCommand);
        assert_eq!(envelope.event_name(), "arrow_arm_command");
        assert_eq!(envelope.timestamp, NOW);

        let decoded = Decoder::new().decode_as::<ArmCommand>(&envelope).unwrap();
        assert!(decoded.is_clean());
        let record = decoded.record;
        assert_eq!(record.command_type, ArmCommandType::CartesianMove);
        assert_eq!((record.x, record.y, record.z), (Some(0.3), Some(0.1), Some(0.5)));
        assert_eq!(record.roll, Some(0.0));
        assert_eq!(record.max_velocity, Some(0.0));
        assert_eq!(record.joint_angles, None);
        assert_eq!(record.delta_joints, None);
        assert_eq!(record.command_id.as_deref(), Some("cmd-0"));
        assert_eq!(record.timestamp, Some(NOW));
    }

    #[test]
    fn test_rover_command_end_to_end() {
        let envelope = encoder()
            .encode(&RoverCommand::new(0.8, 0.0, -0.2).into())
            .unwrap();
        assert_eq!(envelope.event_name(), "arrow_rover_command");

        let decoded = Decoder::new().decode_as::<RoverCommand>(&envelope).unwrap();
        let record = decoded.record;
        assert_eq!((record.throttle, record.brake, record.steering_angle), (0.8, 0.0, -0.2));
        assert_eq!(record.command_id.as_deref(), Some("cmd-0"));
        assert_eq!(record.timestamp, Some(NOW));
    }

    #[test]
    fn test_telemetry_end_to_end() {
        let telemetry = arm_telemetry();
        let envelope = encoder().encode(&telemetry.clone().into()).unwrap();
        assert_eq!(envelope.message_type, MessageKind::Telemetry);
        assert_eq!(envelope.event_name(), "arrow_telemetry");

        let decoded = Decoder::new().decode(&envelope).unwrap();
        assert_eq!(decoded.record, Record::ArmTelemetry(telemetry));

        let rover = RoverTelemetry {
            position: (12.5, -3.25),
            yaw: 90.0,
            pitch: 0.5,
            roll: -0.5,
            velocity: 1.2,
            timestamp: NOW,
            near_sample: false,
            picking_up: false,
            nav_angles: Some(vec![-0.2, 0.0, 0.2]),
            nav_dists: Some(vec![]),
        };
        let envelope = encoder().encode(&rover.clone().into()).unwrap();
        assert_eq!(envelope.event_name(), "arrow_telemetry");
        let decoded = Decoder::new().decode_as::<RoverTelemetry>(&envelope).unwrap();
        assert_eq!(decoded.record, rover);
    }

    #[test]
    fn test_json_text_roundtrip() {
        let envelope = encoder().encode(&arm_telemetry().into()).unwrap();
        let text = envelope.to_json().unwrap();

        let decoded = Decoder::new().decode_json(&text).unwrap();
        assert_eq!(decoded.record, Record::ArmTelemetry(arm_telemetry()));
    }

    #[test]
    fn test_decode_as_wrong_schema() {
        let envelope = encoder()
            .encode(&RoverCommand::new(0.1, 0.0, 0.0).into())
            .unwrap();
        assert!(matches!(
            Decoder::new().decode_as::<ArmCommand>(&envelope),
            Err(EnvelopeError::SchemaMismatch {
                expected: SchemaName::ArmCommand,
                found: SchemaName::RoverCommand,
            })
        ));
    }

    #[test]
    fn test_decode_envelope_checks_expected_schema() {
        let envelope = encoder()
            .encode(&RoverCommand::new(0.4, 0.2, 1.0).into())
            .unwrap();

        let decoded = decode_envelope(&envelope, SchemaName::RoverCommand).unwrap();
        assert!(matches!(decoded.record, Record::RoverCommand(ref c) if c.brake == 0.2));
        assert!(matches!(
            decode_envelope(&envelope, SchemaName::RoverTelemetry),
            Err(EnvelopeError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_mislabelled_envelope_is_schema_mismatch() {
        let mut envelope = encoder()
            .encode(&RoverCommand::new(0.1, 0.0, 0.0).into())
            .unwrap();
        envelope.schema_name = SchemaName::ArmCommand;

        assert!(matches!(
            Decoder::new().decode(&envelope),
            Err(EnvelopeError::Codec(CodecError::SchemaMismatch(
                SchemaError::MissingField { .. }
            )))
        ));
    }

    #[test]
    fn test_bad_base64_is_transport_error() {
        let mut envelope = encoder()
            .encode(&RoverCommand::new(0.1, 0.0, 0.0).into())
            .unwrap();
        envelope.arrow_data = "%%%".to_string();
        assert!(matches!(
            Decoder::new().decode(&envelope),
            Err(EnvelopeError::TransportDecoding(_))
        ));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let mut envelope = encoder()
            .encode(&RoverCommand::new(0.1, 0.0, 0.0).into())
            .unwrap();
        let bytes = unwrap(&envelope).unwrap();
        envelope.arrow_data = STANDARD.encode(&bytes[..bytes.len() / 2]);

        assert!(matches!(
            Decoder::new().decode(&envelope),
            Err(EnvelopeError::Codec(CodecError::MalformedFrame(_)))
        ));
    }

    #[test]
    fn test_frame_size_limit_applies() {
        let envelope = encoder().encode(&arm_telemetry().into()).unwrap();
        let decoder = Decoder::with_config(CodecConfig { max_frame_size: 16 });
        assert!(matches!(
            decoder.decode(&envelope),
            Err(EnvelopeError::Codec(CodecError::MalformedFrame(_)))
        ));
    }

    #[test]
    fn test_invalid_json_envelope() {
        let result = Decoder::new().decode_json(r#"{"message_type":"command"}"#);
        assert!(matches!(result, Err(EnvelopeError::InvalidEnvelope(_))));
    }

    #[test]
    fn test_unpadded_encoder_config() {
        let encoder = Encoder::with_config(BuilderConfig { padding_rows: 0 });
        let envelope = encoder
            .encode(&RoverCommand::new(0.5, 0.1, 3.0).into())
            .unwrap();
        let decoded = Decoder::new().decode_as::<RoverCommand>(&envelope).unwrap();
        assert_eq!(decoded.record.steering_angle, 3.0);
        assert!(decoded.record.command_id.is_some());
    }
}
