use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use arrow::datatypes::{Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::SchemaError;
use crate::field::{FieldKind, FieldSpec, Generated};

/// Text written into an array column when the array is absent.
pub const ARRAY_NULL_MARKER: &str = "null";

const ARM_TELEMETRY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("end_effector_x", FieldKind::Float),
    FieldSpec::required("end_effector_y", FieldKind::Float),
    FieldSpec::required("end_effector_z", FieldKind::Float),
    FieldSpec::required("end_effector_roll", FieldKind::Float),
    FieldSpec::required("end_effector_pitch", FieldKind::Float),
    FieldSpec::required("end_effector_yaw", FieldKind::Float),
    FieldSpec::required("is_moving", FieldKind::Bool),
    FieldSpec::required("timestamp", FieldKind::TimestampMillis),
    FieldSpec::required("source", FieldKind::Text),
    FieldSpec::array("joint_angles"),
    FieldSpec::array("joint_velocities"),
];

const ROVER_TELEMETRY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("position_x", FieldKind::Float),
    FieldSpec::required("position_y", FieldKind::Float),
    FieldSpec::required("yaw", FieldKind::Float),
    FieldSpec::required("pitch", FieldKind::Float),
    FieldSpec::required("roll", FieldKind::Float),
    FieldSpec::required("velocity", FieldKind::Float),
    FieldSpec::required("timestamp", FieldKind::TimestampMillis),
    FieldSpec::required("near_sample", FieldKind::Bool),
    FieldSpec::required("picking_up", FieldKind::Bool),
    FieldSpec::array("nav_angles"),
    FieldSpec::array("nav_dists"),
];

const ARM_COMMAND_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("command_type", FieldKind::Text),
    FieldSpec::defaulted("x", 0.0),
    FieldSpec::defaulted("y", 0.0),
    FieldSpec::defaulted("z", 0.0),
    FieldSpec::defaulted("roll", 0.0),
    FieldSpec::defaulted("pitch", 0.0),
    FieldSpec::defaulted("yaw", 0.0),
    FieldSpec::defaulted("max_velocity", 0.0),
    FieldSpec::array("joint_angles"),
    FieldSpec::array("delta_joints"),
    FieldSpec::generated("command_id", FieldKind::Text, Generated::CommandId),
    FieldSpec::generated("timestamp", FieldKind::TimestampMillis, Generated::WallClock),
];

const ROVER_COMMAND_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("throttle", FieldKind::Float),
    FieldSpec::required("brake", FieldKind::Float),
    FieldSpec::required("steering_angle", FieldKind::Float),
    FieldSpec::generated("timestamp", FieldKind::TimestampMillis, Generated::WallClock),
    FieldSpec::generated("command_id", FieldKind::Text, Generated::CommandId),
];

/// Direction of travel of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Command,
    Telemetry,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Command => "command",
            MessageKind::Telemetry => "telemetry",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one of the four wire schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaName {
    ArmTelemetry,
    RoverTelemetry,
    ArmCommand,
    RoverCommand,
}

impl SchemaName {
    pub const ALL: [SchemaName; 4] = [
        SchemaName::ArmTelemetry,
        SchemaName::RoverTelemetry,
        SchemaName::ArmCommand,
        SchemaName::RoverCommand,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaName::ArmTelemetry => "arm_telemetry",
            SchemaName::RoverTelemetry => "rover_telemetry",
            SchemaName::ArmCommand => "arm_command",
            SchemaName::RoverCommand => "rover_command",
        }
    }

    pub fn message_kind(self) -> MessageKind {
        match self {
            SchemaName::ArmTelemetry | SchemaName::RoverTelemetry => MessageKind::Telemetry,
            SchemaName::ArmCommand | SchemaName::RoverCommand => MessageKind::Command,
        }
    }

    /// Ordered field model. The order is the column order on the wire.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            SchemaName::ArmTelemetry => ARM_TELEMETRY_FIELDS,
            SchemaName::RoverTelemetry => ROVER_TELEMETRY_FIELDS,
            SchemaName::ArmCommand => ARM_COMMAND_FIELDS,
            SchemaName::RoverCommand => ROVER_COMMAND_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }

    /// Whether text columns are padded with distinct rows before slicing, so
    /// peers with a low-cardinality heuristic keep them as plain UTF-8.
    pub fn pads_text_columns(self) -> bool {
        matches!(self, SchemaName::RoverCommand)
    }

    /// Arrow schema derived from the field model (memoized).
    pub fn arrow_schema(self) -> SchemaRef {
        static ARM_TELEMETRY: OnceLock<SchemaRef> = OnceLock::new();
        static ROVER_TELEMETRY: OnceLock<SchemaRef> = OnceLock::new();
        static ARM_COMMAND: OnceLock<SchemaRef> = OnceLock::new();
        static ROVER_COMMAND: OnceLock<SchemaRef> = OnceLock::new();

        let cell = match self {
            SchemaName::ArmTelemetry => &ARM_TELEMETRY,
            SchemaName::RoverTelemetry => &ROVER_TELEMETRY,
            SchemaName::ArmCommand => &ARM_COMMAND,
            SchemaName::RoverCommand => &ROVER_COMMAND,
        };
        cell.get_or_init(|| build_arrow_schema(self.fields())).clone()
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaName {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownSchema(s.to_string()))
    }
}

fn build_arrow_schema(fields: &[FieldSpec]) -> SchemaRef {
    let fields: Vec<Field> = fields
        .iter()
        .map(|spec| Field::new(spec.name, spec.kind.data_type(), spec.nullable()))
        .collect();
    Arc::new(Schema::new(fields))
}

/// JSON description of a schema, as served to clients that ask for it.
pub fn describe(schema: SchemaName) -> Value {
    let arrow_schema = schema.arrow_schema();
    let fields: Vec<Value> = arrow_schema
        .fields()
        .iter()
        .map(|f| {
            json!({
                "name": f.name(),
                "data_type": format!("{:?}", f.data_type()),
                "nullable": f.is_nullable(),
            })
        })
        .collect();

    json!({
        "schema_name": schema.as_str(),
        "message_type": schema.message_kind().as_str(),
        "fields": fields,
    })
}
