use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::field::{Cell, Row};
use crate::model::SchemaName;
use crate::motion::{ArmCommandType, ArmMotion, DEFAULT_JOINT_COUNT};

/// Mapping between a typed record and its flat field row.
pub trait RecordFields: Sized {
    const SCHEMA: SchemaName;

    fn to_row(&self) -> Row;

    fn from_row(row: &Row) -> Result<Self>;
}

/// Arm state reported by the simulator or hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArmTelemetry {
    /// End effector pose `[x, y, z, roll, pitch, yaw]`.
    pub end_effector_pose: [f64; 6],
    pub is_moving: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Producer of the sample, e.g. `unity_simulation`.
    pub source: String,
    #[serde(default)]
    pub joint_angles: Option<Vec<f64>>,
    #[serde(default)]
    pub joint_velocities: Option<Vec<f64>>,
}

const POSE_COLUMNS: [&str; 6] = [
    "end_effector_x",
    "end_effector_y",
    "end_effector_z",
    "end_effector_roll",
    "end_effector_pitch",
    "end_effector_yaw",
];

impl RecordFields for ArmTelemetry {
    const SCHEMA: SchemaName = SchemaName::ArmTelemetry;

    fn to_row(&self) -> Row {
        let mut row = Row::new(Self::SCHEMA);
        for (name, value) in POSE_COLUMNS.iter().zip(self.end_effector_pose) {
            row.set(*name, Some(Cell::Float(value)));
        }
        row.with("is_moving", Some(Cell::Bool(self.is_moving)))
            .with("timestamp", Some(Cell::Timestamp(self.timestamp)))
            .with("source", Some(Cell::Text(self.source.clone())))
            .with("joint_angles", self.joint_angles.clone().map(Cell::Array))
            .with(
                "joint_velocities",
                self.joint_velocities.clone().map(Cell::Array),
            )
    }

    fn from_row(row: &Row) -> Result<Self> {
        let mut end_effector_pose = [0.0; 6];
        for (slot, name) in end_effector_pose.iter_mut().zip(POSE_COLUMNS) {
            *slot = row.float(name)?;
        }
        Ok(Self {
            end_effector_pose,
            is_moving: row.flag("is_moving")?,
            timestamp: row.timestamp("timestamp")?,
            source: row.text("source")?,
            joint_angles: row.array("joint_angles")?,
            joint_velocities: row.array("joint_velocities")?,
        })
    }
}

/// Mobile base state reported by the simulator or hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoverTelemetry {
    /// Planar position `(x, y)` in meters.
    pub position: (f64, f64),
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Linear speed in m/s.
    pub velocity: f64,
    pub timestamp: u64,
    pub near_sample: bool,
    pub picking_up: bool,
    #[serde(default)]
    pub nav_angles: Option<Vec<f64>>,
    #[serde(default)]
    pub nav_dists: Option<Vec<f64>>,
}

impl RecordFields for RoverTelemetry {
    const SCHEMA: SchemaName = SchemaName::RoverTelemetry;

    fn to_row(&self) -> Row {
        Row::new(Self::SCHEMA)
            .with("position_x", Some(Cell::Float(self.position.0)))
            .with("position_y", Some(Cell::Float(self.position.1)))
            .with("yaw", Some(Cell::Float(self.yaw)))
            .with("pitch", Some(Cell::Float(self.pitch)))
            .with("roll", Some(Cell::Float(self.roll)))
            .with("velocity", Some(Cell::Float(self.velocity)))
            .with("timestamp", Some(Cell::Timestamp(self.timestamp)))
            .with("near_sample", Some(Cell::Bool(self.near_sample)))
            .with("picking_up", Some(Cell::Bool(self.picking_up)))
            .with("nav_angles", self.nav_angles.clone().map(Cell::Array))
            .with("nav_dists", self.nav_dists.clone().map(Cell::Array))
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            position: (row.float("position_x")?, row.float("position_y")?),
            yaw: row.float("yaw")?,
            pitch: row.float("pitch")?,
            roll: row.float("roll")?,
            velocity: row.float("velocity")?,
            timestamp: row.timestamp("timestamp")?,
            near_sample: row.flag("near_sample")?,
            picking_up: row.flag("picking_up")?,
            nav_angles: row.array("nav_angles")?,
            nav_dists: row.array("nav_dists")?,
        })
    }
}

/// Flat arm command as exchanged on the wire.
///
/// Scalars the command type does not use may be left unset; they are written
/// as `0.0`. `command_id` and `timestamp` are minted at build time when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArmCommand {
    #[serde(rename = "type", alias = "command_type")]
    pub command_type: ArmCommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_angles: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_joints: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl ArmCommand {
    /// A command of the given type with every other field unset.
    pub fn new(command_type: ArmCommandType) -> Self {
        Self {
            command_type,
            x: None,
            y: None,
            z: None,
            roll: None,
            pitch: None,
            yaw: None,
            max_velocity: None,
            joint_angles: None,
            delta_joints: None,
            command_id: None,
            timestamp: None,
        }
    }

    /// Controller-facing motion for this command.
    ///
    /// Unset pose scalars read as `0.0`; joint-space commands without angles
    /// read as all joints at zero.
    pub fn motion(&self) -> ArmMotion {
        let zeros = || vec![0.0; DEFAULT_JOINT_COUNT];
        match self.command_type {
            ArmCommandType::CartesianMove => ArmMotion::CartesianMove {
                x: self.x.unwrap_or(0.0),
                y: self.y.unwrap_or(0.0),
                z: self.z.unwrap_or(0.0),
                roll: self.roll.unwrap_or(0.0),
                pitch: self.pitch.unwrap_or(0.0),
                yaw: self.yaw.unwrap_or(0.0),
                max_velocity: self.max_velocity,
            },
            ArmCommandType::JointPosition => ArmMotion::JointPosition {
                joint_angles: self.joint_angles.clone().unwrap_or_else(zeros),
                max_velocity: self.max_velocity,
            },
            ArmCommandType::RelativeMove => ArmMotion::RelativeMove {
                delta_joints: self.delta_joints.clone().unwrap_or_else(zeros),
            },
            ArmCommandType::Stop => ArmMotion::Stop,
            ArmCommandType::Home => ArmMotion::Home,
            ArmCommandType::EmergencyStop => ArmMotion::EmergencyStop,
        }
    }
}

impl RecordFields for ArmCommand {
    const SCHEMA: SchemaName = SchemaName::ArmCommand;

    fn to_row(&self) -> Row {
        Row::new(Self::SCHEMA)
            .with(
                "command_type",
                Some(Cell::Text(self.command_type.as_str().to_string())),
            )
            .with("x", self.x.map(Cell::Float))
            .with("y", self.y.map(Cell::Float))
            .with("z", self.z.map(Cell::Float))
            .with("roll", self.roll.map(Cell::Float))
            .with("pitch", self.pitch.map(Cell::Float))
            .with("yaw", self.yaw.map(Cell::Float))
            .with("max_velocity", self.max_velocity.map(Cell::Float))
            .with("joint_angles", self.joint_angles.clone().map(Cell::Array))
            .with("delta_joints", self.delta_joints.clone().map(Cell::Array))
            .with("command_id", self.command_id.clone().map(Cell::Text))
            .with("timestamp", self.timestamp.map(Cell::Timestamp))
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            command_type: row.text("command_type")?.parse()?,
            x: row.opt_float("x")?,
            y: row.opt_float("y")?,
            z: row.opt_float("z")?,
            roll: row.opt_float("roll")?,
            pitch: row.opt_float("pitch")?,
            yaw: row.opt_float("yaw")?,
            max_velocity: row.opt_float("max_velocity")?,
            joint_angles: row.array("joint_angles")?,
            delta_joints: row.array("delta_joints")?,
            command_id: row.opt_text("command_id")?,
            timestamp: row.opt_timestamp("timestamp")?,
        })
    }
}

/// Throttle/brake/steering command for the mobile base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoverCommand {
    pub throttle: f64,
    pub brake: f64,
    pub steering_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl RoverCommand {
    pub fn new(throttle: f64, brake: f64, steering_angle: f64) -> Self {
        Self {
            throttle,
            brake,
            steering_angle,
            command_id: None,
            timestamp: None,
        }
    }

    /// Copy with inputs limited to actuator range: throttle to `[-1, 1]`,
    /// brake to `[0, 1]`, steering angle to `[-15, 15]` degrees.
    pub fn clamped(&self) -> Self {
        Self {
            throttle: self.throttle.clamp(-1.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
            steering_angle: self.steering_angle.clamp(-15.0, 15.0),
            ..self.clone()
        }
    }
}

impl RecordFields for RoverCommand {
    const SCHEMA: SchemaName = SchemaName::RoverCommand;

    fn to_row(&self) -> Row {
        Row::new(Self::SCHEMA)
            .with("throttle", Some(Cell::Float(self.throttle)))
            .with("brake", Some(Cell::Float(self.brake)))
            .with("steering_angle", Some(Cell::Float(self.steering_angle)))
            .with("timestamp", self.timestamp.map(Cell::Timestamp))
            .with("command_id", self.command_id.clone().map(Cell::Text))
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            throttle: row.float("throttle")?,
            brake: row.float("brake")?,
            steering_angle: row.float("steering_angle")?,
            command_id: row.opt_text("command_id")?,
            timestamp: row.opt_timestamp("timestamp")?,
        })
    }
}

/// Any of the four record kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    ArmTelemetry(ArmTelemetry),
    RoverTelemetry(RoverTelemetry),
    ArmCommand(ArmCommand),
    RoverCommand(RoverCommand),
}

impl Record {
    pub fn schema(&self) -> SchemaName {
        match self {
            Record::ArmTelemetry(_) => SchemaName::ArmTelemetry,
            Record::RoverTelemetry(_) => SchemaName::RoverTelemetry,
            Record::ArmCommand(_) => SchemaName::ArmCommand,
            Record::RoverCommand(_) => SchemaName::RoverCommand,
        }
    }

    pub fn to_row(&self) -> Row {
        match self {
            Record::ArmTelemetry(r) => r.to_row(),
            Record::RoverTelemetry(r) => r.to_row(),
            Record::ArmCommand(r) => r.to_row(),
            Record::RoverCommand(r) => r.to_row(),
        }
    }

    /// Rebuild a record from a row; the row's schema selects the kind.
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(match row.schema() {
            SchemaName::ArmTelemetry => Record::ArmTelemetry(ArmTelemetry::from_row(row)?),
            SchemaName::RoverTelemetry => Record::RoverTelemetry(RoverTelemetry::from_row(row)?),
            SchemaName::ArmCommand => Record::ArmCommand(ArmCommand::from_row(row)?),
            SchemaName::RoverCommand => Record::RoverCommand(RoverCommand::from_row(row)?),
        })
    }

    /// Parse a JSON object (e.g. built from operator input) as a record of
    /// the given schema. Unknown keys and missing required keys are rejected.
    pub fn from_json(schema: SchemaName, value: &Value) -> Result<Self> {
        let invalid = |err: serde_json::Error| SchemaError::InvalidRecord {
            schema,
            message: err.to_string(),
        };
        let value = value.clone();
        let record = match schema {
            SchemaName::ArmTelemetry => {
                Record::ArmTelemetry(serde_json::from_value(value).map_err(invalid)?)
            }
            SchemaName::RoverTelemetry => {
                Record::RoverTelemetry(serde_json::from_value(value).map_err(invalid)?)
            }
            SchemaName::ArmCommand => {
                Record::ArmCommand(serde_json::from_value(value).map_err(invalid)?)
            }
            SchemaName::RoverCommand => {
                Record::RoverCommand(serde_json::from_value(value).map_err(invalid)?)
            }
        };
        tracing::debug!(schema = %schema, "parsed record from json");
        Ok(record)
    }
}

impl From<ArmTelemetry> for Record {
    fn from(value: ArmTelemetry) -> Self {
        Record::ArmTelemetry(value)
    }
}

impl From<RoverTelemetry> for Record {
    fn from(value: RoverTelemetry) -> Self {
        Record::RoverTelemetry(value)
    }
}

impl From<ArmCommand> for Record {
    fn from(value: ArmCommand) -> Self {
        Record::ArmCommand(value)
    }
}

impl From<RoverCommand> for Record {
    fn from(value: RoverCommand) -> Self {
        Record::RoverCommand(value)
    }
}
