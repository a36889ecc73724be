//! Field model and typed records for robot telemetry and motion commands.
//!
//! Every record kind has a fixed, ordered field list. The column builder and
//! the record decoder both consult it, so encode and decode agree on names,
//! kinds and defaults without re-deriving them:
//! - `arm_telemetry` / `rover_telemetry` flow from the robot to operators
//! - `arm_command` / `rover_command` flow from operators to actuators

pub mod error;
pub mod field;
pub mod model;
pub mod motion;
pub mod record;

pub use error::{Result, SchemaError};
pub use field::{Cell, FieldKind, FieldSpec, Generated, Presence, Row};
pub use model::{describe, MessageKind, SchemaName, ARRAY_NULL_MARKER};
pub use motion::{ArmCommandType, ArmMotion, DEFAULT_JOINT_COUNT};
pub use record::{
    ArmCommand, ArmTelemetry, Record, RecordFields, RoverCommand, RoverTelemetry,
};
