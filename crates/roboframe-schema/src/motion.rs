use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Joint count assumed when a joint-space command arrives without angles.
pub const DEFAULT_JOINT_COUNT: usize = 6;

/// Arm command discriminator, carried in the `command_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmCommandType {
    CartesianMove,
    JointPosition,
    RelativeMove,
    Stop,
    Home,
    EmergencyStop,
}

impl ArmCommandType {
    pub const ALL: [ArmCommandType; 6] = [
        ArmCommandType::CartesianMove,
        ArmCommandType::JointPosition,
        ArmCommandType::RelativeMove,
        ArmCommandType::Stop,
        ArmCommandType::Home,
        ArmCommandType::EmergencyStop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArmCommandType::CartesianMove => "cartesian_move",
            ArmCommandType::JointPosition => "joint_position",
            ArmCommandType::RelativeMove => "relative_move",
            ArmCommandType::Stop => "stop",
            ArmCommandType::Home => "home",
            ArmCommandType::EmergencyStop => "emergency_stop",
        }
    }
}

impl fmt::Display for ArmCommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArmCommandType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArmCommandType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownCommandType(s.to_string()))
    }
}

/// Arm motion as the controller consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArmMotion {
    JointPosition {
        joint_angles: Vec<f64>,
        max_velocity: Option<f64>,
    },
    CartesianMove {
        x: f64,
        y: f64,
        z: f64,
        roll: f64,
        pitch: f64,
        yaw: f64,
        max_velocity: Option<f64>,
    },
    RelativeMove {
        delta_joints: Vec<f64>,
    },
    Stop,
    Home,
    EmergencyStop,
}

impl ArmMotion {
    /// True for motions that halt the arm.
    pub fn is_halt(&self) -> bool {
        matches!(self, ArmMotion::Stop | ArmMotion::EmergencyStop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_types_parse_from_wire_text() {
        for kind in ArmCommandType::ALL {
            assert_eq!(kind.as_str().parse::<ArmCommandType>().unwrap(), kind);
        }
        assert!(matches!(
            "wave".parse::<ArmCommandType>(),
            Err(SchemaError::UnknownCommandType(ref s)) if s == "wave"
        ));
    }

    #[test]
    fn serde_uses_wire_text() {
        let json = serde_json::to_string(&ArmCommandType::EmergencyStop).unwrap();
        assert_eq!(json, "\"emergency_stop\"");
    }

    #[test]
    fn halt_motions() {
        assert!(ArmMotion::EmergencyStop.is_halt());
        assert!(!ArmMotion::Home.is_halt());
    }
}
