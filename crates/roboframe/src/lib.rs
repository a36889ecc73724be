//! Columnar Arrow framing for robot telemetry and command messages.
//!
//! roboframe turns one telemetry or command record into a one-row Arrow
//! record batch, serializes it to the Arrow IPC stream format, and carries it
//! across a text-only event channel inside a base64 envelope.
//!
//! # Crate Structure
//!
//! - [`schema`]: the four wire schemas, record types and the field model
//! - [`frame`]: column building, IPC serialization and record decoding
//! - [`envelope`]: text-safe envelopes and the encode/decode pipeline

/// Re-export schema types.
pub mod schema {
    pub use roboframe_schema::*;
}

/// Re-export frame types.
pub mod frame {
    pub use roboframe_frame::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use roboframe_envelope::*;
}
