//! Single-record columnar frames for robot telemetry and commands.
//!
//! A frame is one Arrow record batch holding exactly one logical record:
//! - [`ColumnBuilder`] turns a typed record into a frame
//! - [`serialize`] / [`deserialize`] move frames through the Arrow IPC
//!   streaming format (schema message, one batch, end-of-stream marker)
//! - [`decode`] reads row 0 of a frame back into a typed record
//!
//! Wall-clock reads and randomness go through the [`Clock`] and [`IdSource`]
//! capabilities so every operation can be made deterministic.

pub mod builder;
pub mod clock;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod frame;
mod guard;

pub use builder::{BuilderConfig, ColumnBuilder, DEFAULT_PADDING_ROWS};
pub use clock::{Clock, FixedClock, IdSource, RandomIds, SequentialIds, SystemClock};
pub use codec::{
    deserialize, deserialize_with_config, serialize, CodecConfig, DEFAULT_MAX_FRAME_SIZE,
    END_OF_STREAM,
};
pub use decoder::{decode, decode_record, decode_row, Decoded};
pub use error::{CodecError, Result};
pub use frame::Frame;
