use std::io::Cursor;
use std::panic;

use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{CodecError, Result};
use crate::frame::Frame;
use crate::guard::check_stream;

/// Default maximum serialized frame size: 1 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Arrow IPC end-of-stream marker: continuation token + zero length.
pub const END_OF_STREAM: [u8; 8] = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00];

/// Configuration for the frame codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum accepted serialized frame size in bytes. Default: 1 MiB.
    pub max_frame_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Serialize a frame into the Arrow IPC streaming format.
///
/// Wire layout:
/// ```text
/// ┌────────────────┬──────────────────────┬────────────────────┐
/// │ Schema message │ Record batch message │ End of stream (8B) │
/// │ names + types  │ row count + buffers  │ 0xFFFFFFFF 0x0     │
/// └────────────────┴──────────────────────┴────────────────────┘
/// ```
pub fn serialize(frame: &Frame) -> Result<Bytes> {
    let batch = frame.batch();
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, &batch.schema())?;
        writer.write(batch)?;
        writer.finish()?;
    }

    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        bytes = buffer.len(),
        "serialized frame"
    );
    Ok(Bytes::from(buffer))
}

/// Deserialize a frame with the default [`CodecConfig`].
pub fn deserialize(bytes: &[u8]) -> Result<Frame> {
    deserialize_with_config(bytes, &CodecConfig::default())
}

/// Deserialize exactly one record batch from an Arrow IPC stream.
///
/// Empty, oversized, truncated, schema-less, batch-less, multi-batch and
/// zero-row input is rejected; no partial frame is ever returned.
pub fn deserialize_with_config(bytes: &[u8], config: &CodecConfig) -> Result<Frame> {
    if bytes.is_empty() {
        return Err(CodecError::MalformedFrame("empty input".to_string()));
    }
    if bytes.len() > config.max_frame_size {
        return Err(CodecError::MalformedFrame(format!(
            "frame too large ({} bytes, max {})",
            bytes.len(),
            config.max_frame_size
        )));
    }
    if !bytes.ends_with(&END_OF_STREAM) {
        return Err(CodecError::MalformedFrame(
            "truncated stream (missing end-of-stream marker)".to_string(),
        ));
    }

    check_stream(bytes)?;

    // The walk above bounds every length the reader trusts; a panic inside
    // arrow is still reported as a malformed frame.
    let batch = panic::catch_unwind(|| read_single_batch(bytes)).map_err(|_| {
        warn!(bytes = bytes.len(), "arrow ipc reader panicked on frame");
        CodecError::MalformedFrame("frame rejected by ipc reader".to_string())
    })??;

    if batch.num_rows() == 0 {
        return Err(CodecError::MalformedFrame("frame has no rows".to_string()));
    }

    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        bytes = bytes.len(),
        "deserialized frame"
    );
    Ok(Frame::new(batch))
}

fn read_single_batch(bytes: &[u8]) -> Result<RecordBatch> {
    let mut reader = StreamReader::try_new(Cursor::new(bytes), None).map_err(malformed)?;

    let batch = match reader.next() {
        Some(Ok(batch)) => batch,
        Some(Err(err)) => return Err(malformed(err)),
        None => {
            return Err(CodecError::MalformedFrame(
                "stream contains no record batch".to_string(),
            ))
        }
    };

    match reader.next() {
        None => Ok(batch),
        Some(Ok(_)) => Err(CodecError::MalformedFrame(
            "stream contains more than one record batch".to_string(),
        )),
        Some(Err(err)) => Err(malformed(err)),
    }
}

fn malformed(err: impl std::fmt::Display) -> CodecError {
    CodecError::MalformedFrame(err.to_string())
}
