//! Structural checks on an Arrow IPC stream before the reader sees it.
//!
//! The arrow reader trusts the lengths a message declares: it allocates
//! `bodyLength` bytes up front, slices buffers without bounds checks and
//! panics on field types it cannot map. Every message prefix is walked
//! here first so a corrupted frame is rejected as [`CodecError::MalformedFrame`]
//! instead of taking the process down.

use arrow::ipc::{self as fb, root_as_message, MessageHeader};

use crate::error::{CodecError, Result};

const CONTINUATION: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Rows a single body byte can carry at most (one validity bit each).
const ROWS_PER_BODY_BYTE: usize = 8;

/// Buffer layout of one top-level column.
#[derive(Debug, Clone, Copy)]
struct Column {
    dictionary_id: Option<i64>,
    value_buffers: usize,
}

impl Column {
    /// Buffers the column occupies in a record batch message.
    fn batch_buffers(&self) -> usize {
        match self.dictionary_id {
            // validity + keys
            Some(_) => 2,
            None => self.value_buffers,
        }
    }
}

/// Walk every message of `bytes` and check it against the input it sits in.
///
/// Checks, per message: the metadata length fits, the flatbuffer verifies,
/// `bodyLength` fits in what follows, every buffer lies inside the body and
/// the row counts are bounded by the body size. The schema may only use
/// flat columns of types the decoder reads.
pub(crate) fn check_stream(bytes: &[u8]) -> Result<()> {
    let mut cursor = 0usize;
    let mut columns: Option<Vec<Column>> = None;

    loop {
        let (meta_len, meta_start) = read_prefix(bytes, cursor)?;
        if meta_len == 0 {
            if meta_start != bytes.len() {
                return Err(malformed(format!(
                    "{} trailing bytes after end-of-stream marker",
                    bytes.len() - meta_start
                )));
            }
            return match columns {
                Some(_) => Ok(()),
                None => Err(malformed("missing schema message")),
            };
        }

        let meta_end = fits(meta_start, meta_len, bytes.len())
            .ok_or_else(|| malformed(format!("message metadata length {meta_len} exceeds input")))?;
        let message = root_as_message(&bytes[meta_start..meta_end])
            .map_err(|err| malformed(format!("invalid message metadata: {err}")))?;

        let body_len = usize::try_from(message.bodyLength())
            .map_err(|_| malformed(format!("negative body length {}", message.bodyLength())))?;
        let body_end = fits(meta_end, body_len, bytes.len())
            .ok_or_else(|| malformed(format!("message body length {body_len} exceeds input")))?;

        match message.header_type() {
            MessageHeader::Schema => {
                if columns.is_some() {
                    return Err(malformed("stream carries a second schema message"));
                }
                let schema = message
                    .header_as_schema()
                    .ok_or_else(|| malformed("schema message without schema"))?;
                columns = Some(schema_columns(schema)?);
            }
            MessageHeader::RecordBatch => {
                let layout = columns.as_deref().ok_or_else(before_schema)?;
                let batch = message
                    .header_as_record_batch()
                    .ok_or_else(|| malformed("record batch message without batch"))?;
                let buffers = layout.iter().map(Column::batch_buffers).sum();
                check_batch(batch, body_len, layout.len(), buffers)?;
            }
            MessageHeader::DictionaryBatch => {
                let layout = columns.as_deref().ok_or_else(before_schema)?;
                let dictionary = message
                    .header_as_dictionary_batch()
                    .ok_or_else(|| malformed("dictionary message without batch"))?;
                let column = layout
                    .iter()
                    .find(|c| c.dictionary_id == Some(dictionary.id()))
                    .ok_or_else(|| malformed(format!("unknown dictionary id {}", dictionary.id())))?;
                let batch = dictionary
                    .data()
                    .ok_or_else(|| malformed("dictionary message without data"))?;
                check_batch(batch, body_len, 1, column.value_buffers)?;
            }
            other => {
                return Err(malformed(format!("unsupported message type {other:?}")));
            }
        }

        cursor = body_end;
    }
}

/// Read a message length prefix at `at`, with or without the continuation
/// token. Returns the metadata length and where the metadata starts.
fn read_prefix(bytes: &[u8], at: usize) -> Result<(usize, usize)> {
    let word = |pos: usize| -> Option<[u8; 4]> {
        bytes.get(pos..pos.checked_add(4)?)?.try_into().ok()
    };
    let truncated = || malformed(format!("truncated message prefix at byte {at}"));

    let first = word(at).ok_or_else(truncated)?;
    let (len, start) = if first == CONTINUATION {
        (word(at + 4).ok_or_else(truncated)?, at + 8)
    } else {
        (first, at + 4)
    };

    let declared = i32::from_le_bytes(len);
    let len = usize::try_from(declared)
        .map_err(|_| malformed(format!("negative message metadata length {declared}")))?;
    Ok((len, start))
}

fn schema_columns(schema: fb::Schema<'_>) -> Result<Vec<Column>> {
    let fields = schema
        .fields()
        .ok_or_else(|| malformed("schema message has no fields"))?;
    fields.iter().map(column).collect()
}

fn column(field: fb::Field<'_>) -> Result<Column> {
    let name = field
        .name()
        .ok_or_else(|| malformed("schema field without a name"))?;
    if field.children().is_some_and(|children| !children.is_empty()) {
        return Err(malformed(format!("nested column `{name}`")));
    }

    let value_buffers = match field.type_type() {
        fb::Type::Bool => 2,
        fb::Type::Int => {
            check_int(field.type_as_int(), name)?;
            2
        }
        fb::Type::FloatingPoint => {
            let precision = field.type_as_floating_point().map(|f| f.precision());
            if !matches!(
                precision,
                Some(fb::Precision::HALF | fb::Precision::SINGLE | fb::Precision::DOUBLE)
            ) {
                return Err(malformed(format!("invalid float precision for `{name}`")));
            }
            2
        }
        // validity + offsets + values
        fb::Type::Utf8 | fb::Type::LargeUtf8 => 3,
        other => {
            return Err(malformed(format!(
                "unsupported column type {other:?} for `{name}`"
            )))
        }
    };

    let dictionary_id = match field.dictionary() {
        Some(dictionary) => {
            check_int(dictionary.indexType(), name)?;
            Some(dictionary.id())
        }
        None => None,
    };

    Ok(Column {
        dictionary_id,
        value_buffers,
    })
}

fn check_int(int: Option<fb::Int<'_>>, name: &str) -> Result<()> {
    match int.map(|i| i.bitWidth()) {
        Some(8 | 16 | 32 | 64) => Ok(()),
        Some(width) => Err(malformed(format!("invalid integer width {width} for `{name}`"))),
        None => Err(malformed(format!("missing integer type for `{name}`"))),
    }
}

fn check_batch(
    batch: fb::RecordBatch<'_>,
    body_len: usize,
    expected_nodes: usize,
    expected_buffers: usize,
) -> Result<()> {
    if batch.compression().is_some() {
        return Err(malformed("compressed batches are not supported"));
    }

    let rows = usize::try_from(batch.length())
        .map_err(|_| malformed(format!("negative row count {}", batch.length())))?;
    if rows > body_len.saturating_mul(ROWS_PER_BODY_BYTE) {
        return Err(malformed(format!(
            "row count {rows} exceeds a {body_len} byte body"
        )));
    }

    let nodes = batch
        .nodes()
        .ok_or_else(|| malformed("batch without field nodes"))?;
    if nodes.len() != expected_nodes {
        return Err(malformed(format!(
            "batch has {} field nodes, schema has {expected_nodes} columns",
            nodes.len()
        )));
    }
    for node in nodes.iter() {
        let length = node.length();
        let null_count = node.null_count();
        if length < 0 || length > batch.length() || null_count < 0 || null_count > length {
            return Err(malformed(format!(
                "field node length {length} / nulls {null_count} out of range"
            )));
        }
    }

    let buffers = batch
        .buffers()
        .ok_or_else(|| malformed("batch without buffers"))?;
    if buffers.len() != expected_buffers {
        return Err(malformed(format!(
            "batch has {} buffers, expected {expected_buffers}",
            buffers.len()
        )));
    }
    for buffer in buffers.iter() {
        let in_body = usize::try_from(buffer.offset())
            .ok()
            .zip(usize::try_from(buffer.length()).ok())
            .and_then(|(offset, length)| fits(offset, length, body_len));
        if in_body.is_none() {
            return Err(malformed(format!(
                "buffer at offset {} length {} outside {body_len} byte body",
                buffer.offset(),
                buffer.length()
            )));
        }
    }

    Ok(())
}

/// End of `start..start + len` if it lies within `limit`.
fn fits(start: usize, len: usize, limit: usize) -> Option<usize> {
    start.checked_add(len).filter(|&end| end <= limit)
}

fn before_schema() -> CodecError {
    malformed("batch message before schema message")
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::MalformedFrame(reason.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, BooleanArray, Float64Array, ListArray, StringArray};
    use arrow::datatypes::{DataType, Field, Float64Type, Schema};
    use arrow::ipc::writer::StreamWriter;
    use arrow::record_batch::RecordBatch;

    use super::*;

    fn stream(columns: Vec<(&str, ArrayRef)>) -> Vec<u8> {
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let mut bytes = Vec::new();
        let mut writer = StreamWriter::try_new(&mut bytes, &batch.schema()).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();
        drop(writer);
        bytes
    }

    fn flat_stream() -> Vec<u8> {
        stream(vec![
            ("throttle", Arc::new(Float64Array::from(vec![0.8])) as ArrayRef),
            ("near_sample", Arc::new(BooleanArray::from(vec![true]))),
            ("command_id", Arc::new(StringArray::from(vec!["cmd-1"]))),
        ])
    }

    /// Offset of the second message (the record batch) in a stream.
    fn batch_message_offset(bytes: &[u8]) -> usize {
        let (meta_len, meta_start) = read_prefix(bytes, 0).unwrap();
        let message = root_as_message(&bytes[meta_start..meta_start + meta_len]).unwrap();
        meta_start + meta_len + message.bodyLength() as usize
    }

    fn assert_malformed(result: Result<()>, needle: &str) {
        match result {
            Err(CodecError::MalformedFrame(reason)) => {
                assert!(reason.contains(needle), "unexpected reason: {reason}")
            }
            other => panic!("expected MalformedFrame containing {needle:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_accepts_writer_output() {
        check_stream(&flat_stream()).unwrap();
    }

    #[test]
    fn test_rejects_body_length_past_input() {
        let mut bytes = flat_stream();
        let at = batch_message_offset(&bytes);
        let (meta_len, meta_start) = read_prefix(&bytes, at).unwrap();
        let mut meta = bytes[meta_start..meta_start + meta_len].to_vec();

        // Patch whichever 8-byte window holds bodyLength.
        let body = root_as_message(&meta).unwrap().bodyLength();
        let huge = 1_i64 << 57;
        let pos = (0..=meta.len() - 8)
            .filter(|&i| meta[i..i + 8] == body.to_le_bytes())
            .find(|&i| {
                let mut patched = meta.clone();
                patched[i..i + 8].copy_from_slice(&huge.to_le_bytes());
                root_as_message(&patched).is_ok_and(|m| m.bodyLength() == huge)
            })
            .unwrap();
        meta[pos..pos + 8].copy_from_slice(&huge.to_le_bytes());
        bytes[meta_start..meta_start + meta_len].copy_from_slice(&meta);

        assert_malformed(check_stream(&bytes), "body length");
    }

    #[test]
    fn test_rejects_oversized_metadata_length() {
        let mut bytes = flat_stream();
        let at = batch_message_offset(&bytes);
        bytes[at + 4..at + 8].copy_from_slice(&i32::MAX.to_le_bytes());
        assert_malformed(check_stream(&bytes), "metadata length");
    }

    #[test]
    fn test_rejects_negative_metadata_length() {
        let mut bytes = flat_stream();
        bytes[4..8].copy_from_slice(&(-8_i32).to_le_bytes());
        assert_malformed(check_stream(&bytes), "negative");
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = flat_stream();
        bytes.extend_from_slice(&[0u8; 8]);
        assert_malformed(check_stream(&bytes), "trailing");
    }

    #[test]
    fn test_rejects_nested_columns() {
        let list = ListArray::from_iter_primitive::<Float64Type, _, _>(vec![Some(vec![
            Some(1.0),
            Some(2.0),
        ])]);
        let bytes = stream(vec![("nav_angles", Arc::new(list) as ArrayRef)]);
        assert_malformed(check_stream(&bytes), "nested column");
    }

    #[test]
    fn test_rejects_missing_schema() {
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Float64, false)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Float64Array::from(vec![1.0])) as ArrayRef],
        )
        .unwrap();
        let mut bytes = Vec::new();
        let mut writer = StreamWriter::try_new(&mut bytes, &schema).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();
        drop(writer);

        let at = batch_message_offset(&bytes);
        assert_malformed(check_stream(&bytes[at..]), "before schema");
    }
}
