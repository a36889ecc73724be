use arrow::array::{Array, AsArray};
use arrow::datatypes::{Float64Type, UInt64Type};
use roboframe_schema::{
    Cell, FieldKind, FieldSpec, Record, RecordFields, Row, SchemaError, SchemaName,
    ARRAY_NULL_MARKER,
};
use tracing::{debug, warn};

use crate::error::{CodecError, Result};
use crate::frame::Frame;

/// A decoded value plus the per-field corruption found while decoding it.
///
/// Each entry of `corrupted` is a [`CodecError::PayloadCorruption`] for a
/// field that was dropped (treated as absent) while the rest of the record
/// was kept.
#[derive(Debug)]
pub struct Decoded<T> {
    pub record: T,
    pub corrupted: Vec<CodecError>,
}

impl<T> Decoded<T> {
    /// True when no field had to be dropped.
    pub fn is_clean(&self) -> bool {
        self.corrupted.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            record: f(self.record),
            corrupted: self.corrupted,
        }
    }
}

/// Decode row 0 of a frame into a typed record.
pub fn decode<R: RecordFields>(frame: &Frame) -> Result<Decoded<R>> {
    let decoded = decode_row(frame, R::SCHEMA)?;
    let record = R::from_row(&decoded.record)?;
    Ok(Decoded {
        record,
        corrupted: decoded.corrupted,
    })
}

/// Decode row 0 of a frame as the record kind named by `schema`.
pub fn decode_record(frame: &Frame, schema: SchemaName) -> Result<Decoded<Record>> {
    let decoded = decode_row(frame, schema)?;
    let record = Record::from_row(&decoded.record)?;
    Ok(Decoded {
        record,
        corrupted: decoded.corrupted,
    })
}

/// Read row 0 of a frame into a field row for `schema`.
///
/// Columns outside the schema are ignored. A missing column, or a column of
/// the wrong type, is a schema mismatch.
pub fn decode_row(frame: &Frame, schema: SchemaName) -> Result<Decoded<Row>> {
    match frame.num_rows() {
        0 => return Err(CodecError::MalformedFrame("frame has no rows".to_string())),
        1 => {}
        rows => warn!(schema = %schema, rows, "frame was not sliced to one row, reading row 0"),
    }

    let batch = frame.batch();
    let mut row = Row::new(schema);
    let mut corrupted = Vec::new();

    for spec in schema.fields() {
        let column = batch
            .column_by_name(spec.name)
            .ok_or_else(|| SchemaError::MissingField {
                schema,
                field: spec.name.to_string(),
            })?;

        let cell = match spec.kind {
            FieldKind::Float => read_float(column.as_ref(), spec)?.map(Cell::Float),
            FieldKind::Bool => read_bool(column.as_ref(), spec)?.map(Cell::Bool),
            FieldKind::TimestampMillis => {
                read_timestamp(column.as_ref(), spec)?.map(Cell::Timestamp)
            }
            FieldKind::Text => read_text(column.as_ref(), spec)?.map(Cell::Text),
            FieldKind::NumericArray => match read_text(column.as_ref(), spec)? {
                None => None,
                Some(text) if text == ARRAY_NULL_MARKER => None,
                Some(text) => match serde_json::from_str::<Vec<f64>>(&text) {
                    Ok(values) => Some(Cell::Array(values)),
                    Err(err) => {
                        warn!(schema = %schema, field = spec.name, error = %err, "dropping corrupt array field");
                        corrupted.push(CodecError::PayloadCorruption {
                            field: spec.name.to_string(),
                            reason: err.to_string(),
                        });
                        None
                    }
                },
            },
        };
        row.set(spec.name, cell);
    }

    debug!(schema = %schema, corrupted = corrupted.len(), "decoded frame row");
    Ok(Decoded {
        record: row,
        corrupted,
    })
}

fn type_mismatch(column: &dyn Array, spec: &FieldSpec) -> CodecError {
    SchemaError::KindMismatch {
        field: spec.name.to_string(),
        expected: spec.kind,
        found: format!("{:?}", column.data_type()),
    }
    .into()
}

fn read_float(column: &dyn Array, spec: &FieldSpec) -> Result<Option<f64>> {
    let array = column
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| type_mismatch(column, spec))?;
    Ok((!array.is_null(0)).then(|| array.value(0)))
}

fn read_bool(column: &dyn Array, spec: &FieldSpec) -> Result<Option<bool>> {
    let array = column
        .as_boolean_opt()
        .ok_or_else(|| type_mismatch(column, spec))?;
    Ok((!array.is_null(0)).then(|| array.value(0)))
}

/// Timestamps stay `u64` end to end; they never pass through `f64`.
fn read_timestamp(column: &dyn Array, spec: &FieldSpec) -> Result<Option<u64>> {
    let array = column
        .as_primitive_opt::<UInt64Type>()
        .ok_or_else(|| type_mismatch(column, spec))?;
    Ok((!array.is_null(0)).then(|| array.value(0)))
}

fn read_text(column: &dyn Array, spec: &FieldSpec) -> Result<Option<String>> {
    text_at(column, 0).ok_or_else(|| type_mismatch(column, spec))
}

/// Text at `index` of a Utf8, LargeUtf8 or dictionary-of-string column.
///
/// The outer `None` means the column is not a string column.
fn text_at(column: &dyn Array, index: usize) -> Option<Option<String>> {
    if let Some(array) = column.as_string_opt::<i32>() {
        return Some((!array.is_null(index)).then(|| array.value(index).to_string()));
    }
    if let Some(array) = column.as_string_opt::<i64>() {
        return Some((!array.is_null(index)).then(|| array.value(index).to_string()));
    }
    if let Some(dictionary) = column.as_any_dictionary_opt() {
        if column.is_null(index) {
            return Some(None);
        }
        let key = *dictionary.normalized_keys().get(index)?;
        return text_at(dictionary.values().as_ref(), key);
    }
    None
}
