use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use roboframe_schema::{
    Cell, FieldKind, FieldSpec, Generated, Presence, Record, RecordFields, Row, SchemaError,
    SchemaName, ARRAY_NULL_MARKER,
};
use tracing::debug;

use crate::clock::{Clock, IdSource, RandomIds, SystemClock};
use crate::error::{CodecError, Result};
use crate::frame::Frame;

/// Default number of synthetic rows added to text columns before slicing.
pub const DEFAULT_PADDING_ROWS: usize = 3;

/// Configuration for the column builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Distinct synthetic rows appended to text columns of padded schemas.
    /// Zero disables padding.
    pub padding_rows: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            padding_rows: DEFAULT_PADDING_ROWS,
        }
    }
}

/// Builds single-row frames from records.
#[derive(Debug)]
pub struct ColumnBuilder<C = SystemClock, I = RandomIds> {
    clock: C,
    ids: I,
    config: BuilderConfig,
}

impl ColumnBuilder {
    /// Builder on the system clock and random identifiers.
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self::with_parts(SystemClock, RandomIds, config)
    }
}

impl Default for ColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock, I: IdSource> ColumnBuilder<C, I> {
    /// Builder on explicit clock and identifier capabilities.
    pub fn with_parts(clock: C, ids: I, config: BuilderConfig) -> Self {
        Self { clock, ids, config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Build the frame for a typed record.
    pub fn build<R: RecordFields>(&self, record: &R) -> Result<Frame> {
        self.build_row(&record.to_row())
    }

    pub fn build_record(&self, record: &Record) -> Result<Frame> {
        self.build_row(&record.to_row())
    }

    /// Build the frame for a raw field row.
    ///
    /// Every field of the row's schema becomes exactly one column, in model
    /// order. Unset defaulted fields take their default, unset generated
    /// fields are minted, unset arrays become the `"null"` marker.
    pub fn build_row(&self, row: &Row) -> Result<Frame> {
        let schema = row.schema();
        if let Some(unknown) = row.names().find(|name| schema.field(name).is_none()) {
            return Err(SchemaError::UnexpectedField {
                schema,
                field: unknown.to_string(),
            }
            .into());
        }

        let rows = if schema.pads_text_columns() {
            1 + self.config.padding_rows
        } else {
            1
        };
        let now_millis = self.clock.now_millis();

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        for spec in schema.fields() {
            let cell = self.resolve(schema, spec, row, now_millis)?;
            columns.push(self.column(spec, cell, rows)?);
        }

        let batch = RecordBatch::try_new(schema.arrow_schema(), columns)?;
        let batch = if batch.num_rows() > 1 {
            batch.slice(0, 1)
        } else {
            batch
        };

        debug!(schema = %schema, padded_rows = rows - 1, "built frame");
        Ok(Frame::new(batch))
    }

    fn resolve(
        &self,
        schema: SchemaName,
        spec: &FieldSpec,
        row: &Row,
        now_millis: u64,
    ) -> Result<Option<Cell>> {
        if let Some(Some(cell)) = row.get(spec.name) {
            return Ok(Some(cell.clone()));
        }

        let cell = match spec.presence {
            Presence::Required => {
                return Err(SchemaError::MissingField {
                    schema,
                    field: spec.name.to_string(),
                }
                .into())
            }
            Presence::Nullable => None,
            Presence::Default(value) => Some(Cell::Float(value)),
            Presence::Generated(Generated::CommandId) => Some(Cell::Text(self.ids.command_id())),
            Presence::Generated(Generated::WallClock) => Some(Cell::Timestamp(now_millis)),
        };
        Ok(cell)
    }

    fn column(&self, spec: &FieldSpec, cell: Option<Cell>, rows: usize) -> Result<ArrayRef> {
        let column: ArrayRef = match (spec.kind, cell) {
            (FieldKind::Float, Some(Cell::Float(value))) => {
                if !value.is_finite() {
                    return Err(CodecError::field_encoding(
                        spec.name,
                        format!("non-finite value {value}"),
                    ));
                }
                Arc::new(Float64Array::from(vec![value; rows]))
            }
            (FieldKind::Bool, Some(Cell::Bool(value))) => {
                Arc::new(BooleanArray::from(vec![value; rows]))
            }
            (FieldKind::TimestampMillis, Some(Cell::Timestamp(value))) => {
                Arc::new(UInt64Array::from(vec![value; rows]))
            }
            (FieldKind::Text, Some(Cell::Text(value))) => {
                Arc::new(StringArray::from(self.padded_text(value, rows)))
            }
            (FieldKind::NumericArray, Some(Cell::Array(values))) => {
                let text = encode_array(spec.name, &values)?;
                Arc::new(StringArray::from(vec![text; rows]))
            }
            (FieldKind::NumericArray, None) => {
                Arc::new(StringArray::from(vec![ARRAY_NULL_MARKER; rows]))
            }
            (kind, Some(other)) => {
                return Err(CodecError::field_encoding(
                    spec.name,
                    format!("expected {kind}, got {}", other.kind()),
                ))
            }
            (kind, None) => {
                return Err(CodecError::field_encoding(
                    spec.name,
                    format!("no value for {kind} column"),
                ))
            }
        };
        Ok(column)
    }

    /// Real value in row 0 followed by distinct synthetic values, so the
    /// column's distinct count always equals its length.
    fn padded_text(&self, value: String, rows: usize) -> Vec<String> {
        let mut values = Vec::with_capacity(rows);
        for index in 1..rows {
            values.push(format!(
                "{value}-{}-{:08x}-{index}",
                self.clock.now_nanos(),
                self.ids.suffix()
            ));
        }
        values.insert(0, value);
        values
    }
}

fn encode_array(field: &str, values: &[f64]) -> Result<String> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(CodecError::field_encoding(
            field,
            format!("non-finite array element {bad}"),
        ));
    }
    serde_json::to_string(values).map_err(|err| CodecError::field_encoding(field, err.to_string()))
}
