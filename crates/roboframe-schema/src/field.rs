use std::fmt;

use arrow::datatypes::DataType;

use crate::error::{Result, SchemaError};
use crate::model::SchemaName;

/// Value kind of a single record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 64-bit float.
    Float,
    /// Boolean flag.
    Bool,
    /// UTF-8 text.
    Text,
    /// Milliseconds since the Unix epoch, unsigned 64-bit.
    TimestampMillis,
    /// Variable-length numeric array, carried as JSON text.
    NumericArray,
}

impl FieldKind {
    /// Arrow column type used on the wire for this kind.
    pub fn data_type(self) -> DataType {
        match self {
            FieldKind::Float => DataType::Float64,
            FieldKind::Bool => DataType::Boolean,
            FieldKind::Text | FieldKind::NumericArray => DataType::Utf8,
            FieldKind::TimestampMillis => DataType::UInt64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Text => "text",
            FieldKind::TimestampMillis => "timestamp_millis",
            FieldKind::NumericArray => "numeric_array",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Value minted by the builder when the record leaves the field unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    /// A fresh command identifier from the entropy source.
    CommandId,
    /// The wall clock, in milliseconds.
    WallClock,
}

/// Whether a field may be absent and what replaces it on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence {
    /// Must always be present.
    Required,
    /// Float field replaced by this value when absent.
    Default(f64),
    /// Filled by the builder when absent.
    Generated(Generated),
    /// Array field whose absence is carried as the `"null"` text marker.
    Nullable,
}

/// One entry of a record's field model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Required,
        }
    }

    pub const fn defaulted(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: FieldKind::Float,
            presence: Presence::Default(default),
        }
    }

    pub const fn generated(name: &'static str, kind: FieldKind, source: Generated) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Generated(source),
        }
    }

    pub const fn array(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::NumericArray,
            presence: Presence::Nullable,
        }
    }

    /// Arrow nullability declared for the column.
    ///
    /// Defaulted and array columns are declared nullable to match peers that
    /// built the schema that way; the builder still never writes a null.
    pub fn nullable(&self) -> bool {
        matches!(self.presence, Presence::Default(_) | Presence::Nullable)
    }
}

/// A single decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Float(f64),
    Bool(bool),
    Text(String),
    Timestamp(u64),
    Array(Vec<f64>),
}

impl Cell {
    pub fn kind(&self) -> FieldKind {
        match self {
            Cell::Float(_) => FieldKind::Float,
            Cell::Bool(_) => FieldKind::Bool,
            Cell::Text(_) => FieldKind::Text,
            Cell::Timestamp(_) => FieldKind::TimestampMillis,
            Cell::Array(_) => FieldKind::NumericArray,
        }
    }
}

/// Flat, ordered field values of one record, keyed by field name.
///
/// `None` marks a field the record left unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: SchemaName,
    entries: Vec<(String, Option<Cell>)>,
}

impl Row {
    pub fn new(schema: SchemaName) -> Self {
        Self {
            schema,
            entries: Vec::with_capacity(schema.fields().len()),
        }
    }

    pub fn schema(&self) -> SchemaName {
        self.schema
    }

    /// Set a field value, replacing an earlier entry with the same name.
    pub fn set(&mut self, name: impl Into<String>, cell: Option<Cell>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = cell,
            None => self.entries.push((name, cell)),
        }
    }

    /// Builder-style [`Row::set`].
    pub fn with(mut self, name: impl Into<String>, cell: Option<Cell>) -> Self {
        self.set(name, cell);
        self
    }

    /// Look up a field. The outer `None` means the name was never set.
    pub fn get(&self, name: &str) -> Option<&Option<Cell>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cell)| cell)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn cell(&self, name: &str) -> Option<&Cell> {
        self.get(name).and_then(Option::as_ref)
    }

    fn missing(&self, name: &str) -> SchemaError {
        SchemaError::MissingField {
            schema: self.schema,
            field: name.to_string(),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        self.opt_float(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_float(&self, name: &str) -> Result<Option<f64>> {
        match self.cell(name) {
            None => Ok(None),
            Some(Cell::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(name, FieldKind::Float, other)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.cell(name) {
            None => Err(self.missing(name)),
            Some(Cell::Bool(v)) => Ok(*v),
            Some(other) => Err(mismatch(name, FieldKind::Bool, other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<String> {
        self.opt_text(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<String>> {
        match self.cell(name) {
            None => Ok(None),
            Some(Cell::Text(v)) => Ok(Some(v.clone())),
            Some(other) => Err(mismatch(name, FieldKind::Text, other)),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<u64> {
        self.opt_timestamp(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn opt_timestamp(&self, name: &str) -> Result<Option<u64>> {
        match self.cell(name) {
            None => Ok(None),
            Some(Cell::Timestamp(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(name, FieldKind::TimestampMillis, other)),
        }
    }

    pub fn array(&self, name: &str) -> Result<Option<Vec<f64>>> {
        match self.cell(name) {
            None => Ok(None),
            Some(Cell::Array(v)) => Ok(Some(v.clone())),
            Some(other) => Err(mismatch(name, FieldKind::NumericArray, other)),
        }
    }
}

fn mismatch(name: &str, expected: FieldKind, found: &Cell) -> SchemaError {
    SchemaError::KindMismatch {
        field: name.to_string(),
        expected,
        found: found.kind().to_string(),
    }
}
