use crate::field::FieldKind;
use crate::model::SchemaName;

/// Errors raised when a record or row does not agree with its field model.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema name is not one of the known record schemas.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// A field outside the schema's expected set was presented.
    #[error("field `{field}` is not part of schema {schema}")]
    UnexpectedField { schema: SchemaName, field: String },

    /// A required field was not presented.
    #[error("schema {schema} requires field `{field}`")]
    MissingField { schema: SchemaName, field: String },

    /// A field carried a value (or column) of the wrong kind.
    #[error("field `{field}` expected {expected}, found {found}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        found: String,
    },

    /// A JSON record could not be mapped onto the schema.
    #[error("record does not match schema {schema}: {message}")]
    InvalidRecord { schema: SchemaName, message: String },

    /// The arm command type string is not recognized.
    #[error("unknown arm command type: {0}")]
    UnknownCommandType(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
