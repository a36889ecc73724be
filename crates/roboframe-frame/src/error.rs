use arrow::error::ArrowError;
use roboframe_schema::SchemaError;

/// Errors that can occur while building, serializing or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The record or frame does not agree with the field model.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaError),

    /// A value cannot be stored in its declared column kind.
    #[error("cannot encode field `{field}`: {reason}")]
    FieldEncoding { field: String, reason: String },

    /// The bytes are not a complete, self-describing single-record frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A JSON-encoded array cell could not be parsed.
    #[error("corrupt payload in field `{field}`: {reason}")]
    PayloadCorruption { field: String, reason: String },

    /// The columnar library rejected an otherwise valid operation.
    #[error("columnar encoding error: {0}")]
    Arrow(#[from] ArrowError),
}

impl CodecError {
    pub(crate) fn field_encoding(field: &str, reason: impl Into<String>) -> Self {
        CodecError::FieldEncoding {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
