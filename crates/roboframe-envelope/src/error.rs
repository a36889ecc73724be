use roboframe_frame::CodecError;
use roboframe_schema::SchemaName;

/// Errors that can occur while wrapping, unwrapping or routing envelopes.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The envelope JSON does not match the envelope schema.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The `arrow_data` text is not valid base64.
    #[error("transport decoding failed: {0}")]
    TransportDecoding(#[from] base64::DecodeError),

    /// The envelope carries a different schema than the caller expected.
    #[error("expected schema {expected}, got {found}")]
    SchemaMismatch {
        expected: SchemaName,
        found: SchemaName,
    },

    /// Frame building, serialization or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The embedded envelope schema failed to compile.
    #[error("failed to compile envelope schema: {0}")]
    SchemaCompile(String),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
