//! Error types for the avrosync encode/decode, registry, and sync pipelines.

use std::fmt;
use thiserror::Error;

/// Which converter step failed while moving a value between representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    /// JSON text → native Avro value
    TextToNative,
    /// native Avro value → binary payload
    NativeToBinary,
    /// binary payload → native Avro value
    BinaryToNative,
    /// native Avro value → JSON text
    NativeToText,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TextToNative => "text-to-native",
            Self::NativeToBinary => "native-to-binary",
            Self::BinaryToNative => "binary-to-native",
            Self::NativeToText => "native-to-text",
        };
        write!(f, "{s}")
    }
}

/// Failure reported by an `AvroConverter`. The compiled schema wrapping the
/// converter attaches subject and id before surfacing it as a `CodecError`.
#[derive(Debug, Error)]
#[error("{stage} failed: {reason}")]
pub struct ConversionError {
    pub stage: ConversionStage,
    pub reason: String,
}

impl ConversionError {
    pub fn new(stage: ConversionStage, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Errors that can occur while encoding or decoding a single message.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Cannot compile schema for {subject} v{version}: {reason}")]
    SchemaCompile {
        subject: String,
        version: u32,
        reason: String,
    },

    #[error("Cannot marshal value for {subject} (id {id}): {source}")]
    Marshal {
        subject: String,
        id: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot unmarshal value for {subject} (id {id}): {reason}")]
    Unmarshal {
        subject: String,
        id: u32,
        reason: String,
    },

    #[error("Schema conversion failed for {subject} (id {id}) at {stage}: {reason}")]
    SchemaConversion {
        subject: String,
        id: u32,
        stage: ConversionStage,
        reason: String,
    },

    #[error("Malformed envelope: {len} bytes, need at least 5")]
    MalformedEnvelope { len: usize },

    #[error("Schema id {id} is not registered")]
    UnknownSchemaId { id: u32 },

    #[error("No json decoder registered for {subject} (id {id})")]
    MissingDecoder { subject: String, id: u32 },

    #[error("Decoded value is not a {expected}")]
    UnexpectedType { expected: &'static str },

    #[error("Generic codec does not support encoding")]
    EncodeUnsupported,
}

impl CodecError {
    /// Short label for metric tags.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaCompile { .. } => "schema_compile",
            Self::Marshal { .. } => "marshal",
            Self::Unmarshal { .. } => "unmarshal",
            Self::SchemaConversion { .. } => "schema_conversion",
            Self::MalformedEnvelope { .. } => "malformed_envelope",
            Self::UnknownSchemaId { .. } => "unknown_schema_id",
            Self::MissingDecoder { .. } => "missing_decoder",
            Self::UnexpectedType { .. } => "unexpected_type",
            Self::EncodeUnsupported => "encode_unsupported",
        }
    }
}

/// Errors from the network side of the registry or the change-log.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, timeout, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The underlying stream or connection was closed.
    #[error("Transport closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Errors from the schema cache and the registration path.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Subject [{subject}][{}] is not registered", version.map(|v| v.to_string()).unwrap_or_else(|| "any".into()))]
    NotFound {
        subject: String,
        version: Option<u32>,
    },

    #[error("Schema id {id} for [{subject}][{version}] is already bound to [{existing_subject}][{existing_version}]")]
    IdConflict {
        id: u32,
        subject: String,
        version: u32,
        existing_subject: String,
        existing_version: u32,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Registry transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors from starting or running the background sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Change-log catch-up did not finish within {ms}ms")]
    StartupTimeout { ms: u64 },

    #[error("Change-log catch-up was cancelled")]
    Cancelled,

    #[error("Change-log stream stopped before catch-up: {reason}")]
    Interrupted { reason: String },

    #[error("Change-log transport error: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_includes_version() {
        let err = RegistryError::NotFound {
            subject: "orders.created".into(),
            version: Some(3),
        };
        assert_eq!(err.to_string(), "Subject [orders.created][3] is not registered");

        let err = RegistryError::NotFound {
            subject: "orders.created".into(),
            version: None,
        };
        assert_eq!(err.to_string(), "Subject [orders.created][any] is not registered");
    }

    #[test]
    fn conversion_error_carries_stage() {
        let err = ConversionError::new(ConversionStage::BinaryToNative, "unexpected eof");
        assert_eq!(err.to_string(), "binary-to-native failed: unexpected eof");
    }

    #[test]
    fn codec_error_kind_labels() {
        assert_eq!(CodecError::UnknownSchemaId { id: 9 }.kind(), "unknown_schema_id");
        assert_eq!(CodecError::MalformedEnvelope { len: 2 }.kind(), "malformed_envelope");
    }
}
