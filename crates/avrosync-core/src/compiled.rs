//! `CompiledSchema`: a subject together with its compiled converter.

use crate::avro::{ApacheAvroConverter, AvroConverter};
use crate::envelope;
use crate::error::{CodecError, ConversionError};
use crate::subject::{DecodedValue, Subject};
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use tracing::error;

pub struct CompiledSchema {
    subject: Subject,
    converter: Box<dyn AvroConverter>,
}

impl CompiledSchema {
    /// Compile the subject's schema text with the `apache-avro` backend.
    pub fn compile(subject: Subject) -> Result<Self, CodecError> {
        match ApacheAvroConverter::compile(&subject.schema) {
            Ok(converter) => Ok(Self::with_converter(subject, Box::new(converter))),
            Err(e) => {
                error!(
                    subject = %subject.name,
                    version = subject.version,
                    id = subject.id,
                    "cannot compile schema: {e}"
                );
                Err(CodecError::SchemaCompile {
                    subject: subject.name,
                    version: subject.version,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Pair a subject with an already-built converter.
    pub fn with_converter(subject: Subject, converter: Box<dyn AvroConverter>) -> Self {
        Self { subject, converter }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn id(&self) -> u32 {
        self.subject.id
    }

    /// The raw schema text.
    pub fn schema(&self) -> &str {
        &self.subject.schema
    }

    /// Encode `value` into a complete envelope tagged with this schema's id.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, CodecError> {
        let text = serde_json::to_vec(value).map_err(|source| {
            error!(subject = %self.subject.name, id = self.id(), "json marshal failed: {source}");
            CodecError::Marshal {
                subject: self.subject.name.clone(),
                id: self.id(),
                source,
            }
        })?;

        let native = self
            .converter
            .text_to_native(&text)
            .map_err(|e| self.conversion_error(e))?;

        let prefix = envelope::header(self.id(), text.len());
        self.converter
            .native_to_binary(prefix, native)
            .map_err(|e| self.conversion_error(e))
    }

    /// Convert an Avro binary payload (envelope header already stripped) to
    /// its JSON text form.
    pub fn payload_to_text(&self, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
        let native = self
            .converter
            .binary_to_native(payload)
            .map_err(|e| self.conversion_error(e))?;
        self.converter
            .native_to_text(native)
            .map_err(|e| self.conversion_error(e))
    }

    /// Convert a payload to text and hand it to the subject's decoder.
    pub fn decode_payload(&self, payload: &[u8]) -> Result<DecodedValue, CodecError> {
        let text = self.payload_to_text(payload)?;

        let decoder = self
            .subject
            .decoder
            .as_ref()
            .ok_or_else(|| CodecError::MissingDecoder {
                subject: self.subject.name.clone(),
                id: self.id(),
            })?;

        decoder.decode(&text).map_err(|reason| CodecError::Unmarshal {
            subject: self.subject.name.clone(),
            id: self.id(),
            reason,
        })
    }

    fn conversion_error(&self, e: ConversionError) -> CodecError {
        error!(subject = %self.subject.name, id = self.id(), stage = %e.stage, "{}", e.reason);
        CodecError::SchemaConversion {
            subject: self.subject.name.clone(),
            id: self.id(),
            stage: e.stage,
            reason: e.reason,
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
