//! # avrosync-core
//!
//! Core types shared by every avrosync crate: the 5-byte wire envelope, the
//! error taxonomy, subjects and their decode capability, and compiled Avro
//! schemas. The schema cache, registry client, and sync engine are built on
//! top of the types defined here.

pub mod avro;
pub mod compiled;
pub mod envelope;
pub mod error;
pub mod subject;

pub use avro::{ApacheAvroConverter, AvroConverter};
pub use compiled::CompiledSchema;
pub use envelope::{encode_envelope, split_envelope, HEADER_LEN, MAGIC_BYTE};
pub use error::{CodecError, ConversionError, ConversionStage, RegistryError, SyncError, TransportError};
pub use subject::{downcast, json_decoder, DecodedValue, JsonDecoder, Subject, TypedDecoder, Version};
