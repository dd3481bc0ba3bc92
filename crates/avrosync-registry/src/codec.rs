//! Envelope codecs bound to the schema cache.
//!
//! A `SchemaCodec` encodes with one specific schema but decodes any envelope
//! whose id is in the cache, so a consumer holding the codec for version 1
//! can still read messages written with version 2.

use crate::cache::SchemaCache;
use avrosync_core::{
    downcast, envelope, error::CodecError, CompiledSchema, DecodedValue, Subject,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Resolve the schema named by an envelope's id.
fn resolve<'a>(cache: &SchemaCache, data: &'a [u8]) -> Result<(Arc<CompiledSchema>, &'a [u8]), CodecError> {
    let (id, payload) = envelope::split_envelope(data).map_err(|e| {
        error!(len = data.len(), "{e}");
        e
    })?;

    let schema = cache
        .lookup_by_id(id)
        .ok_or(CodecError::UnknownSchemaId { id })?;

    Ok((schema, payload))
}

fn decode_with(cache: &SchemaCache, data: &[u8]) -> Result<DecodedValue, CodecError> {
    let (schema, payload) = resolve(cache, data)?;
    schema.decode_payload(payload)
}

fn decode_json_with(cache: &SchemaCache, data: &[u8]) -> Result<serde_json::Value, CodecError> {
    let (schema, payload) = resolve(cache, data)?;
    let text = schema.payload_to_text(payload)?;
    serde_json::from_slice(&text).map_err(|e| CodecError::Unmarshal {
        subject: schema.subject().name.clone(),
        id: schema.id(),
        reason: e.to_string(),
    })
}

/// Encoder/decoder for one registered `(subject, version)`.
#[derive(Clone)]
pub struct SchemaCodec {
    schema: Arc<CompiledSchema>,
    cache: SchemaCache,
}

impl SchemaCodec {
    pub fn new(schema: Arc<CompiledSchema>, cache: SchemaCache) -> Self {
        Self { schema, cache }
    }

    /// Encode `value` into an envelope tagged with this codec's schema id.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, CodecError> {
        self.schema.encode(value)
    }

    /// Decode any envelope whose schema id is cached.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedValue, CodecError> {
        decode_with(&self.cache, data)
    }

    /// Decode and downcast to the type the subject's decoder produces.
    pub fn decode_as<T: 'static>(&self, data: &[u8]) -> Result<T, CodecError> {
        downcast(self.decode(data)?)
    }

    /// Decode to the JSON form without going through a decoder.
    pub fn decode_json(&self, data: &[u8]) -> Result<serde_json::Value, CodecError> {
        decode_json_with(&self.cache, data)
    }

    /// The raw schema text this codec encodes with.
    pub fn schema(&self) -> &str {
        self.schema.schema()
    }

    pub fn subject(&self) -> &Subject {
        self.schema.subject()
    }

    pub fn id(&self) -> u32 {
        self.schema.id()
    }

    pub fn version(&self) -> u32 {
        self.schema.subject().version
    }
}

/// Decode-only codec that is not bound to any schema.
#[derive(Clone)]
pub struct GenericCodec {
    cache: SchemaCache,
}

impl GenericCodec {
    pub fn new(cache: SchemaCache) -> Self {
        Self { cache }
    }

    /// Always fails: there is no schema to encode with.
    pub fn encode<T: Serialize + ?Sized>(&self, _value: &T) -> Result<Bytes, CodecError> {
        Err(CodecError::EncodeUnsupported)
    }

    pub fn decode(&self, data: &[u8]) -> Result<DecodedValue, CodecError> {
        decode_with(&self.cache, data)
    }

    pub fn decode_as<T: 'static>(&self, data: &[u8]) -> Result<T, CodecError> {
        downcast(self.decode(data)?)
    }

    pub fn decode_json(&self, data: &[u8]) -> Result<serde_json::Value, CodecError> {
        decode_json_with(&self.cache, data)
    }

    pub fn schema(&self) -> &str {
        "generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrosync_core::{encode_envelope, json_decoder};
    use serde::Deserialize;

    const V1: &str = r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"string"}]}"#;
    const V2: &str = r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"string"},{"name":"qty","type":"int","default":1}]}"#;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: String,
    }

    fn cache_with(entries: &[(&str, u32, u32, &str, bool)]) -> SchemaCache {
        let cache = SchemaCache::new();
        for &(name, version, id, text, decoder) in entries {
            let decoder = decoder.then(json_decoder::<Order>);
            let subject = Subject::new(name, version, id, text, decoder);
            cache.insert(CompiledSchema::compile(subject).unwrap()).unwrap();
        }
        cache
    }

    fn codec(cache: &SchemaCache, name: &str, version: u32) -> SchemaCodec {
        SchemaCodec::new(cache.lookup(name, version).unwrap(), cache.clone())
    }

    #[test]
    fn any_codec_decodes_any_cached_id() {
        let cache = cache_with(&[("orders", 1, 1, V1, true), ("orders", 2, 2, V2, true)]);
        let v1 = codec(&cache, "orders", 1);
        let v2 = codec(&cache, "orders", 2);

        let msg = v2.encode(&serde_json::json!({"id": "abc", "qty": 4})).unwrap();
        assert_eq!(&msg[1..5], &2u32.to_be_bytes());

        let order: Order = v1.decode_as(&msg).unwrap();
        assert_eq!(order, Order { id: "abc".into() });
    }

    #[test]
    fn unknown_id_is_reported() {
        let cache = cache_with(&[("orders", 1, 1, V1, true)]);
        let msg = encode_envelope(999, &[0x00]);
        assert!(matches!(
            codec(&cache, "orders", 1).decode(&msg),
            Err(CodecError::UnknownSchemaId { id: 999 })
        ));
    }

    #[test]
    fn decode_only_subject_still_yields_json() {
        let cache = cache_with(&[("orders", 1, 1, V1, false)]);
        let codec = codec(&cache, "orders", 1);
        let msg = codec.encode(&Order { id: "x".into() }).unwrap();

        assert!(matches!(codec.decode(&msg), Err(CodecError::MissingDecoder { .. })));
        assert_eq!(codec.decode_json(&msg).unwrap(), serde_json::json!({"id": "x"}));
    }

    #[test]
    fn generic_codec_decodes_but_never_encodes() {
        let cache = cache_with(&[("orders", 1, 1, V1, true)]);
        let msg = codec(&cache, "orders", 1).encode(&Order { id: "y".into() }).unwrap();

        let generic = GenericCodec::new(cache);
        assert_eq!(generic.schema(), "generic");
        assert_eq!(generic.decode_as::<Order>(&msg).unwrap(), Order { id: "y".into() });
        assert!(matches!(
            generic.encode(&Order { id: "y".into() }),
            Err(CodecError::EncodeUnsupported)
        ));
    }

    #[test]
    fn corrupt_payload_is_a_conversion_error() {
        let cache = cache_with(&[("orders", 1, 1, V1, true)]);
        let msg = encode_envelope(1, &[0x14]);
        assert!(matches!(
            codec(&cache, "orders", 1).decode(&msg),
            Err(CodecError::SchemaConversion { id: 1, .. })
        ));
    }
}
