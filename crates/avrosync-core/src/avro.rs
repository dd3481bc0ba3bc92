//! `AvroConverter`: moves values between JSON text, native Avro values, and
//! the Avro binary encoding for one compiled schema.

use crate::error::{ConversionError, ConversionStage};
use apache_avro::{types::Value, Schema};
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value as Json;

/// Converter capability of a compiled schema.
///
/// The trait is object-safe so compiled schemas can hold any backend as
/// `Box<dyn AvroConverter>`.
pub trait AvroConverter: Send + Sync {
    /// Parse JSON text into a native value conforming to the schema.
    fn text_to_native(&self, text: &[u8]) -> Result<Value, ConversionError>;

    /// Append the binary encoding of `native` to `prefix`.
    fn native_to_binary(&self, prefix: BytesMut, native: Value) -> Result<Bytes, ConversionError>;

    /// Read one native value from a binary payload.
    fn binary_to_native(&self, payload: &[u8]) -> Result<Value, ConversionError>;

    /// Render a native value back to JSON text.
    fn native_to_text(&self, native: Value) -> Result<Vec<u8>, ConversionError>;
}

/// `AvroConverter` backed by `apache-avro`.
#[derive(Debug, Clone)]
pub struct ApacheAvroConverter {
    schema: Schema,
}

impl ApacheAvroConverter {
    /// Parse and compile a schema definition.
    pub fn compile(schema_text: &str) -> Result<Self, apache_avro::Error> {
        Ok(Self {
            schema: Schema::parse_str(schema_text)?,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl AvroConverter for ApacheAvroConverter {
    fn text_to_native(&self, text: &[u8]) -> Result<Value, ConversionError> {
        let json: serde_json::Value = serde_json::from_slice(text)
            .map_err(|e| ConversionError::new(ConversionStage::TextToNative, e))?;

        // apache-avro narrows integers with `as` casts; reject what would wrap
        check_ranges(&json, &self.schema)
            .map_err(|e| ConversionError::new(ConversionStage::TextToNative, e))?;

        // JSON objects arrive as maps and numbers as int/long/double; resolving
        // against the schema turns them into records, enums, unions, etc.
        Value::from(json)
            .resolve(&self.schema)
            .map_err(|e| ConversionError::new(ConversionStage::TextToNative, e))
    }

    fn native_to_binary(
        &self,
        mut prefix: BytesMut,
        native: Value,
    ) -> Result<Bytes, ConversionError> {
        let payload = apache_avro::to_avro_datum(&self.schema, native)
            .map_err(|e| ConversionError::new(ConversionStage::NativeToBinary, e))?;
        prefix.put_slice(&payload);
        Ok(prefix.freeze())
    }

    fn binary_to_native(&self, payload: &[u8]) -> Result<Value, ConversionError> {
        let mut reader = payload;
        apache_avro::from_avro_datum(&self.schema, &mut reader, None)
            .map_err(|e| ConversionError::new(ConversionStage::BinaryToNative, e))
    }

    fn native_to_text(&self, native: Value) -> Result<Vec<u8>, ConversionError> {
        let json = serde_json::Value::try_from(native)
            .map_err(|e| ConversionError::new(ConversionStage::NativeToText, e))?;
        serde_json::to_vec(&json).map_err(|e| ConversionError::new(ConversionStage::NativeToText, e))
    }
}

/// Reject JSON integers that do not fit the Avro type they will resolve to:
/// anything above `i64::MAX`, and anything outside `i32` for `int` fields.
fn check_ranges(json: &Json, schema: &Schema) -> Result<(), String> {
    match (schema, json) {
        (_, Json::Number(n)) if n.is_u64() && !n.is_i64() => {
            Err(format!("{n} is out of range for a long"))
        }
        (Schema::Int, Json::Number(n)) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_err() => Err(format!("{i} is out of range for an int")),
            _ => Ok(()),
        },
        (Schema::Record(record), Json::Object(fields)) => {
            record.fields.iter().try_for_each(|field| match fields.get(&field.name) {
                Some(value) => check_ranges(value, &field.schema)
                    .map_err(|e| format!("field {}: {e}", field.name)),
                None => Ok(()),
            })
        }
        (Schema::Array(items), Json::Array(values)) => {
            values.iter().try_for_each(|v| check_ranges(v, items))
        }
        (Schema::Map(items), Json::Object(values)) => {
            values.values().try_for_each(|v| check_ranges(v, items))
        }
        (Schema::Union(union), _) => {
            // A union never narrows a scalar itself, but a record, map, or
            // array branch resolves its contents like any other field.
            let mut first_err = None;
            for variant in union.variants().iter().filter(|v| same_shape(v, json)) {
                match check_ranges(json, variant) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        first_err.get_or_insert(e);
                    }
                }
            }
            first_err.map_or(Ok(()), Err)
        }
        _ => Ok(()),
    }
}

fn same_shape(schema: &Schema, json: &Json) -> bool {
    matches!(
        (schema, json),
        (Schema::Record(_) | Schema::Map(_), Json::Object(_)) | (Schema::Array(_), Json::Array(_))
    )
}
