//! Subjects, version selectors, and the decode capability attached to them.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The domain value produced by a `JsonDecoder`.
pub type DecodedValue = Box<dyn Any + Send + Sync>;

/// Turns the JSON text form of a decoded Avro value into a domain value.
///
/// Decoders are shared between versions of a subject: when the sync engine
/// installs a new version it reuses the decoder of the nearest older one.
pub trait JsonDecoder: Send + Sync {
    fn decode(&self, json: &[u8]) -> Result<DecodedValue, String>;
}

/// Blanket impl so closures can be used as decoders.
impl<F> JsonDecoder for F
where
    F: Fn(&[u8]) -> Result<DecodedValue, String> + Send + Sync,
{
    fn decode(&self, json: &[u8]) -> Result<DecodedValue, String> {
        self(json)
    }
}

/// Decoder that deserializes the JSON text into `T` with serde.
pub struct TypedDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonDecoder for TypedDecoder<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn decode(&self, json: &[u8]) -> Result<DecodedValue, String> {
        serde_json::from_slice::<T>(json)
            .map(|v| Box::new(v) as DecodedValue)
            .map_err(|e| e.to_string())
    }
}

/// Shorthand for a shared `TypedDecoder<T>`.
pub fn json_decoder<T>() -> Arc<dyn JsonDecoder>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Arc::new(TypedDecoder::<T>::new())
}

/// Downcast a decoded value into the concrete type the decoder produced.
pub fn downcast<T: 'static>(value: DecodedValue) -> Result<T, CodecError> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| CodecError::UnexpectedType {
            expected: std::any::type_name::<T>(),
        })
}

/// Which versions of a subject a registration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// A concrete version number.
    Number(u32),
    /// Whatever the registry reports as the newest version.
    Latest,
    /// Every version the registry knows for the subject.
    All,
}

impl From<u32> for Version {
    fn from(v: u32) -> Self {
        Self::Number(v)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Latest => write!(f, "Latest"),
            Self::All => write!(f, "All"),
        }
    }
}

/// A concrete, registered schema version. Immutable once constructed.
#[derive(Clone)]
pub struct Subject {
    /// Raw Avro schema text
    pub schema: String,
    /// Subject the schema is registered under
    pub name: String,
    /// Version within the subject
    pub version: u32,
    /// Registry-wide schema id, shared by identical schema text
    pub id: u32,
    /// `None` for encode-only subjects
    pub decoder: Option<Arc<dyn JsonDecoder>>,
}

impl Subject {
    pub fn new(
        name: impl Into<String>,
        version: u32,
        id: u32,
        schema: impl Into<String>,
        decoder: Option<Arc<dyn JsonDecoder>>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            version,
            id,
            decoder,
        }
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("id", &self.id)
            .field("has_decoder", &self.has_decoder())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Order {
        id: String,
    }

    #[test]
    fn version_display() {
        assert_eq!(Version::Number(4).to_string(), "4");
        assert_eq!(Version::Latest.to_string(), "Latest");
        assert_eq!(Version::All.to_string(), "All");
    }

    #[test]
    fn typed_decoder_round_trips_through_downcast() {
        let decoder = json_decoder::<Order>();
        let value = decoder.decode(br#"{"id":"abc"}"#).unwrap();
        let order: Order = downcast(value).unwrap();
        assert_eq!(order, Order { id: "abc".into() });
    }

    #[test]
    fn downcast_to_wrong_type_fails() {
        let decoder = json_decoder::<Order>();
        let value = decoder.decode(br#"{"id":"abc"}"#).unwrap();
        assert!(matches!(
            downcast::<String>(value),
            Err(CodecError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn closures_are_decoders() {
        let upper = |json: &[u8]| -> Result<DecodedValue, String> {
            Ok(Box::new(String::from_utf8_lossy(json).to_uppercase()))
        };
        let value = upper.decode(b"\"x\"").unwrap();
        assert_eq!(downcast::<String>(value).unwrap(), "\"X\"");
    }
}
