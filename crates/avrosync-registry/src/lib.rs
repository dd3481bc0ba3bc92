//! # avrosync-registry
//!
//! Schema cache and registration path for avrosync.
//!
//! ## Pieces
//! 1. **`RegistryClient`**: resolves subjects and versions into schema text
//!    and ids (`MemoryRegistryClient` in-process, `HttpRegistryClient` over
//!    HTTP with the `remote` feature)
//! 2. **`SchemaCache`**: `(subject, version)` and `id` indexes behind one lock
//! 3. **`Registry`**: registers subjects into the cache and hands out codecs
//! 4. **`SchemaCodec` / `GenericCodec`**: encode and decode wire envelopes
//!
//! ```ignore
//! let registry = Registry::new(Arc::new(client));
//! registry.register("orders.created", Version::All, Some(json_decoder::<Order>())).await?;
//!
//! let codec = registry.with_latest_schema("orders.created")?;
//! let bytes = codec.encode(&order)?;
//! let back: Order = codec.decode_as(&bytes)?;
//! ```

pub mod cache;
pub mod client;
pub mod codec;
pub mod config;
pub mod registry;
#[cfg(feature = "remote")]
pub mod remote;

pub use cache::{InsertOutcome, SchemaCache, SchemaEntry};
pub use client::{MemoryRegistryClient, RegisteredSchema, RegistryClient};
pub use codec::{GenericCodec, SchemaCodec};
pub use config::RegistryConfig;
pub use registry::Registry;

#[cfg(feature = "remote")]
pub use remote::HttpRegistryClient;
