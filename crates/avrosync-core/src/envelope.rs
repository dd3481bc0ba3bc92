//! The 5-byte-prefixed wire envelope.
//!
//! ```text
//! ┌──────────────┬───────────────────┬────────────────────────┐
//! │ magic (1B)   │ schema id (4B BE) │ Avro binary payload    │
//! │ always 0x00  │ unsigned 32-bit   │ variable length        │
//! └──────────────┴───────────────────┴────────────────────────┘
//! ```

use crate::error::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Leading byte of every envelope, reserved for format versioning.
pub const MAGIC_BYTE: u8 = 0x00;

/// Length of the magic byte plus the schema id.
pub const HEADER_LEN: usize = 5;

/// Start a buffer holding only the envelope header for `schema_id`.
///
/// `payload_hint` is the expected payload length, used to size the buffer.
pub fn header(schema_id: u32, payload_hint: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload_hint);
    buf.put_u8(MAGIC_BYTE);
    buf.put_u32(schema_id);
    buf
}

/// Wrap an already-encoded Avro payload in an envelope.
pub fn encode_envelope(schema_id: u32, payload: &[u8]) -> Bytes {
    let mut buf = header(schema_id, payload.len());
    buf.put_slice(payload);
    buf.freeze()
}

/// Split an envelope into its schema id and payload.
///
/// Only the length is checked; the magic byte is not validated so that a
/// future format revision does not turn into a hard decode failure here.
pub fn split_envelope(data: &[u8]) -> Result<(u32, &[u8]), CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::MalformedEnvelope { len: data.len() });
    }

    let mut id_bytes = &data[1..HEADER_LEN];
    let schema_id = id_bytes.get_u32();

    Ok((schema_id, &data[HEADER_LEN..]))
}
