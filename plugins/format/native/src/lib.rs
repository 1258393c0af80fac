//! Native tagged-binary batch encoding.
//!
//! ```text
//! batch   := u32 count, entry*
//! entry   := u8 kind, u8 hint_mask, lp-string*, u8 meta_mask, i64*, body
//! body    := tuple: null bitmap, present values, attrs | blob: lp-bytes, attrs
//! attrs   := u32 count, (lp-string, lp-string)*
//! ```
//!
//! Integers are big-endian, `lp-*` is a `u32` length followed by the bytes.
//! Field types are not on the wire: the decoder reads them from the schema.

mod reader;
mod writer;

use streamhub_api::{BatchCodec, CodecError, Encoding, Record, SchemaRef};

pub(crate) const KIND_TUPLE: u8 = 0;
pub(crate) const KIND_BLOB: u8 = 1;

pub(crate) const HINT_SHARD_ID: u8 = 0b001;
pub(crate) const HINT_HASH_KEY: u8 = 0b010;
pub(crate) const HINT_PARTITION_KEY: u8 = 0b100;

pub(crate) const META_SEQUENCE: u8 = 0b01;
pub(crate) const META_SYSTEM_TIME: u8 = 0b10;

// ---- Codec ----

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl BatchCodec for NativeCodec {
    fn encoding(&self) -> Encoding {
        Encoding::Native
    }

    fn encode(&self, records: &[Record]) -> Result<Vec<u8>, CodecError> {
        let bytes = writer::write_batch(records)?;
        tracing::trace!(records = records.len(), bytes = bytes.len(), "native batch encoded");
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8], schema: Option<&SchemaRef>) -> Result<Vec<Record>, CodecError> {
        reader::read_batch(bytes, schema)
    }
}
