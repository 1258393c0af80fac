use crate::config::Encoding;
use crate::error::CodecError;
use crate::record::Record;
use crate::schema::SchemaRef;

/// Batch serializer: `[Record] ↔ bytes` for one wire encoding.
///
/// - `encode()` serializes a homogeneous batch (all tuples or all blobs).
///   Routing hints, attributes and read-back metadata travel with each record.
/// - `decode()` parses a batch. Tuple payloads need the topic schema;
///   without one the codec fails with `MissingSchema`. Malformed input is
///   always reported as `CorruptPayload`, never silently truncated.
///
/// Both encodings decode to field-for-field identical records.
pub trait BatchCodec: Send + Sync {
    fn encoding(&self) -> Encoding;
    fn encode(&self, records: &[Record]) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8], schema: Option<&SchemaRef>) -> Result<Vec<Record>, CodecError>;
}
