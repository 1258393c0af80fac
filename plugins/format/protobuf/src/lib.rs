pub mod proto;

use std::str::FromStr;

use prost::Message;
use streamhub_api::bigdecimal::BigDecimal;
use streamhub_api::value::decimal_text;
use streamhub_api::{
    BatchCodec, BlobRecord, CodecError, Encoding, FieldType, Record, RecordMeta, SchemaRef,
    TupleRecord, Value,
};

use proto::field_value::Kind;
use proto::record_entry::Payload;

// ---- Codec ----

/// Structured (protobuf) batch encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredCodec;

impl BatchCodec for StructuredCodec {
    fn encoding(&self) -> Encoding {
        Encoding::Structured
    }

    fn encode(&self, records: &[Record]) -> Result<Vec<u8>, CodecError> {
        let batch = proto::RecordBatch {
            entries: records.iter().map(to_entry).collect(),
        };
        let bytes = batch.encode_to_vec();
        tracing::trace!(records = records.len(), bytes = bytes.len(), "structured batch encoded");
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8], schema: Option<&SchemaRef>) -> Result<Vec<Record>, CodecError> {
        let batch = proto::RecordBatch::decode(bytes)
            .map_err(|e| CodecError::corrupt(format!("protobuf decode: {e}")))?;
        batch
            .entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| {
                from_entry(entry, schema).map_err(|e| match e {
                    CodecError::CorruptPayload(msg) => CodecError::corrupt(format!("entry {idx}: {msg}")),
                    other => other,
                })
            })
            .collect()
    }
}

// ---- Record → message ----

fn to_entry(record: &Record) -> proto::RecordEntry {
    let meta = record.meta();
    let payload = match record {
        Record::Tuple(tuple) => Payload::Tuple(proto::TupleData {
            values: tuple.values().iter().map(to_field_value).collect(),
        }),
        Record::Blob(blob) => Payload::Blob(blob.data().to_vec()),
    };
    proto::RecordEntry {
        shard_id: meta.shard_id.clone(),
        hash_key: meta.hash_key.clone(),
        partition_key: meta.partition_key.clone(),
        sequence: meta.sequence,
        system_time: meta.system_time,
        attributes: meta
            .attributes
            .iter()
            .map(|(key, value)| proto::Attribute {
                key: key.clone(),
                value: value.clone(),
            })
            .collect(),
        payload: Some(payload),
    }
}

fn to_field_value(value: &Value) -> proto::FieldValue {
    let kind = match value {
        Value::BigInt(v) => Some(Kind::Bigint(*v)),
        Value::String(s) => Some(Kind::Text(s.clone())),
        Value::Double(v) => Some(Kind::Double(*v)),
        Value::Boolean(v) => Some(Kind::Boolean(*v)),
        Value::Timestamp(v) => Some(Kind::Timestamp(*v)),
        Value::Decimal(d) => Some(Kind::Decimal(decimal_text(d))),
        Value::Null => None,
    };
    proto::FieldValue { kind }
}

// ---- Message → record ----

fn from_entry(entry: proto::RecordEntry, schema: Option<&SchemaRef>) -> Result<Record, CodecError> {
    let meta = RecordMeta {
        attributes: entry
            .attributes
            .into_iter()
            .map(|attr| (attr.key, attr.value))
            .collect(),
        shard_id: entry.shard_id,
        hash_key: entry.hash_key,
        partition_key: entry.partition_key,
        sequence: entry.sequence,
        system_time: entry.system_time,
    };

    let mut record = match entry.payload {
        Some(Payload::Tuple(data)) => {
            let schema = schema.ok_or(CodecError::MissingSchema)?;
            Record::Tuple(from_tuple(data, schema)?)
        }
        Some(Payload::Blob(data)) => Record::Blob(BlobRecord::new(data)),
        None => return Err(CodecError::corrupt("entry has no payload")),
    };
    *record.meta_mut() = meta;
    Ok(record)
}

fn from_tuple(data: proto::TupleData, schema: &SchemaRef) -> Result<TupleRecord, CodecError> {
    if data.values.len() != schema.len() {
        return Err(CodecError::corrupt(format!(
            "tuple has {} values, schema has {} fields",
            data.values.len(),
            schema.len()
        )));
    }

    let values = data
        .values
        .into_iter()
        .zip(schema.fields())
        .map(|(value, field)| {
            let value = match (value.kind, field.field_type) {
                (None, _) => Value::Null,
                (Some(Kind::Bigint(v)), FieldType::BigInt) => Value::BigInt(v),
                (Some(Kind::Text(s)), FieldType::String) => Value::String(s),
                (Some(Kind::Double(v)), FieldType::Double) => Value::Double(v),
                (Some(Kind::Boolean(v)), FieldType::Boolean) => Value::Boolean(v),
                (Some(Kind::Timestamp(v)), FieldType::Timestamp) => Value::Timestamp(v),
                (Some(Kind::Decimal(text)), FieldType::Decimal) => {
                    let decimal = BigDecimal::from_str(&text).map_err(|e| {
                        CodecError::corrupt(format!("field '{}': bad decimal '{text}': {e}", field.name))
                    })?;
                    Value::Decimal(decimal)
                }
                (Some(kind), expected) => {
                    return Err(CodecError::corrupt(format!(
                        "field '{}' expects {expected}, got {}",
                        field.name,
                        kind_name(&kind)
                    )));
                }
            };
            Ok(value)
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    TupleRecord::with_values(schema.clone(), values)
        .map_err(|e| CodecError::corrupt(format!("tuple does not match schema: {e}")))
}

fn kind_name(kind: &Kind) -> &'static str {
    match kind {
        Kind::Bigint(_) => "BIGINT",
        Kind::Text(_) => "STRING",
        Kind::Double(_) => "DOUBLE",
        Kind::Boolean(_) => "BOOLEAN",
        Kind::Timestamp(_) => "TIMESTAMP",
        Kind::Decimal(_) => "DECIMAL",
    }
}
