use std::str::FromStr;

use bytes::Buf;
use streamhub_api::bigdecimal::BigDecimal;
use streamhub_api::{
    Attributes, BlobRecord, CodecError, FieldType, Record, RecordMeta, SchemaRef, TupleRecord,
    Value,
};

use crate::{
    HINT_HASH_KEY, HINT_PARTITION_KEY, HINT_SHARD_ID, KIND_BLOB, KIND_TUPLE, META_SEQUENCE,
    META_SYSTEM_TIME,
};

/// Bounds-checked cursor over a batch. Every read fails with
/// `CorruptPayload` instead of running past the end.
struct Reader<'a> {
    cursor: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { cursor: bytes }
    }

    fn need(&self, n: usize, what: &str) -> Result<(), CodecError> {
        if self.cursor.remaining() < n {
            return Err(CodecError::corrupt(format!(
                "unexpected end of batch reading {what}: need {n} bytes, {} left",
                self.cursor.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8, CodecError> {
        self.need(1, what)?;
        Ok(self.cursor.get_u8())
    }

    fn u32(&mut self, what: &str) -> Result<u32, CodecError> {
        self.need(4, what)?;
        Ok(self.cursor.get_u32())
    }

    fn i64(&mut self, what: &str) -> Result<i64, CodecError> {
        self.need(8, what)?;
        Ok(self.cursor.get_i64())
    }

    fn f64(&mut self, what: &str) -> Result<f64, CodecError> {
        self.need(8, what)?;
        Ok(self.cursor.get_f64())
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], CodecError> {
        self.need(n, what)?;
        let (head, tail) = self.cursor.split_at(n);
        self.cursor = tail;
        Ok(head)
    }

    fn lp_bytes(&mut self, what: &str) -> Result<&'a [u8], CodecError> {
        let len = self.u32(what)? as usize;
        self.take(len, what)
    }

    fn lp_string(&mut self, what: &str) -> Result<String, CodecError> {
        let bytes = self.lp_bytes(what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::corrupt(format!("{what} is not valid UTF-8: {e}")))
    }

    fn is_empty(&self) -> bool {
        !self.cursor.has_remaining()
    }

    fn remaining(&self) -> usize {
        self.cursor.remaining()
    }
}

pub(crate) fn read_batch(bytes: &[u8], schema: Option<&SchemaRef>) -> Result<Vec<Record>, CodecError> {
    let mut reader = Reader::new(bytes);
    let count = reader.u32("record count")? as usize;
    // Each entry takes at least kind + two masks + attribute count.
    if count > reader.remaining() / 7 {
        return Err(CodecError::corrupt(format!(
            "record count {count} does not fit in {} bytes",
            reader.remaining()
        )));
    }

    let mut records = Vec::with_capacity(count);
    for idx in 0..count {
        let record = read_entry(&mut reader, schema)
            .map_err(|e| match e {
                CodecError::CorruptPayload(msg) => CodecError::corrupt(format!("entry {idx}: {msg}")),
                other => other,
            })?;
        records.push(record);
    }

    if !reader.is_empty() {
        return Err(CodecError::corrupt(format!(
            "{} trailing bytes after {count} entries",
            reader.remaining()
        )));
    }
    Ok(records)
}

fn read_entry(reader: &mut Reader<'_>, schema: Option<&SchemaRef>) -> Result<Record, CodecError> {
    let kind = reader.u8("entry kind")?;
    let mut meta = read_meta(reader)?;

    let mut record = match kind {
        KIND_TUPLE => {
            let schema = schema.ok_or(CodecError::MissingSchema)?;
            Record::Tuple(read_tuple(reader, schema)?)
        }
        KIND_BLOB => Record::Blob(BlobRecord::new(reader.lp_bytes("blob data")?)),
        other => return Err(CodecError::corrupt(format!("unknown entry kind {other}"))),
    };

    meta.attributes = read_attributes(reader)?;
    *record.meta_mut() = meta;
    Ok(record)
}

fn read_meta(reader: &mut Reader<'_>) -> Result<RecordMeta, CodecError> {
    let mut meta = RecordMeta::default();

    let hints = reader.u8("hint mask")?;
    if hints & !(HINT_SHARD_ID | HINT_HASH_KEY | HINT_PARTITION_KEY) != 0 {
        return Err(CodecError::corrupt(format!("unknown hint bits {hints:#04x}")));
    }
    if hints & HINT_SHARD_ID != 0 {
        meta.shard_id = Some(reader.lp_string("shard id")?);
    }
    if hints & HINT_HASH_KEY != 0 {
        meta.hash_key = Some(reader.lp_string("hash key")?);
    }
    if hints & HINT_PARTITION_KEY != 0 {
        meta.partition_key = Some(reader.lp_string("partition key")?);
    }

    let mask = reader.u8("meta mask")?;
    if mask & !(META_SEQUENCE | META_SYSTEM_TIME) != 0 {
        return Err(CodecError::corrupt(format!("unknown meta bits {mask:#04x}")));
    }
    if mask & META_SEQUENCE != 0 {
        meta.sequence = Some(reader.i64("sequence")?);
    }
    if mask & META_SYSTEM_TIME != 0 {
        meta.system_time = Some(reader.i64("system time")?);
    }
    Ok(meta)
}

fn read_tuple(reader: &mut Reader<'_>, schema: &SchemaRef) -> Result<TupleRecord, CodecError> {
    let bitmap = reader.take(schema.len().div_ceil(8), "null bitmap")?;
    let mut values = Vec::with_capacity(schema.len());

    for (i, field) in schema.fields().iter().enumerate() {
        let present = bitmap[i / 8] & (1 << (i % 8)) != 0;
        if !present {
            values.push(Value::Null);
            continue;
        }
        let value = match field.field_type {
            FieldType::BigInt => Value::BigInt(reader.i64(&field.name)?),
            FieldType::Timestamp => Value::Timestamp(reader.i64(&field.name)?),
            FieldType::Double => Value::Double(reader.f64(&field.name)?),
            FieldType::Boolean => match reader.u8(&field.name)? {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                other => {
                    return Err(CodecError::corrupt(format!(
                        "field '{}': boolean byte {other}",
                        field.name
                    )));
                }
            },
            FieldType::String => Value::String(reader.lp_string(&field.name)?),
            FieldType::Decimal => {
                let text = reader.lp_string(&field.name)?;
                let decimal = BigDecimal::from_str(&text).map_err(|e| {
                    CodecError::corrupt(format!("field '{}': bad decimal '{text}': {e}", field.name))
                })?;
                Value::Decimal(decimal)
            }
        };
        values.push(value);
    }

    // Padding bits past the last field must be clear.
    let used = schema.len() % 8;
    if used != 0 && bitmap[bitmap.len() - 1] >> used != 0 {
        return Err(CodecError::corrupt("null bitmap has bits past the last field"));
    }

    TupleRecord::with_values(schema.clone(), values)
        .map_err(|e| CodecError::corrupt(format!("tuple does not match schema: {e}")))
}

fn read_attributes(reader: &mut Reader<'_>) -> Result<Attributes, CodecError> {
    let count = reader.u32("attribute count")? as usize;
    let mut attributes = Attributes::new();
    for _ in 0..count {
        let key = reader.lp_string("attribute key")?;
        let value = reader.lp_string("attribute value")?;
        attributes.insert(key, value);
    }
    Ok(attributes)
}
