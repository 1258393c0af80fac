use bytes::{BufMut, BytesMut};
use streamhub_api::value::decimal_text;
use streamhub_api::{CodecError, Record, RecordMeta, Value};

use crate::{
    HINT_HASH_KEY, HINT_PARTITION_KEY, HINT_SHARD_ID, KIND_BLOB, KIND_TUPLE, META_SEQUENCE,
    META_SYSTEM_TIME,
};

pub(crate) fn write_batch(records: &[Record]) -> Result<Vec<u8>, CodecError> {
    let mut buf = BytesMut::with_capacity(64 * records.len() + 4);
    buf.put_u32(len_u32(records.len(), "record count")?);
    for record in records {
        write_entry(&mut buf, record)?;
    }
    Ok(buf.to_vec())
}

fn write_entry(buf: &mut BytesMut, record: &Record) -> Result<(), CodecError> {
    let kind = match record {
        Record::Tuple(_) => KIND_TUPLE,
        Record::Blob(_) => KIND_BLOB,
    };
    buf.put_u8(kind);
    write_meta(buf, record.meta())?;

    match record {
        Record::Tuple(tuple) => {
            let values = tuple.values();
            let mut bitmap = vec![0u8; values.len().div_ceil(8)];
            for (i, value) in values.iter().enumerate() {
                if !value.is_null() {
                    bitmap[i / 8] |= 1 << (i % 8);
                }
            }
            buf.put_slice(&bitmap);
            for value in values {
                write_value(buf, value)?;
            }
        }
        Record::Blob(blob) => put_lp(buf, blob.data())?,
    }

    let attributes = &record.meta().attributes;
    buf.put_u32(len_u32(attributes.len(), "attribute count")?);
    for (key, value) in attributes {
        put_lp(buf, key.as_bytes())?;
        put_lp(buf, value.as_bytes())?;
    }
    Ok(())
}

fn write_meta(buf: &mut BytesMut, meta: &RecordMeta) -> Result<(), CodecError> {
    let hints = [
        (HINT_SHARD_ID, &meta.shard_id),
        (HINT_HASH_KEY, &meta.hash_key),
        (HINT_PARTITION_KEY, &meta.partition_key),
    ];
    let mask = hints
        .iter()
        .filter(|(_, hint)| hint.is_some())
        .fold(0u8, |mask, (bit, _)| mask | bit);
    buf.put_u8(mask);
    for (_, hint) in hints {
        if let Some(s) = hint {
            put_lp(buf, s.as_bytes())?;
        }
    }

    let mut mask = 0u8;
    if meta.sequence.is_some() {
        mask |= META_SEQUENCE;
    }
    if meta.system_time.is_some() {
        mask |= META_SYSTEM_TIME;
    }
    buf.put_u8(mask);
    if let Some(seq) = meta.sequence {
        buf.put_i64(seq);
    }
    if let Some(time) = meta.system_time {
        buf.put_i64(time);
    }
    Ok(())
}

fn write_value(buf: &mut BytesMut, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::BigInt(v) | Value::Timestamp(v) => buf.put_i64(*v),
        Value::Double(v) => buf.put_f64(*v),
        Value::Boolean(v) => buf.put_u8(u8::from(*v)),
        Value::String(s) => put_lp(buf, s.as_bytes())?,
        Value::Decimal(d) => put_lp(buf, decimal_text(d).as_bytes())?,
        Value::Null => {}
    }
    Ok(())
}

fn put_lp(buf: &mut BytesMut, bytes: &[u8]) -> Result<(), CodecError> {
    buf.put_u32(len_u32(bytes.len(), "length prefix")?);
    buf.put_slice(bytes);
    Ok(())
}

fn len_u32(len: usize, what: &str) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::corrupt(format!("{what} {len} exceeds u32")))
}
