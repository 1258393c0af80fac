use std::collections::BTreeMap;

use crate::error::SchemaError;
use crate::schema::{FieldRef, SchemaRef};
use crate::value::Value;

/// Free-form string attributes attached to a record. Keys are case-sensitive.
pub type Attributes = BTreeMap<String, String>;

// ════════════════════════════════════════════════════════════════
//  Routing hints & metadata
// ════════════════════════════════════════════════════════════════

/// Routing hint that decides where a record goes, after precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Shard(&'a str),
    HashKey(&'a str),
    PartitionKey(&'a str),
    /// No hint: the service picks a shard.
    Unassigned,
}

/// Everything a record carries besides its payload.
///
/// `sequence` and `system_time` are assigned by the service and only
/// present on records that were read back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMeta {
    pub attributes: Attributes,
    pub shard_id: Option<String>,
    pub hash_key: Option<String>,
    pub partition_key: Option<String>,
    pub sequence: Option<i64>,
    pub system_time: Option<i64>,
}

impl RecordMeta {
    /// Authoritative hint: `shard_id`, then `hash_key`, then `partition_key`.
    pub fn route(&self) -> Route<'_> {
        if let Some(shard) = &self.shard_id {
            Route::Shard(shard)
        } else if let Some(hash_key) = &self.hash_key {
            Route::HashKey(hash_key)
        } else if let Some(key) = &self.partition_key {
            Route::PartitionKey(key)
        } else {
            Route::Unassigned
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  TupleRecord
// ════════════════════════════════════════════════════════════════

/// Schema-typed record. Holds exactly one value per schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleRecord {
    schema: SchemaRef,
    values: Vec<Value>,
    pub meta: RecordMeta,
}

impl TupleRecord {
    /// Empty record: every field starts as `Null`.
    pub fn new(schema: SchemaRef) -> Self {
        let values = vec![Value::Null; schema.len()];
        Self {
            schema,
            values,
            meta: RecordMeta::default(),
        }
    }

    /// Record with all values set at once. Each value is type-checked.
    pub fn with_values(schema: SchemaRef, values: Vec<Value>) -> Result<Self, SchemaError> {
        if values.len() != schema.len() {
            return Err(SchemaError::ValueCount {
                expected: schema.len(),
                found: values.len(),
            });
        }
        for (idx, value) in values.iter().enumerate() {
            check_value(&schema, idx, value)?;
        }
        Ok(Self {
            schema,
            values,
            meta: RecordMeta::default(),
        })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn set_value<'a>(
        &mut self,
        field: impl Into<FieldRef<'a>>,
        value: impl Into<Value>,
    ) -> Result<(), SchemaError> {
        let idx = self.schema.resolve(field.into())?;
        let value = value.into();
        check_value(&self.schema, idx, &value)?;
        self.values[idx] = value;
        Ok(())
    }

    pub fn get_value<'a>(&self, field: impl Into<FieldRef<'a>>) -> Result<&Value, SchemaError> {
        let idx = self.schema.resolve(field.into())?;
        Ok(&self.values[idx])
    }

    pub fn put_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.attributes.insert(key.into(), value.into());
    }
}

fn check_value(schema: &SchemaRef, idx: usize, value: &Value) -> Result<(), SchemaError> {
    let field = schema.field(idx)?;
    match value.field_type() {
        None if field.nullable => Ok(()),
        None => Err(SchemaError::NullNotAllowed(field.name.clone())),
        Some(ty) if ty == field.field_type => Ok(()),
        Some(_) => Err(SchemaError::TypeMismatch {
            field: field.name.clone(),
            expected: field.field_type,
            found: value.type_name(),
        }),
    }
}

// ════════════════════════════════════════════════════════════════
//  BlobRecord
// ════════════════════════════════════════════════════════════════

/// Opaque byte-payload record. No schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    data: Vec<u8>,
    pub meta: RecordMeta,
}

impl BlobRecord {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            meta: RecordMeta::default(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn put_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.attributes.insert(key.into(), value.into());
    }
}

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// A record of either kind. Batches are homogeneous in kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Tuple(TupleRecord),
    Blob(BlobRecord),
}

impl Record {
    pub fn meta(&self) -> &RecordMeta {
        match self {
            Record::Tuple(r) => &r.meta,
            Record::Blob(r) => &r.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            Record::Tuple(r) => &mut r.meta,
            Record::Blob(r) => &mut r.meta,
        }
    }

    pub fn sequence(&self) -> Option<i64> {
        self.meta().sequence
    }

    pub fn system_time(&self) -> Option<i64> {
        self.meta().system_time
    }

    pub fn as_tuple(&self) -> Option<&TupleRecord> {
        match self {
            Record::Tuple(r) => Some(r),
            Record::Blob(_) => None,
        }
    }

    pub fn as_blob(&self) -> Option<&BlobRecord> {
        match self {
            Record::Blob(r) => Some(r),
            Record::Tuple(_) => None,
        }
    }
}

impl From<TupleRecord> for Record {
    fn from(r: TupleRecord) -> Self {
        Record::Tuple(r)
    }
}

impl From<BlobRecord> for Record {
    fn from(r: BlobRecord) -> Self {
        Record::Blob(r)
    }
}
