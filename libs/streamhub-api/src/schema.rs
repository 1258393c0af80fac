use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

// ════════════════════════════════════════════════════════════════
//  Field Type
// ════════════════════════════════════════════════════════════════

/// Field types supported by tuple topics.
///
/// Serialized with the service's symbolic names (`BIGINT`, `STRING`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    /// 64-bit signed integer.
    #[serde(rename = "BIGINT")]
    BigInt,
    String,
    /// IEEE-754 64-bit float.
    Double,
    Boolean,
    /// Microseconds since epoch, 64-bit.
    Timestamp,
    /// Arbitrary precision, never coerced through a float.
    Decimal,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::BigInt => "BIGINT",
            FieldType::String => "STRING",
            FieldType::Double => "DOUBLE",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Decimal => "DECIMAL",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BIGINT" => Ok(FieldType::BigInt),
            "STRING" => Ok(FieldType::String),
            "DOUBLE" => Ok(FieldType::Double),
            "BOOLEAN" => Ok(FieldType::Boolean),
            "TIMESTAMP" => Ok(FieldType::Timestamp),
            "DECIMAL" => Ok(FieldType::Decimal),
            _ => Err(SchemaError::UnknownFieldType(s.to_string())),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Field & Schema
// ════════════════════════════════════════════════════════════════

/// One field of a record schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
        }
    }

    /// Shortcut: nullable field.
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, true)
    }

    /// Shortcut: non-nullable field.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, false)
    }
}

/// Ordered field list of a tuple topic.
///
/// Field position determines the value index in a `TupleRecord`.
/// Immutable once built; share it through [`SchemaRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
}

/// Shared read-only schema handle. Records reference, never copy, their schema.
pub type SchemaRef = Arc<Schema>;

impl Schema {
    /// Build a schema. Fails on a repeated field name.
    pub fn define(fields: Vec<Field>) -> Result<SchemaRef, SchemaError> {
        let mut by_name = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if by_name.insert(field.name.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateFieldName(field.name.clone()));
            }
        }
        Ok(Arc::new(Self { fields, by_name }))
    }

    /// Build a schema from parallel name / type / nullable lists.
    pub fn from_lists(
        names: &[&str],
        types: &[FieldType],
        nullables: &[bool],
    ) -> Result<SchemaRef, SchemaError> {
        if names.len() != types.len() || names.len() != nullables.len() {
            return Err(SchemaError::LengthMismatch {
                names: names.len(),
                types: types.len(),
                nullables: nullables.len(),
            });
        }
        let fields = names
            .iter()
            .zip(types)
            .zip(nullables)
            .map(|((name, ty), nullable)| Field::new(*name, *ty, *nullable))
            .collect();
        Self::define(fields)
    }

    /// Parse the JSON form used by the service: `{"fields":[{"name":..,"type":..}]}`.
    pub fn from_json(json: &str) -> Result<SchemaRef, crate::error::HubError> {
        #[derive(Deserialize)]
        struct Raw {
            fields: Vec<Field>,
        }
        let raw: Raw = serde_json::from_str(json)?;
        Ok(Self::define(raw.fields)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "fields": self.fields }).to_string()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_index(&self, name: &str) -> Result<usize, SchemaError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UnknownField(name.to_string()))
    }

    pub fn field(&self, index: usize) -> Result<&Field, SchemaError> {
        self.fields.get(index).ok_or(SchemaError::IndexOutOfRange {
            index,
            len: self.fields.len(),
        })
    }

    pub fn field_by_name(&self, name: &str) -> Result<&Field, SchemaError> {
        let index = self.field_index(name)?;
        self.field(index)
    }

    /// Resolve a name-or-index reference to a field position.
    pub fn resolve(&self, field: FieldRef<'_>) -> Result<usize, SchemaError> {
        match field {
            FieldRef::Index(index) => self.field(index).map(|_| index),
            FieldRef::Name(name) => self.field_index(name),
        }
    }
}

/// Field reference by position or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for FieldRef<'_> {
    fn from(index: usize) -> Self {
        FieldRef::Index(index)
    }
}

impl<'a> From<&'a str> for FieldRef<'a> {
    fn from(name: &'a str) -> Self {
        FieldRef::Name(name)
    }
}
