use bigdecimal::BigDecimal;

use crate::schema::FieldType;

/// Typed field value of a tuple record.
///
/// One variant per [`FieldType`], plus `Null`. No implicit widening:
/// a `BigInt` is never accepted for a `Double` field and vice versa.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    BigInt(i64),
    String(String),
    Double(f64),
    Boolean(bool),
    /// Microseconds since epoch.
    Timestamp(i64),
    /// Kept at full input precision.
    Decimal(BigDecimal),
    Null,
}

impl Value {
    /// Field type this value belongs to. `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::BigInt(_) => Some(FieldType::BigInt),
            Value::String(_) => Some(FieldType::String),
            Value::Double(_) => Some(FieldType::Double),
            Value::Boolean(_) => Some(FieldType::Boolean),
            Value::Timestamp(_) => Some(FieldType::Timestamp),
            Value::Decimal(_) => Some(FieldType::Decimal),
            Value::Null => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.field_type() {
            Some(ty) => ty.as_str(),
            None => "NULL",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::BigInt(v) | Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        Value::Decimal(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Text form of a decimal for the wire. Keeps the scale, so `0.000` stays
/// `0.000` and parses back with three fractional digits. A negative scale
/// is written in exponent form (`12E+3`).
pub fn decimal_text(d: &BigDecimal) -> String {
    let (digits, scale) = d.as_bigint_and_exponent();
    let digits = digits.to_string();
    let (sign, magnitude) = match digits.strip_prefix('-') {
        Some(magnitude) => ("-", magnitude),
        None => ("", digits.as_str()),
    };
    if scale < 0 {
        return format!("{sign}{magnitude}E+{}", scale.unsigned_abs());
    }
    let scale = scale as usize;
    if scale == 0 {
        return format!("{sign}{magnitude}");
    }
    let padded = format!("{magnitude:0>width$}", width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}
