//! Hand-written prost messages of the structured batch encoding.
//!
//! ```proto
//! message RecordBatch { repeated RecordEntry entries = 1; }
//! message RecordEntry {
//!   optional string shard_id = 1;
//!   optional string hash_key = 2;
//!   optional string partition_key = 3;
//!   optional int64 sequence = 4;
//!   optional int64 system_time = 5;
//!   repeated Attribute attributes = 6;
//!   oneof payload { TupleData tuple = 7; bytes blob = 8; }
//! }
//! message TupleData { repeated FieldValue values = 1; }
//! message FieldValue {
//!   oneof kind {
//!     int64 bigint = 1; string string = 2; double double = 3;
//!     bool boolean = 4; int64 timestamp = 5; string decimal = 6;
//!   }
//! }
//! message Attribute { string key = 1; string value = 2; }
//! ```

#[derive(Clone, PartialEq, prost::Message)]
pub struct RecordBatch {
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<RecordEntry>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RecordEntry {
    #[prost(string, optional, tag = "1")]
    pub shard_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub hash_key: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub partition_key: Option<String>,
    #[prost(int64, optional, tag = "4")]
    pub sequence: Option<i64>,
    #[prost(int64, optional, tag = "5")]
    pub system_time: Option<i64>,
    #[prost(message, repeated, tag = "6")]
    pub attributes: Vec<Attribute>,
    #[prost(oneof = "record_entry::Payload", tags = "7, 8")]
    pub payload: Option<record_entry::Payload>,
}

pub mod record_entry {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "7")]
        Tuple(super::TupleData),
        #[prost(bytes, tag = "8")]
        Blob(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TupleData {
    #[prost(message, repeated, tag = "1")]
    pub values: Vec<FieldValue>,
}

/// Unset `kind` is a null value.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FieldValue {
    #[prost(oneof = "field_value::Kind", tags = "1, 2, 3, 4, 5, 6")]
    pub kind: Option<field_value::Kind>,
}

pub mod field_value {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(int64, tag = "1")]
        Bigint(i64),
        #[prost(string, tag = "2")]
        Text(String),
        #[prost(double, tag = "3")]
        Double(f64),
        #[prost(bool, tag = "4")]
        Boolean(bool),
        #[prost(int64, tag = "5")]
        Timestamp(i64),
        /// Decimal in its exact textual form.
        #[prost(string, tag = "6")]
        Decimal(String),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Attribute {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}
