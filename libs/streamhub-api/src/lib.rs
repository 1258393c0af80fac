//! Shared vocabulary of the streamhub client: schemas, records, shard and
//! cursor types, the error taxonomy, and the seams (`BatchCodec`,
//! `Transport`, `ShardInspector`) the engine is assembled from.

pub mod batch;
pub mod config;
pub mod cursor;
pub mod error;
pub mod format;
pub mod protocol;
pub mod record;
pub mod schema;
pub mod shard;
pub mod transport;
pub mod value;

pub use bigdecimal;

pub use batch::{FailedRecord, GetRecordsResult, PutRecordsResult, RecordErrorCode};
pub use config::{ClientConfig, CompressFormat, Encoding, PartitionHashScheme};
pub use cursor::{Cursor, CursorInfo, CursorType};
pub use error::{CodecError, ErrorKind, HubError, RoutingError, SchemaError};
pub use format::BatchCodec;
pub use record::{Attributes, BlobRecord, Record, RecordMeta, Route, TupleRecord};
pub use schema::{Field, FieldRef, FieldType, Schema, SchemaRef};
pub use shard::{HashKey, HashRange, ShardInfo, ShardState};
pub use transport::{Endpoint, ShardInspector, TopicRef, Transport};
pub use value::Value;
