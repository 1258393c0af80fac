use std::future::Future;
use std::pin::Pin;

use crate::config::{CompressFormat, Encoding};
use crate::error::HubError;
use crate::shard::ShardInfo;

/// Fully qualified topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicRef {
    pub project: String,
    pub topic: String,
}

impl TopicRef {
    pub fn new(project: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            topic: topic.into(),
        }
    }
}

impl std::fmt::Display for TopicRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project, self.topic)
    }
}

/// Service call addressed by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Body: compression envelope of an encoded batch.
    /// Response: `PutRecordsResponse` JSON.
    PutRecords { topic: TopicRef, encoding: Encoding },
    /// Body: `GetRecordsRequest` JSON.
    /// Response: get-records frame (see `protocol`).
    GetRecords {
        topic: TopicRef,
        shard_id: String,
        encoding: Encoding,
    },
    /// Body: `GetCursorRequest` JSON. Response: `GetCursorResponse` JSON.
    GetCursor { topic: TopicRef, shard_id: String },
}

impl Endpoint {
    pub fn topic(&self) -> &TopicRef {
        match self {
            Endpoint::PutRecords { topic, .. }
            | Endpoint::GetRecords { topic, .. }
            | Endpoint::GetCursor { topic, .. } => topic,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Endpoint::PutRecords { .. } => "put_records",
            Endpoint::GetRecords { .. } => "get_records",
            Endpoint::GetCursor { .. } => "get_cursor",
        }
    }
}

/// Request/response primitive provided by the (external) HTTP layer.
///
/// Synchronous: network blocking lives in the transport, not in the core.
/// `compression` is the client's configured format; record payloads in
/// either direction are wrapped in an envelope of that format.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        endpoint: &Endpoint,
        body: &[u8],
        compression: CompressFormat,
    ) -> Result<Vec<u8>, HubError>;
}

/// Shard-management collaborator used by routing and readiness polling.
pub trait ShardInspector: Send + Sync {
    fn list_shard_states(
        &self,
        topic: &TopicRef,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShardInfo>, HubError>> + Send + '_>>;
}
