use std::time::Duration;

use crate::schema::FieldType;

/// Category of a client error. Lets callers decide between
/// fail fast, resubmit, or retry the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Duplicate/unknown field, type mismatch. Never retried.
    Schema,
    /// Corrupt payload, unsupported compression. Fatal for the batch.
    Codec,
    /// Invalid shard id or hash key, broken shard topology.
    Routing,
    /// Shard readiness wait expired or was cancelled.
    Lifecycle,
    /// Transport round trip failed.
    Transport,
    /// Service answered with an error code.
    Service,
    /// Malformed protocol message (JSON meta, response frame).
    Protocol,
    /// Invalid configuration.
    Config,
    /// Invalid call argument (empty batch, bad limit, ...).
    Argument,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Schema => f.write_str("schema"),
            ErrorKind::Codec => f.write_str("codec"),
            ErrorKind::Routing => f.write_str("routing"),
            ErrorKind::Lifecycle => f.write_str("lifecycle"),
            ErrorKind::Transport => f.write_str("transport"),
            ErrorKind::Service => f.write_str("service"),
            ErrorKind::Protocol => f.write_str("protocol"),
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Argument => f.write_str("argument"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate field name '{0}'")]
    DuplicateFieldName(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field index {index} out of range (schema has {len} fields)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("field '{0}' is not nullable")]
    NullNotAllowed(String),

    #[error("expected {expected} values, got {found}")]
    ValueCount { expected: usize, found: usize },

    #[error("schema lists differ in length: {names} names, {types} types, {nullables} nullables")]
    LengthMismatch {
        names: usize,
        types: usize,
        nullables: usize,
    },

    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("unsupported compression id {0}")]
    UnsupportedCompression(u8),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("tuple payload cannot be decoded without a schema")]
    MissingSchema,
}

impl CodecError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        CodecError::CorruptPayload(msg.into())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingError {
    #[error("Invalid shard id: {0}")]
    InvalidShardId(String),

    #[error("invalid hash key format '{0}': expected 32 hex digits")]
    InvalidHashKeyFormat(String),

    #[error("no shard owns hash key {0}")]
    NoShardForHashKey(String),

    #[error("invalid shard topology: {0}")]
    InvalidTopology(String),
}

/// Unified error type of the client core.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("routing: {0}")]
    Routing(#[from] RoutingError),

    #[error("shards of topic '{topic}' not ready after {waited:?}")]
    ShardNotReadyTimeout { topic: String, waited: Duration },

    #[error("readiness wait for topic '{0}' cancelled")]
    Cancelled(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("config: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),
}

impl HubError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        HubError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::Schema(_) => ErrorKind::Schema,
            HubError::Codec(_) => ErrorKind::Codec,
            HubError::Routing(_) => ErrorKind::Routing,
            HubError::ShardNotReadyTimeout { .. } | HubError::Cancelled(_) => ErrorKind::Lifecycle,
            HubError::Transport(_) => ErrorKind::Transport,
            HubError::Service { .. } => ErrorKind::Service,
            HubError::Protocol(_) => ErrorKind::Protocol,
            HubError::Config(_) => ErrorKind::Config,
            HubError::InvalidArgument(_) | HubError::InvalidBatch(_) => ErrorKind::Argument,
        }
    }

    /// Transport failures and expired readiness waits may succeed when
    /// the whole operation is repeated. A malformed payload never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HubError::Transport(_) | HubError::ShardNotReadyTimeout { .. }
        )
    }

    /// Add context to the error, keeping its variant where it carries a message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            HubError::Transport(msg) => HubError::Transport(format!("{ctx}: {msg}")),
            HubError::Protocol(msg) => HubError::Protocol(format!("{ctx}: {msg}")),
            HubError::Config(msg) => HubError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        HubError::Protocol(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            HubError::from(SchemaError::UnknownField("x".into())).kind(),
            ErrorKind::Schema
        );
        assert_eq!(
            HubError::from(CodecError::UnsupportedCompression(9)).kind(),
            ErrorKind::Codec
        );
        assert_eq!(
            HubError::from(RoutingError::InvalidShardId("-1".into())).kind(),
            ErrorKind::Routing
        );
        let timeout = HubError::ShardNotReadyTimeout {
            topic: "t".into(),
            waited: Duration::from_secs(1),
        };
        assert_eq!(timeout.kind(), ErrorKind::Lifecycle);
        assert!(timeout.is_retryable());
    }

    #[test]
    fn codec_errors_are_not_retryable() {
        let err = HubError::from(CodecError::corrupt("short buffer"));
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "codec: corrupt payload: short buffer");
    }

    #[test]
    fn invalid_shard_message_matches_service_wording() {
        let err = RoutingError::InvalidShardId("-1".into());
        assert_eq!(err.to_string(), "Invalid shard id: -1");
    }

    #[test]
    fn context_is_prepended() {
        let err = HubError::Transport("connection reset".into()).with_context("put_records");
        assert_eq!(err.to_string(), "transport: put_records: connection reset");
    }
}
