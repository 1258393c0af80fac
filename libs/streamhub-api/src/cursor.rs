use serde::{Deserialize, Serialize};

/// Symbolic read position inside one shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Param", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CursorType {
    /// Earliest retained record.
    Oldest,
    /// Position after the newest record (the next write).
    Latest,
    /// Record with this sequence number.
    Sequence(i64),
    /// Earliest record whose system time (µs) is at or after this value.
    SystemTime(i64),
}

/// Opaque server-issued read position.
///
/// Compared by equality only; the client never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of resolving a [`CursorType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorInfo {
    pub cursor: Cursor,
    /// Sequence number the cursor addresses.
    pub sequence: i64,
    /// System time (µs) of the addressed record, `None` past the end.
    pub record_time: Option<i64>,
}
