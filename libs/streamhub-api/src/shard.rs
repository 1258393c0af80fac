use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

// ════════════════════════════════════════════════════════════════
//  Hash Key
// ════════════════════════════════════════════════════════════════

/// Position in the 128-bit hash-key space.
///
/// Text form is exactly 32 hex digits (any case on input, upper case on output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey(pub u128);

impl HashKey {
    pub const MIN: HashKey = HashKey(0);
    pub const MAX: HashKey = HashKey(u128::MAX);
    pub const HEX_LEN: usize = 32;

    pub fn parse(s: &str) -> Result<Self, RoutingError> {
        if s.len() != Self::HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RoutingError::InvalidHashKeyFormat(s.to_string()));
        }
        u128::from_str_radix(s, 16)
            .map(HashKey)
            .map_err(|_| RoutingError::InvalidHashKeyFormat(s.to_string()))
    }

    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        HashKey(u128::from_be_bytes(bytes))
    }
}

impl std::fmt::Display for HashKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032X}", self.0)
    }
}

impl std::str::FromStr for HashKey {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashKey::parse(s)
    }
}

impl Serialize for HashKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HashKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HashKey::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Half-open `[begin, end)` slice of the hash-key space.
///
/// A range ending at `HashKey::MAX` also owns `HashKey::MAX` itself,
/// so a topology can cover the whole space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRange {
    #[serde(rename = "BeginHashKey")]
    pub begin: HashKey,
    #[serde(rename = "EndHashKey")]
    pub end: HashKey,
}

impl HashRange {
    pub fn new(begin: HashKey, end: HashKey) -> Self {
        Self { begin, end }
    }

    pub fn full() -> Self {
        Self::new(HashKey::MIN, HashKey::MAX)
    }

    pub fn contains(&self, key: HashKey) -> bool {
        key >= self.begin && (key < self.end || (self.end == HashKey::MAX && key == HashKey::MAX))
    }

    /// Split the whole space into `n` contiguous ranges of (almost) equal width.
    pub fn split_even(n: usize) -> Vec<HashRange> {
        let n = n.max(1) as u128;
        let step = u128::MAX / n;
        (0..n)
            .map(|i| {
                let begin = HashKey(i * step);
                let end = if i + 1 == n { HashKey::MAX } else { HashKey((i + 1) * step) };
                HashRange::new(begin, end)
            })
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════
//  Shard State & Info
// ════════════════════════════════════════════════════════════════

/// Shard lifecycle: `Opening → Active → Closing → Closed`.
/// Split and merge create children in `Opening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShardState {
    Opening,
    Active,
    Closing,
    Closed,
}

impl ShardState {
    /// Whether the shard still accepts writes.
    pub fn is_writable(&self) -> bool {
        matches!(self, ShardState::Opening | ShardState::Active)
    }
}

impl std::fmt::Display for ShardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardState::Opening => f.write_str("OPENING"),
            ShardState::Active => f.write_str("ACTIVE"),
            ShardState::Closing => f.write_str("CLOSING"),
            ShardState::Closed => f.write_str("CLOSED"),
        }
    }
}

/// One shard as reported by shard management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShardInfo {
    pub shard_id: String,
    pub state: ShardState,
    #[serde(flatten)]
    pub range: HashRange,
    #[serde(default)]
    pub parent_shard_ids: Vec<String>,
}

impl ShardInfo {
    pub fn new(shard_id: impl Into<String>, state: ShardState, range: HashRange) -> Self {
        Self {
            shard_id: shard_id.into(),
            state,
            range,
            parent_shard_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_key_parses_fixed_width_hex() {
        let key = HashKey::parse("4FFFFFFFFFFFFFFD7FFFFFFFFFFFFFFD").unwrap();
        assert_eq!(key.0, 0x4FFFFFFFFFFFFFFD7FFFFFFFFFFFFFFD);
        assert_eq!(key.to_string(), "4FFFFFFFFFFFFFFD7FFFFFFFFFFFFFFD");
        assert_eq!(
            HashKey::parse("4fffffffffffffff7fffffffffffffff").unwrap().to_string(),
            "4FFFFFFFFFFFFFFF7FFFFFFFFFFFFFFF"
        );
    }

    #[test]
    fn hash_key_rejects_bad_input() {
        for bad in ["", "4F", "XYZFFFFFFFFFFFFD7FFFFFFFFFFFFFFD", "+FFFFFFFFFFFFFFD7FFFFFFFFFFFFFFD", "00000000000000000000000000000000F"] {
            assert!(
                matches!(HashKey::parse(bad), Err(RoutingError::InvalidHashKeyFormat(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn even_split_covers_space() {
        let ranges = HashRange::split_even(3);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].begin, HashKey::MIN);
        assert_eq!(ranges[0].end, ranges[1].begin);
        assert_eq!(ranges[1].end, ranges[2].begin);
        assert_eq!(ranges[2].end, HashKey::MAX);
        assert!(ranges[2].contains(HashKey::MAX));
        assert!(!ranges[0].contains(ranges[0].end));
    }

    #[test]
    fn shard_info_json_uses_service_names() {
        let info = ShardInfo::new("0", ShardState::Active, HashRange::full());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["ShardId"], "0");
        assert_eq!(json["State"], "ACTIVE");
        assert_eq!(json["BeginHashKey"], "00000000000000000000000000000000");
        assert_eq!(json["EndHashKey"], "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF");
        let back: ShardInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
