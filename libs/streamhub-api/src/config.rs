use std::time::Duration;

use serde::{Deserialize, Serialize};

use md5::{Digest, Md5};

use crate::error::CodecError;
use crate::shard::HashKey;

// ════════════════════════════════════════════════════════════════
//  Encoding & Compression
// ════════════════════════════════════════════════════════════════

/// Batch wire encoding. Chosen once per client, never mixed inside a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Tagged binary format with a per-record null bitmap.
    #[default]
    Native,
    /// Protobuf messages, for consumers expecting a standard wire format.
    #[serde(alias = "protobuf", alias = "pb")]
    Structured,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Native => f.write_str("native"),
            Encoding::Structured => f.write_str("structured"),
        }
    }
}

/// Compression applied to every serialized batch of a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressFormat {
    #[default]
    None,
    Lz4,
    Zlib,
    Deflate,
}

impl CompressFormat {
    pub const ALL: [CompressFormat; 4] = [
        CompressFormat::None,
        CompressFormat::Lz4,
        CompressFormat::Zlib,
        CompressFormat::Deflate,
    ];

    /// Identifier carried in the compression envelope.
    pub fn id(&self) -> u8 {
        match self {
            CompressFormat::None => 0,
            CompressFormat::Lz4 => 1,
            CompressFormat::Zlib => 2,
            CompressFormat::Deflate => 3,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, CodecError> {
        match id {
            0 => Ok(CompressFormat::None),
            1 => Ok(CompressFormat::Lz4),
            2 => Ok(CompressFormat::Zlib),
            3 => Ok(CompressFormat::Deflate),
            other => Err(CodecError::UnsupportedCompression(other)),
        }
    }
}

impl std::fmt::Display for CompressFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressFormat::None => f.write_str("none"),
            CompressFormat::Lz4 => f.write_str("lz4"),
            CompressFormat::Zlib => f.write_str("zlib"),
            CompressFormat::Deflate => f.write_str("deflate"),
        }
    }
}

/// Partition-key hashing contract. Must match the service bit for bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionHashScheme {
    /// MD5 of the key bytes, read as a big-endian 128-bit integer.
    #[default]
    Md5,
}

impl PartitionHashScheme {
    /// Hash a partition key into the 128-bit hash-key space.
    pub fn hash_key(&self, partition_key: &str) -> HashKey {
        match self {
            PartitionHashScheme::Md5 => {
                let digest = Md5::digest(partition_key.as_bytes());
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&digest);
                HashKey::from_be_bytes(bytes)
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  ClientConfig
// ════════════════════════════════════════════════════════════════

fn default_max_put_records() -> usize {
    1000
}

fn default_max_get_records() -> usize {
    1000
}

fn default_ready_timeout_ms() -> u64 {
    30_000
}

fn default_ready_poll_interval_ms() -> u64 {
    1_000
}

/// Per-client settings. Immutable once the client is built, so several
/// differently configured clients can live in one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service endpoint, handed to the transport as-is.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub compression: CompressFormat,
    #[serde(default)]
    pub partition_hash: PartitionHashScheme,
    /// Upper bound on records per put.
    #[serde(default = "default_max_put_records")]
    pub max_put_records: usize,
    /// Upper bound on `limit` per get.
    #[serde(default = "default_max_get_records")]
    pub max_get_records: usize,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_ready_poll_interval_ms")]
    pub ready_poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            encoding: Encoding::default(),
            compression: CompressFormat::default(),
            partition_hash: PartitionHashScheme::default(),
            max_put_records: default_max_put_records(),
            max_get_records: default_max_get_records(),
            ready_timeout_ms: default_ready_timeout_ms(),
            ready_poll_interval_ms: default_ready_poll_interval_ms(),
        }
    }
}

impl ClientConfig {
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_compression(mut self, compression: CompressFormat) -> Self {
        self.compression = compression;
        self
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}
