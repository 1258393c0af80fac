//! Client-side protocol engine: batch encode/decode, shard routing,
//! put/get with per-record failures, cursor resolution and the shard
//! readiness wait. Network I/O is delegated to a [`Transport`].
//!
//! [`Transport`]: streamhub_api::Transport

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod router;
pub mod scan;

pub use client::{codec_for, StreamClient};
pub use lifecycle::wait_shards_ready;
pub use router::{normalize_hints, ShardRouter, ShardTopology};
pub use scan::Scan;
