use std::time::Duration;

use streamhub_api::{ClientConfig, HashRange, HubError, ShardState, TopicRef};
use streamhub_engine::{wait_shards_ready, StreamClient};
use streamhub_memory::MemoryHub;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn topic() -> TopicRef {
    TopicRef::new("test_project", "lifecycle_topic")
}

#[tokio::test(start_paused = true)]
async fn test_new_topic_becomes_ready() {
    let hub = MemoryHub::new().with_opening_polls(3).into_shared();
    hub.create_topic(&topic(), 2, None).unwrap();
    let config = ClientConfig {
        ready_poll_interval_ms: 100,
        ..ClientConfig::default()
    };
    let client = StreamClient::new(config, hub.clone()).unwrap();

    let start = Instant::now();
    let shards = client
        .wait_shards_ready(&*hub, &topic(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(shards.iter().all(|s| s.state == ShardState::Active));
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_split_children_become_ready() {
    let hub = MemoryHub::new().with_opening_polls(1).into_shared();
    hub.create_topic(&topic(), 1, None).unwrap();
    let cancel = CancellationToken::new();
    wait_shards_ready(&*hub, &topic(), Duration::from_secs(5), Duration::from_secs(1), &cancel)
        .await
        .unwrap();

    let mid = HashRange::split_even(2)[1].begin;
    let (left, right) = hub.split_shard(&topic(), "0", mid).unwrap();
    let shards = wait_shards_ready(&*hub, &topic(), Duration::from_secs(5), Duration::from_secs(1), &cancel)
        .await
        .unwrap();

    let state = |id: &str| shards.iter().find(|s| s.shard_id == id).map(|s| s.state);
    assert_eq!(state("0"), Some(ShardState::Closed));
    assert_eq!(state(&left), Some(ShardState::Active));
    assert_eq!(state(&right), Some(ShardState::Active));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_after_deadline() {
    let hub = MemoryHub::new().with_opening_polls(1_000).into_shared();
    hub.create_topic(&topic(), 1, None).unwrap();
    let timeout = Duration::from_secs(3);

    let start = Instant::now();
    let err = wait_shards_ready(&*hub, &topic(), timeout, Duration::from_millis(700), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::ShardNotReadyTimeout { .. }));
    assert!(start.elapsed() >= timeout);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_topic_fails_fast() {
    let hub = MemoryHub::new();
    let err = wait_shards_ready(&hub, &topic(), Duration::from_secs(3), Duration::from_secs(1), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Service { code, .. } if code == "NoSuchTopic"));
}
