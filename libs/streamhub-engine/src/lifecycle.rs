use std::time::Duration;

use streamhub_api::{HubError, ShardInfo, ShardInspector, ShardState, TopicRef};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Poll shard states until every live shard of `topic` is `ACTIVE`.
///
/// - Polls once immediately, then every `interval` (the final sleep is cut
///   short so the deadline check runs exactly at `timeout`).
/// - `CLOSED` shards are terminal and ignored; an empty listing is not ready.
/// - `ShardNotReadyTimeout` only once `timeout` has fully elapsed, also when
///   a listing is still in flight at the deadline.
/// - `Cancelled` as soon as `cancel` fires, including mid-request.
///
/// Returns the listing that satisfied the check.
pub async fn wait_shards_ready(
    inspector: &dyn ShardInspector,
    topic: &TopicRef,
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<ShardInfo>, HubError> {
    if interval.is_zero() {
        return Err(HubError::InvalidArgument("poll interval must be positive".into()));
    }

    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let shards = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(topic, attempt)),
            listing = inspector.list_shard_states(topic) => listing?,
            _ = tokio::time::sleep_until(deadline) => {
                tracing::warn!(topic = %topic, attempts = attempt, "shard listing still pending at deadline");
                return Err(timed_out(topic, started));
            }
        };

        let live: Vec<&ShardInfo> = shards.iter().filter(|s| s.state != ShardState::Closed).collect();
        let pending = live.iter().filter(|s| s.state != ShardState::Active).count();
        if !live.is_empty() && pending == 0 {
            tracing::info!(
                topic = %topic,
                shards = live.len(),
                attempts = attempt,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "all shards active"
            );
            return Ok(shards);
        }

        let now = Instant::now();
        if now >= deadline {
            let waited = now - started;
            tracing::warn!(
                topic = %topic,
                pending,
                attempts = attempt,
                waited_ms = waited.as_millis() as u64,
                "shards not ready before deadline"
            );
            return Err(timed_out(topic, started));
        }

        tracing::debug!(topic = %topic, attempt, pending, total = live.len(), "shards not ready yet");

        let nap = interval.min(deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(topic, attempt)),
            _ = tokio::time::sleep(nap) => {}
        }
    }
}

fn timed_out(topic: &TopicRef, started: Instant) -> HubError {
    HubError::ShardNotReadyTimeout {
        topic: topic.to_string(),
        waited: started.elapsed(),
    }
}

fn cancelled(topic: &TopicRef, attempt: u32) -> HubError {
    tracing::info!(topic = %topic, attempts = attempt, "readiness wait cancelled");
    HubError::Cancelled(topic.to_string())
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use streamhub_api::HashRange;

    use super::*;

    /// Reports one `OPENING` shard for the first `opening_polls` calls, then `ACTIVE`.
    struct Scripted {
        calls: AtomicUsize,
        opening_polls: usize,
        empty: bool,
    }

    impl Scripted {
        fn new(opening_polls: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                opening_polls,
                empty: false,
            }
        }

        fn empty() -> Self {
            Self {
                empty: true,
                ..Self::new(0)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ShardInspector for Scripted {
        fn list_shard_states(
            &self,
            _topic: &TopicRef,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ShardInfo>, HubError>> + Send + '_>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let listing = if self.empty {
                Vec::new()
            } else {
                let state = if n > self.opening_polls { ShardState::Active } else { ShardState::Opening };
                vec![
                    ShardInfo::new("0", state, HashRange::full()),
                    ShardInfo::new("old", ShardState::Closed, HashRange::full()),
                ]
            };
            Box::pin(async move { Ok(listing) })
        }
    }

    /// Listing that never completes.
    struct Stalled;

    impl ShardInspector for Stalled {
        fn list_shard_states(
            &self,
            _topic: &TopicRef,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ShardInfo>, HubError>> + Send + '_>> {
            Box::pin(std::future::pending::<Result<Vec<ShardInfo>, HubError>>())
        }
    }

    fn topic() -> TopicRef {
        TopicRef::new("project", "topic")
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_polls() {
        let inspector = Scripted::new(3);
        let start = Instant::now();
        let shards = wait_shards_ready(
            &inspector,
            &topic(),
            Duration::from_secs(30),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(inspector.calls(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_not_before_deadline() {
        let inspector = Scripted::new(usize::MAX);
        let timeout = Duration::from_millis(2500);
        let start = Instant::now();
        let err = wait_shards_ready(
            &inspector,
            &topic(),
            timeout,
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        let HubError::ShardNotReadyTimeout { waited, .. } = &err else {
            panic!("expected timeout, got {err:?}");
        };
        assert!(*waited >= timeout);
        assert_eq!(start.elapsed(), timeout);
        // Polls at 0s, 1s, 2s and a final one at the deadline.
        assert_eq!(inspector.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_listing_times_out_at_deadline() {
        let timeout = Duration::from_secs(3);
        let start = Instant::now();
        let err = wait_shards_ready(
            &Stalled,
            &topic(),
            timeout,
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        let HubError::ShardNotReadyTimeout { waited, .. } = &err else {
            panic!("expected timeout, got {err:?}");
        };
        assert_eq!(*waited, timeout);
        assert_eq!(start.elapsed(), timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_listing_still_cancellable() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });
        let err = wait_shards_ready(&Stalled, &topic(), Duration::from_secs(3), Duration::from_secs(1), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Cancelled(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_listing_is_not_ready() {
        let inspector = Scripted::empty();
        let err = wait_shards_ready(
            &inspector,
            &topic(),
            Duration::from_secs(2),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HubError::ShardNotReadyTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_sleep() {
        let inspector = Scripted::new(usize::MAX);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = wait_shards_ready(
            &inspector,
            &topic(),
            Duration::from_secs(60),
            Duration::from_secs(10),
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HubError::Cancelled(_)));
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
        assert_eq!(inspector.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let err = wait_shards_ready(
            &Scripted::new(0),
            &topic(),
            Duration::from_secs(1),
            Duration::from_secs(1),
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HubError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let err = wait_shards_ready(
            &Scripted::new(0),
            &topic(),
            Duration::from_secs(1),
            Duration::ZERO,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HubError::InvalidArgument(_)));
    }
}
