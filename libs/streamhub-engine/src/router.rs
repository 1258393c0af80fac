use streamhub_api::{
    HashKey, HashRange, HubError, PartitionHashScheme, RecordMeta, Route, RoutingError, ShardInfo,
    ShardInspector, ShardState, TopicRef,
};

// ════════════════════════════════════════════════════════════════
//  Shard Topology
// ════════════════════════════════════════════════════════════════

/// Hash-range table of a topic's live shards, sorted by range start.
///
/// Ranges are contiguous and cover the whole hash-key space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardTopology {
    ranges: Vec<(HashRange, String)>,
}

impl ShardTopology {
    /// Build from a shard listing. `CLOSED` shards are ignored; the rest
    /// must tile the hash-key space without gaps or overlaps.
    pub fn from_shards(shards: &[ShardInfo]) -> Result<Self, RoutingError> {
        let mut ranges: Vec<(HashRange, String)> = shards
            .iter()
            .filter(|s| s.state != ShardState::Closed)
            .map(|s| (s.range, s.shard_id.clone()))
            .collect();
        if ranges.is_empty() {
            return Err(RoutingError::InvalidTopology("no open shards".into()));
        }
        ranges.sort_by_key(|(range, _)| range.begin);

        let mut expected = HashKey::MIN;
        for (range, id) in &ranges {
            if range.begin != expected {
                let problem = if range.begin > expected { "gap" } else { "overlap" };
                return Err(RoutingError::InvalidTopology(format!(
                    "{problem} before shard {id}: expected begin {expected}, found {}",
                    range.begin
                )));
            }
            if range.end <= range.begin {
                return Err(RoutingError::InvalidTopology(format!(
                    "shard {id} has an empty range"
                )));
            }
            expected = range.end;
        }
        if expected != HashKey::MAX {
            return Err(RoutingError::InvalidTopology(format!(
                "hash-key space not covered past {expected}"
            )));
        }
        Ok(Self { ranges })
    }

    /// Shard owning `key`.
    pub fn shard_for(&self, key: HashKey) -> Result<&str, RoutingError> {
        let idx = self.ranges.partition_point(|(range, _)| range.begin <= key);
        idx.checked_sub(1)
            .map(|i| &self.ranges[i])
            .filter(|(range, _)| range.contains(key))
            .map(|(_, id)| id.as_str())
            .ok_or_else(|| RoutingError::NoShardForHashKey(key.to_string()))
    }

    pub fn shard_ids(&self) -> impl Iterator<Item = &str> {
        self.ranges.iter().map(|(_, id)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════
//  Shard Router
// ════════════════════════════════════════════════════════════════

/// Resolves a record's routing hints to a target shard.
#[derive(Debug, Clone)]
pub struct ShardRouter {
    topology: ShardTopology,
    scheme: PartitionHashScheme,
}

impl ShardRouter {
    pub fn new(topology: ShardTopology, scheme: PartitionHashScheme) -> Self {
        Self { topology, scheme }
    }

    /// Fetch the current shard listing and build a router from it.
    pub async fn from_inspector(
        inspector: &dyn ShardInspector,
        topic: &TopicRef,
        scheme: PartitionHashScheme,
    ) -> Result<Self, HubError> {
        let shards = inspector.list_shard_states(topic).await?;
        let topology = ShardTopology::from_shards(&shards)?;
        tracing::debug!(topic = %topic, shards = topology.len(), "shard topology loaded");
        Ok(Self::new(topology, scheme))
    }

    pub fn topology(&self) -> &ShardTopology {
        &self.topology
    }

    /// Target shard of a record, or `None` when the service picks one.
    ///
    /// An explicit shard id passes through untouched; the service is the
    /// authority on which ids exist.
    pub fn route(&self, meta: &RecordMeta) -> Result<Option<String>, RoutingError> {
        match meta.route() {
            Route::Shard(id) => Ok(Some(id.to_string())),
            Route::HashKey(raw) => {
                let key = HashKey::parse(raw)?;
                self.topology.shard_for(key).map(|id| Some(id.to_string()))
            }
            Route::PartitionKey(pk) => {
                let key = self.scheme.hash_key(pk);
                self.topology.shard_for(key).map(|id| Some(id.to_string()))
            }
            Route::Unassigned => Ok(None),
        }
    }
}

/// Routing without a topology: validate an explicit hash key and turn a
/// partition key into one, leaving shard selection to the service.
pub fn normalize_hints(meta: &mut RecordMeta, scheme: PartitionHashScheme) -> Result<(), RoutingError> {
    let hash_key = match meta.route() {
        Route::Shard(_) | Route::Unassigned => return Ok(()),
        Route::HashKey(raw) => HashKey::parse(raw)?,
        Route::PartitionKey(pk) => scheme.hash_key(pk),
    };
    meta.hash_key = Some(hash_key.to_string());
    Ok(())
}
