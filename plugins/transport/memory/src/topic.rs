use streamhub_api::{
    HashKey, HashRange, HubError, PartitionHashScheme, Record, RecordErrorCode, RecordMeta, Route,
    SchemaRef, ShardInfo, ShardState,
};

/// One shard: its reported info plus the records appended to it.
/// `records[i]` carries sequence `i`.
pub(crate) struct ShardSlot {
    pub info: ShardInfo,
    /// Listings left before an `OPENING` shard turns `ACTIVE`.
    pub opening_left: usize,
    pub records: Vec<Record>,
}

impl ShardSlot {
    fn new(id: String, range: HashRange, opening_left: usize) -> Self {
        Self {
            info: ShardInfo::new(id, ShardState::Opening, range),
            opening_left,
            records: Vec::new(),
        }
    }
}

pub(crate) struct TopicState {
    pub schema: Option<SchemaRef>,
    pub shards: Vec<ShardSlot>,
    next_shard_id: u64,
    round_robin: usize,
}

impl TopicState {
    pub fn new(shard_count: usize, schema: Option<SchemaRef>, opening_polls: usize) -> Self {
        let mut shards: Vec<ShardSlot> = HashRange::split_even(shard_count)
            .into_iter()
            .enumerate()
            .map(|(i, range)| ShardSlot::new(i.to_string(), range, opening_polls))
            .collect();
        if opening_polls == 0 {
            for slot in &mut shards {
                slot.info.state = ShardState::Active;
            }
        }
        Self {
            schema,
            next_shard_id: shards.len() as u64,
            shards,
            round_robin: 0,
        }
    }

    pub fn shard(&self, id: &str) -> Option<&ShardSlot> {
        self.shards.iter().find(|s| s.info.shard_id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.shards.iter().position(|s| s.info.shard_id == id)
    }

    /// One listing's worth of state transitions.
    pub fn advance(&mut self) {
        for slot in &mut self.shards {
            if slot.info.state != ShardState::Opening {
                continue;
            }
            if slot.opening_left == 0 {
                slot.info.state = ShardState::Active;
            } else {
                slot.opening_left -= 1;
            }
        }
    }

    pub fn listing(&self) -> Vec<ShardInfo> {
        self.shards.iter().map(|s| s.info.clone()).collect()
    }

    // ---- Routing ----

    /// Index of the shard a record lands in, with the same precedence as
    /// the client: shard id, hash key, partition key, round-robin.
    pub fn target(
        &mut self,
        meta: &RecordMeta,
        scheme: PartitionHashScheme,
    ) -> Result<usize, (RecordErrorCode, String)> {
        let key = match meta.route() {
            Route::Shard(id) => {
                return self
                    .position(id)
                    .filter(|&i| self.shards[i].info.state.is_writable())
                    .ok_or_else(|| {
                        (RecordErrorCode::InvalidShardId, format!("Invalid shard id: {id}"))
                    });
            }
            Route::HashKey(raw) => HashKey::parse(raw)
                .map_err(|e| (RecordErrorCode::InvalidHashKeyFormat, e.to_string()))?,
            Route::PartitionKey(pk) => scheme.hash_key(pk),
            Route::Unassigned => {
                let writable: Vec<usize> = (0..self.shards.len())
                    .filter(|&i| self.shards[i].info.state.is_writable())
                    .collect();
                if writable.is_empty() {
                    return Err((RecordErrorCode::InvalidShardId, "no writable shard".into()));
                }
                let pick = writable[self.round_robin % writable.len()];
                self.round_robin = self.round_robin.wrapping_add(1);
                return Ok(pick);
            }
        };

        self.shards
            .iter()
            .position(|s| s.info.state.is_writable() && s.info.range.contains(key))
            .ok_or_else(|| {
                (
                    RecordErrorCode::NoShardForHashKey,
                    format!("no writable shard owns hash key {key}"),
                )
            })
    }

    // ---- Split & merge ----

    fn child_id(&mut self) -> String {
        let id = self.next_shard_id.to_string();
        self.next_shard_id += 1;
        id
    }

    fn active_position(&self, id: &str) -> Result<usize, HubError> {
        let idx = self
            .position(id)
            .ok_or_else(|| HubError::service("ResourceNotFound", format!("shard {id} does not exist")))?;
        if self.shards[idx].info.state != ShardState::Active {
            return Err(HubError::service(
                "InvalidOperation",
                format!("shard {id} is {}", self.shards[idx].info.state),
            ));
        }
        Ok(idx)
    }

    pub fn split(
        &mut self,
        shard_id: &str,
        split_key: HashKey,
        opening_polls: usize,
    ) -> Result<(String, String), HubError> {
        let idx = self.active_position(shard_id)?;
        let range = self.shards[idx].info.range;
        if split_key <= range.begin || split_key >= range.end {
            return Err(HubError::service(
                "InvalidParameter",
                format!("split key {split_key} outside shard {shard_id}"),
            ));
        }
        self.shards[idx].info.state = ShardState::Closed;

        let left_id = self.child_id();
        let right_id = self.child_id();
        for (id, range) in [
            (left_id.clone(), HashRange::new(range.begin, split_key)),
            (right_id.clone(), HashRange::new(split_key, range.end)),
        ] {
            let mut child = ShardSlot::new(id, range, opening_polls);
            child.info.parent_shard_ids = vec![shard_id.to_string()];
            self.shards.push(child);
        }
        Ok((left_id, right_id))
    }

    pub fn merge(&mut self, first: &str, second: &str, opening_polls: usize) -> Result<String, HubError> {
        let a = self.active_position(first)?;
        let b = self.active_position(second)?;
        let (lo, hi) = if self.shards[a].info.range.begin <= self.shards[b].info.range.begin {
            (a, b)
        } else {
            (b, a)
        };
        if self.shards[lo].info.range.end != self.shards[hi].info.range.begin {
            return Err(HubError::service(
                "InvalidOperation",
                format!("shards {first} and {second} are not adjacent"),
            ));
        }
        let range = HashRange::new(self.shards[lo].info.range.begin, self.shards[hi].info.range.end);
        let parents = vec![
            self.shards[lo].info.shard_id.clone(),
            self.shards[hi].info.shard_id.clone(),
        ];
        self.shards[lo].info.state = ShardState::Closed;
        self.shards[hi].info.state = ShardState::Closed;

        let id = self.child_id();
        let mut child = ShardSlot::new(id.clone(), range, opening_polls);
        child.info.parent_shard_ids = parents;
        self.shards.push(child);
        Ok(id)
    }
}
