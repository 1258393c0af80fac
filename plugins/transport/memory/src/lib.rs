//! In-process service double: implements [`Transport`] and
//! [`ShardInspector`] over topics held in memory.
//!
//! Speaks the same wire format as the real service (compression envelope,
//! native and structured batches, JSON control messages), so the client
//! engine can be exercised end to end without a network.

mod topic;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use streamhub_api::protocol::{
    self, GetCursorRequest, GetCursorResponse, GetRecordsMeta, GetRecordsRequest,
    PutRecordsResponse,
};
use streamhub_api::{
    BatchCodec, CompressFormat, Cursor, CursorType, Encoding, Endpoint, FailedRecord, HashKey,
    HubError, PartitionHashScheme, Record, RecordErrorCode, SchemaRef, ShardInfo, ShardInspector,
    TopicRef, Transport,
};
use streamhub_compress::{compress, decompress};
use streamhub_native::NativeCodec;
use streamhub_protobuf::StructuredCodec;

use topic::TopicState;

/// Largest batch a single get returns, whatever the requested limit.
pub const MAX_GET_RECORDS: usize = 1000;

/// System time of the first record written to a hub, in microseconds.
pub const CLOCK_START_US: i64 = 1_700_000_000_000_000;

struct HubState {
    topics: BTreeMap<TopicRef, TopicState>,
    /// Last issued system time. Strictly increasing across the hub.
    clock: i64,
}

/// In-memory stand-in for the streaming service.
pub struct MemoryHub {
    state: RwLock<HubState>,
    opening_polls: usize,
    scheme: PartitionHashScheme,
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHub {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HubState {
                topics: BTreeMap::new(),
                clock: CLOCK_START_US,
            }),
            opening_polls: 0,
            scheme: PartitionHashScheme::default(),
        }
    }

    /// New shards (created, split or merged) report `OPENING` for this
    /// many listings before turning `ACTIVE`.
    pub fn with_opening_polls(mut self, polls: usize) -> Self {
        self.opening_polls = polls;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // ---- Locking ----

    fn read(&self) -> RwLockReadGuard<'_, HubState> {
        match self.state.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("memory hub read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HubState> {
        match self.state.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("memory hub write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    // ---- Topic management ----

    /// Create a topic with `shard_count` shards evenly covering the
    /// hash-key space. `schema` makes it a tuple topic, `None` a blob topic.
    pub fn create_topic(
        &self,
        topic: &TopicRef,
        shard_count: usize,
        schema: Option<SchemaRef>,
    ) -> Result<(), HubError> {
        if shard_count == 0 {
            return Err(HubError::service("InvalidParameter", "shard count must be positive"));
        }
        let mut state = self.write();
        if state.topics.contains_key(topic) {
            return Err(HubError::service(
                "ResourceAlreadyExist",
                format!("topic {topic} already exists"),
            ));
        }
        state
            .topics
            .insert(topic.clone(), TopicState::new(shard_count, schema, self.opening_polls));
        tracing::debug!(topic = %topic, shards = shard_count, "topic created");
        Ok(())
    }

    /// Close `shard_id` and open two children split at `split_key`.
    pub fn split_shard(
        &self,
        topic: &TopicRef,
        shard_id: &str,
        split_key: HashKey,
    ) -> Result<(String, String), HubError> {
        let mut state = self.write();
        let children = topic_mut(&mut state, topic)?.split(shard_id, split_key, self.opening_polls)?;
        tracing::debug!(topic = %topic, parent = shard_id, left = %children.0, right = %children.1, "shard split");
        Ok(children)
    }

    /// Close two adjacent shards and open one child covering both ranges.
    pub fn merge_shards(&self, topic: &TopicRef, first: &str, second: &str) -> Result<String, HubError> {
        let mut state = self.write();
        let child = topic_mut(&mut state, topic)?.merge(first, second, self.opening_polls)?;
        tracing::debug!(topic = %topic, first, second, child = %child, "shards merged");
        Ok(child)
    }

    /// Number of records stored in a shard.
    pub fn record_count(&self, topic: &TopicRef, shard_id: &str) -> Result<usize, HubError> {
        let state = self.read();
        let topic_state = topic_ref(&state, topic)?;
        topic_state
            .shard(shard_id)
            .map(|slot| slot.records.len())
            .ok_or_else(|| no_shard(shard_id))
    }

    // ---- Request handlers ----

    fn handle_put(
        &self,
        topic: &TopicRef,
        encoding: Encoding,
        body: &[u8],
    ) -> Result<Vec<u8>, HubError> {
        let mut state = self.write();
        let HubState { topics, clock } = &mut *state;
        let topic_state = topics.get_mut(topic).ok_or_else(|| no_topic(topic))?;

        let (_, raw) = decompress(body).map_err(invalid_payload)?;
        let records = codec_for(encoding)
            .decode(&raw, topic_state.schema.as_ref())
            .map_err(invalid_payload)?;

        let mut failed_records = Vec::new();
        for (index, mut record) in records.into_iter().enumerate() {
            if record.as_tuple().is_some() != topic_state.schema.is_some() {
                failed_records.push(FailedRecord {
                    index,
                    error_code: RecordErrorCode::InvalidRecord,
                    error_message: format!("record kind does not match topic {topic}"),
                });
                continue;
            }

            let target = match topic_state.target(record.meta(), self.scheme) {
                Ok(target) => target,
                Err((error_code, error_message)) => {
                    failed_records.push(FailedRecord {
                        index,
                        error_code,
                        error_message,
                    });
                    continue;
                }
            };

            let slot = &mut topic_state.shards[target];
            *clock += 1;
            let meta = record.meta_mut();
            meta.shard_id = None;
            meta.hash_key = None;
            meta.partition_key = None;
            meta.sequence = Some(slot.records.len() as i64);
            meta.system_time = Some(*clock);
            slot.records.push(record);
        }

        tracing::debug!(topic = %topic, failed = failed_records.len(), "put handled");
        let response = PutRecordsResponse {
            failed_record_count: failed_records.len(),
            failed_records,
        };
        Ok(serde_json::to_vec(&response)?)
    }

    fn handle_get_cursor(&self, topic: &TopicRef, shard_id: &str, body: &[u8]) -> Result<Vec<u8>, HubError> {
        let request: GetCursorRequest = serde_json::from_slice(body)?;
        let state = self.read();
        let slot = topic_ref(&state, topic)?
            .shard(shard_id)
            .ok_or_else(|| no_shard(shard_id))?;
        let records = &slot.records;
        let end = records.len() as i64;

        let sequence = match request.cursor_type {
            CursorType::Oldest => 0,
            CursorType::Latest => end,
            CursorType::Sequence(seq) if (0..end).contains(&seq) => seq,
            CursorType::Sequence(seq) => {
                return Err(HubError::service(
                    "SeekOutOfRange",
                    format!("sequence {seq} not in shard {shard_id} (0..{end})"),
                ));
            }
            CursorType::SystemTime(time) => records
                .iter()
                .position(|r| r.system_time().is_some_and(|t| t >= time))
                .map_or(end, |i| i as i64),
        };

        let response = GetCursorResponse {
            cursor: cursor_at(sequence),
            sequence,
            record_time: records.get(sequence as usize).and_then(Record::system_time),
        };
        Ok(serde_json::to_vec(&response)?)
    }

    fn handle_get(
        &self,
        topic: &TopicRef,
        shard_id: &str,
        encoding: Encoding,
        body: &[u8],
        compression: CompressFormat,
    ) -> Result<Vec<u8>, HubError> {
        let request: GetRecordsRequest = serde_json::from_slice(body)?;
        let state = self.read();
        let slot = topic_ref(&state, topic)?
            .shard(shard_id)
            .ok_or_else(|| no_shard(shard_id))?;

        let start = parse_cursor(&request.cursor)?;
        if start > slot.records.len() {
            return Err(HubError::service(
                "SeekOutOfRange",
                format!("cursor past the end of shard {shard_id}"),
            ));
        }
        let limit = request.limit.min(MAX_GET_RECORDS);
        let end = (start + limit).min(slot.records.len());
        let batch = &slot.records[start..end];

        let raw = codec_for(encoding).encode(batch)?;
        let envelope = compress(&raw, compression)?;
        let meta = GetRecordsMeta {
            next_cursor: cursor_at(end as i64),
            record_count: batch.len(),
            start_seq: start as i64,
        };
        protocol::encode_get_response(&meta, &envelope)
    }
}

impl Transport for MemoryHub {
    fn send(
        &self,
        endpoint: &Endpoint,
        body: &[u8],
        compression: CompressFormat,
    ) -> Result<Vec<u8>, HubError> {
        match endpoint {
            Endpoint::PutRecords { topic, encoding } => self.handle_put(topic, *encoding, body),
            Endpoint::GetCursor { topic, shard_id } => self.handle_get_cursor(topic, shard_id, body),
            Endpoint::GetRecords {
                topic,
                shard_id,
                encoding,
            } => self.handle_get(topic, shard_id, *encoding, body, compression),
        }
    }
}

impl ShardInspector for MemoryHub {
    fn list_shard_states(
        &self,
        topic: &TopicRef,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShardInfo>, HubError>> + Send + '_>> {
        let listing = {
            let mut state = self.write();
            topic_mut(&mut state, topic).map(|topic_state| {
                topic_state.advance();
                topic_state.listing()
            })
        };
        Box::pin(async move { listing })
    }
}

// ---- Helpers ----

fn codec_for(encoding: Encoding) -> Box<dyn BatchCodec> {
    match encoding {
        Encoding::Native => Box::new(NativeCodec),
        Encoding::Structured => Box::new(StructuredCodec),
    }
}

fn cursor_at(sequence: i64) -> Cursor {
    Cursor::new(format!("{sequence:032X}"))
}

fn parse_cursor(cursor: &Cursor) -> Result<usize, HubError> {
    usize::from_str_radix(cursor.as_str(), 16)
        .map_err(|_| HubError::service("InvalidCursor", format!("cursor {cursor} is malformed")))
}

fn topic_ref<'a>(state: &'a HubState, topic: &TopicRef) -> Result<&'a TopicState, HubError> {
    state.topics.get(topic).ok_or_else(|| no_topic(topic))
}

fn topic_mut<'a>(state: &'a mut HubState, topic: &TopicRef) -> Result<&'a mut TopicState, HubError> {
    state.topics.get_mut(topic).ok_or_else(|| no_topic(topic))
}

fn no_topic(topic: &TopicRef) -> HubError {
    HubError::service("NoSuchTopic", format!("topic {topic} does not exist"))
}

fn no_shard(shard_id: &str) -> HubError {
    HubError::service("NoSuchShard", format!("shard {shard_id} does not exist"))
}

fn invalid_payload(e: impl std::fmt::Display) -> HubError {
    HubError::service("InvalidParameter", format!("malformed record payload: {e}"))
}

#[cfg(test)]
mod tests {
    use streamhub_api::{BlobRecord, HashRange, ShardState};

    use super::*;

    fn topic() -> TopicRef {
        TopicRef::new("project", "blobs")
    }

    fn put_body(records: &[Record]) -> Vec<u8> {
        compress(&NativeCodec.encode(records).unwrap(), CompressFormat::None).unwrap()
    }

    fn put(hub: &MemoryHub, records: &[Record]) -> PutRecordsResponse {
        let endpoint = Endpoint::PutRecords {
            topic: topic(),
            encoding: Encoding::Native,
        };
        let response = hub.send(&endpoint, &put_body(records), CompressFormat::None).unwrap();
        serde_json::from_slice(&response).unwrap()
    }

    fn blob_to(shard: &str) -> Record {
        let mut blob = BlobRecord::new(b"data".to_vec());
        blob.meta.shard_id = Some(shard.into());
        blob.into()
    }

    #[test]
    fn test_put_assigns_sequences_per_shard() {
        let hub = MemoryHub::new();
        hub.create_topic(&topic(), 2, None).unwrap();
        let response = put(&hub, &[blob_to("0"), blob_to("1"), blob_to("0")]);
        assert_eq!(response.failed_record_count, 0);
        assert_eq!(hub.record_count(&topic(), "0").unwrap(), 2);
        assert_eq!(hub.record_count(&topic(), "1").unwrap(), 1);
    }

    #[test]
    fn test_invalid_shard_reported_per_record() {
        let hub = MemoryHub::new();
        hub.create_topic(&topic(), 1, None).unwrap();
        let response = put(&hub, &[blob_to("0"), blob_to("-1")]);
        assert_eq!(response.failed_record_count, 1);
        assert_eq!(response.failed_records[0].index, 1);
        assert_eq!(response.failed_records[0].error_code, RecordErrorCode::InvalidShardId);
        assert_eq!(response.failed_records[0].error_message, "Invalid shard id: -1");
    }

    #[test]
    fn test_round_robin_without_hints() {
        let hub = MemoryHub::new();
        hub.create_topic(&topic(), 3, None).unwrap();
        let records: Vec<Record> = (0..6).map(|_| BlobRecord::new(b"x".to_vec()).into()).collect();
        put(&hub, &records);
        for shard in ["0", "1", "2"] {
            assert_eq!(hub.record_count(&topic(), shard).unwrap(), 2);
        }
    }

    #[test]
    fn test_unknown_sequence_is_seek_out_of_range() {
        let hub = MemoryHub::new();
        hub.create_topic(&topic(), 1, None).unwrap();
        let endpoint = Endpoint::GetCursor {
            topic: topic(),
            shard_id: "0".into(),
        };
        let body = serde_json::to_vec(&GetCursorRequest {
            cursor_type: CursorType::Sequence(5),
        })
        .unwrap();
        let err = hub.send(&endpoint, &body, CompressFormat::None).unwrap_err();
        assert!(matches!(err, HubError::Service { code, .. } if code == "SeekOutOfRange"));
    }

    #[tokio::test]
    async fn test_opening_shards_turn_active() {
        let hub = MemoryHub::new().with_opening_polls(2);
        hub.create_topic(&topic(), 2, None).unwrap();
        let states = |listing: Vec<ShardInfo>| listing.into_iter().map(|s| s.state).collect::<Vec<_>>();

        assert_eq!(states(hub.list_shard_states(&topic()).await.unwrap()), [ShardState::Opening; 2]);
        assert_eq!(states(hub.list_shard_states(&topic()).await.unwrap()), [ShardState::Opening; 2]);
        assert_eq!(states(hub.list_shard_states(&topic()).await.unwrap()), [ShardState::Active; 2]);
    }

    #[tokio::test]
    async fn test_split_and_merge() {
        let hub = MemoryHub::new();
        hub.create_topic(&topic(), 1, None).unwrap();
        let mid = HashRange::split_even(2)[1].begin;

        let (left, right) = hub.split_shard(&topic(), "0", mid).unwrap();
        let listing = hub.list_shard_states(&topic()).await.unwrap();
        assert_eq!(listing[0].state, ShardState::Closed);
        assert_eq!(listing[1].parent_shard_ids, vec!["0".to_string()]);
        assert_eq!(listing[1].range.end, mid);
        assert_eq!(listing[2].range.begin, mid);

        // Writes to the closed parent are rejected.
        let response = put(&hub, &[blob_to("0")]);
        assert_eq!(response.failed_records[0].error_code, RecordErrorCode::InvalidShardId);

        let merged = hub.merge_shards(&topic(), &left, &right).unwrap();
        let listing = hub.list_shard_states(&topic()).await.unwrap();
        let child = listing.iter().find(|s| s.shard_id == merged).unwrap();
        assert_eq!(child.range, HashRange::full());
        assert_eq!(child.parent_shard_ids, vec![left, right]);
    }

    #[test]
    fn test_unknown_topic() {
        let hub = MemoryHub::new();
        let endpoint = Endpoint::PutRecords {
            topic: topic(),
            encoding: Encoding::Native,
        };
        let err = hub
            .send(&endpoint, &put_body(&[blob_to("0")]), CompressFormat::None)
            .unwrap_err();
        assert!(matches!(err, HubError::Service { code, .. } if code == "NoSuchTopic"));
    }
}
