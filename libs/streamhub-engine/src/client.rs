use std::sync::Arc;

use streamhub_api::protocol::{
    self, GetCursorRequest, GetCursorResponse, GetRecordsRequest, PutRecordsResponse,
};
use streamhub_api::{
    BatchCodec, ClientConfig, CodecError, Cursor, CursorInfo, CursorType, Encoding, Endpoint,
    FailedRecord, GetRecordsResult, HubError, PutRecordsResult, Record, RecordErrorCode,
    RoutingError, SchemaRef, ShardInfo, ShardInspector, TopicRef, Transport,
};
use streamhub_compress::CompressMiddleware;
use streamhub_native::NativeCodec;
use streamhub_protobuf::StructuredCodec;
use tokio_util::sync::CancellationToken;

use crate::lifecycle;
use crate::router::{normalize_hints, ShardRouter};
use crate::scan::Scan;

/// Codec for an encoding.
pub fn codec_for(encoding: Encoding) -> Arc<dyn BatchCodec> {
    match encoding {
        Encoding::Native => Arc::new(NativeCodec),
        Encoding::Structured => Arc::new(StructuredCodec),
    }
}

/// Client-side protocol engine for one service endpoint.
///
/// Holds no mutable state: the config, codec and compression are fixed at
/// construction, so a client can be shared freely across threads.
pub struct StreamClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn BatchCodec>,
    compress: CompressMiddleware,
}

impl StreamClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, HubError> {
        crate::config::validate(&config)?;
        let codec = codec_for(config.encoding);
        let compress = CompressMiddleware::new(config.compression);
        Ok(Self {
            config,
            transport,
            codec,
            compress,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ---- Codec ----

    /// Serialize a batch with the client's encoding and wrap it in its
    /// compression envelope. This is the put request body.
    pub fn encode_batch(&self, records: &[Record]) -> Result<Vec<u8>, HubError> {
        let raw = self.codec.encode(records)?;
        Ok(self.compress.encode(&raw)?)
    }

    /// Inverse of [`encode_batch`](Self::encode_batch). Any compression id
    /// the envelope carries is accepted.
    pub fn decode_batch(&self, bytes: &[u8], schema: Option<&SchemaRef>) -> Result<Vec<Record>, HubError> {
        let raw = self.compress.decode(bytes)?;
        Ok(self.codec.decode(&raw, schema)?)
    }

    // ---- Routing & lifecycle ----

    /// Router over the topic's current shard layout.
    pub async fn router(
        &self,
        inspector: &dyn ShardInspector,
        topic: &TopicRef,
    ) -> Result<ShardRouter, HubError> {
        ShardRouter::from_inspector(inspector, topic, self.config.partition_hash).await
    }

    /// [`lifecycle::wait_shards_ready`] with the configured timeout and interval.
    pub async fn wait_shards_ready(
        &self,
        inspector: &dyn ShardInspector,
        topic: &TopicRef,
        cancel: &CancellationToken,
    ) -> Result<Vec<ShardInfo>, HubError> {
        lifecycle::wait_shards_ready(
            inspector,
            topic,
            self.config.ready_timeout(),
            self.config.ready_poll_interval(),
            cancel,
        )
        .await
    }

    // ---- Put ----

    /// Write a batch. Each record is routed on its own; records that fail
    /// locally are reported without being sent, and service rejections are
    /// mapped back to their position in `records`.
    ///
    /// With `router`, partition and hash keys resolve to a shard id on the
    /// client. Without one, hash keys are validated and partition keys
    /// hashed, and the service picks the shard. The caller's records are
    /// never modified.
    pub fn put_records(
        &self,
        topic: &TopicRef,
        router: Option<&ShardRouter>,
        records: &[Record],
    ) -> Result<PutRecordsResult, HubError> {
        self.check_batch(records)?;

        let mut failed = Vec::new();
        let mut outgoing = Vec::with_capacity(records.len());
        // Position in `records` of each outgoing entry.
        let mut origin = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let mut routed = record.clone();
            let outcome = match router {
                Some(router) => router.route(routed.meta()).map(|shard| {
                    if let Some(shard) = shard {
                        routed.meta_mut().shard_id = Some(shard);
                    }
                }),
                None => normalize_hints(routed.meta_mut(), self.config.partition_hash),
            };
            match outcome {
                Ok(()) => {
                    outgoing.push(routed);
                    origin.push(index);
                }
                Err(e) => {
                    tracing::warn!(topic = %topic, index, error = %e, "record rejected before send");
                    failed.push(FailedRecord {
                        index,
                        error_code: error_code(&e),
                        error_message: e.to_string(),
                    });
                }
            }
        }

        if !outgoing.is_empty() {
            let body = self.encode_batch(&outgoing)?;
            let endpoint = Endpoint::PutRecords {
                topic: topic.clone(),
                encoding: self.config.encoding,
            };
            tracing::debug!(
                topic = %topic,
                records = outgoing.len(),
                bytes = body.len(),
                compression = %self.config.compression,
                "put_records"
            );
            let response = self.call(&endpoint, &body)?;
            let response: PutRecordsResponse =
                serde_json::from_slice(&response).map_err(|e| HubError::from(e).with_context("put_records"))?;

            if response.failed_record_count != response.failed_records.len() {
                return Err(HubError::Protocol(format!(
                    "put_records: response counts {} failures but lists {}",
                    response.failed_record_count,
                    response.failed_records.len()
                )));
            }

            let mut reported = vec![false; origin.len()];
            for rejected in response.failed_records {
                let index = *origin.get(rejected.index).ok_or_else(|| {
                    HubError::Protocol(format!(
                        "put_records: failed index {} outside batch of {}",
                        rejected.index,
                        origin.len()
                    ))
                })?;
                if std::mem::replace(&mut reported[rejected.index], true) {
                    return Err(HubError::Protocol(format!(
                        "put_records: failed index {} reported twice",
                        rejected.index
                    )));
                }
                tracing::warn!(
                    topic = %topic,
                    index,
                    code = %rejected.error_code,
                    message = %rejected.error_message,
                    "record rejected by service"
                );
                failed.push(FailedRecord { index, ..rejected });
            }
        }

        failed.sort_by_key(|f| f.index);
        Ok(PutRecordsResult {
            attempted: records.len(),
            failed_records: failed,
        })
    }

    fn check_batch(&self, records: &[Record]) -> Result<(), HubError> {
        let Some(first) = records.first() else {
            return Err(HubError::InvalidBatch("batch is empty".into()));
        };
        if records.len() > self.config.max_put_records {
            return Err(HubError::InvalidBatch(format!(
                "{} records exceed the limit of {}",
                records.len(),
                self.config.max_put_records
            )));
        }
        for (index, record) in records.iter().enumerate().skip(1) {
            let same = match (first, record) {
                (Record::Tuple(a), Record::Tuple(b)) => {
                    Arc::ptr_eq(a.schema(), b.schema()) || a.schema() == b.schema()
                }
                (Record::Blob(_), Record::Blob(_)) => true,
                _ => false,
            };
            if !same {
                return Err(HubError::InvalidBatch(format!(
                    "record {index} differs in kind or schema from record 0"
                )));
            }
        }
        Ok(())
    }

    // ---- Cursor ----

    /// Resolve a symbolic position to a cursor. One round trip.
    pub fn resolve_cursor(
        &self,
        topic: &TopicRef,
        shard_id: &str,
        cursor_type: CursorType,
    ) -> Result<CursorInfo, HubError> {
        let endpoint = Endpoint::GetCursor {
            topic: topic.clone(),
            shard_id: shard_id.to_string(),
        };
        let body = serde_json::to_vec(&GetCursorRequest { cursor_type })?;
        tracing::debug!(topic = %topic, shard = shard_id, ?cursor_type, "get_cursor");
        let response = self.call(&endpoint, &body)?;
        let response: GetCursorResponse =
            serde_json::from_slice(&response).map_err(|e| HubError::from(e).with_context("get_cursor"))?;
        Ok(CursorInfo {
            cursor: response.cursor,
            sequence: response.sequence,
            record_time: response.record_time,
        })
    }

    // ---- Get ----

    /// Read up to `limit` records from `cursor`. Tuple topics need `schema`.
    ///
    /// Non-destructive: the same cursor reads the same records again.
    pub fn get_records(
        &self,
        topic: &TopicRef,
        shard_id: &str,
        cursor: &Cursor,
        limit: usize,
        schema: Option<&SchemaRef>,
    ) -> Result<GetRecordsResult, HubError> {
        if limit == 0 || limit > self.config.max_get_records {
            return Err(HubError::InvalidArgument(format!(
                "limit {limit} outside 1..={}",
                self.config.max_get_records
            )));
        }

        let endpoint = Endpoint::GetRecords {
            topic: topic.clone(),
            shard_id: shard_id.to_string(),
            encoding: self.config.encoding,
        };
        let body = serde_json::to_vec(&GetRecordsRequest {
            cursor: cursor.clone(),
            limit,
        })?;
        let frame = self.call(&endpoint, &body)?;
        let (meta, envelope) =
            protocol::decode_get_response(&frame).map_err(|e| e.with_context("get_records"))?;
        let records = self.decode_batch(envelope, schema)?;

        if records.len() != meta.record_count {
            return Err(HubError::Protocol(format!(
                "get_records: meta announces {} records, payload holds {}",
                meta.record_count,
                records.len()
            )));
        }
        if records.len() > limit {
            return Err(HubError::Protocol(format!(
                "get_records: {} records returned for limit {limit}",
                records.len()
            )));
        }
        for (offset, record) in records.iter().enumerate() {
            let expected = i64::try_from(offset)
                .ok()
                .and_then(|offset| meta.start_seq.checked_add(offset))
                .ok_or_else(|| {
                    CodecError::corrupt(format!(
                        "record {offset} overflows sequence space from start {}",
                        meta.start_seq
                    ))
                })?;
            if record.sequence() != Some(expected) {
                return Err(CodecError::corrupt(format!(
                    "record {offset} has sequence {:?}, expected {expected}",
                    record.sequence()
                ))
                .into());
            }
        }

        tracing::debug!(
            topic = %topic,
            shard = shard_id,
            start_seq = meta.start_seq,
            records = records.len(),
            "get_records"
        );
        Ok(GetRecordsResult {
            start_seq: meta.start_seq,
            records,
            next_cursor: meta.next_cursor,
        })
    }

    /// Forward scan from `cursor`, one batch of up to `limit` per step.
    /// Ends after the first empty batch or error.
    pub fn scan<'a>(
        &'a self,
        topic: &'a TopicRef,
        shard_id: &'a str,
        cursor: Cursor,
        limit: usize,
        schema: Option<&'a SchemaRef>,
    ) -> Scan<'a> {
        Scan::new(self, topic, shard_id, cursor, limit, schema)
    }

    // ---- Transport ----

    fn call(&self, endpoint: &Endpoint, body: &[u8]) -> Result<Vec<u8>, HubError> {
        self.transport
            .send(endpoint, body, self.config.compression)
            .map_err(|e| e.with_context(format!("{} {}", endpoint.action(), endpoint.topic())))
    }
}

fn error_code(e: &RoutingError) -> RecordErrorCode {
    match e {
        RoutingError::InvalidShardId(_) => RecordErrorCode::InvalidShardId,
        RoutingError::InvalidHashKeyFormat(_) => RecordErrorCode::InvalidHashKeyFormat,
        RoutingError::NoShardForHashKey(_) => RecordErrorCode::NoShardForHashKey,
        RoutingError::InvalidTopology(_) => RecordErrorCode::InvalidRecord,
    }
}
