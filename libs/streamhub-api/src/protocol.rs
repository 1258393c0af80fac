//! JSON control messages exchanged with the service, and the framing of
//! a get-records response (`u32` meta length, meta JSON, record envelope).

use serde::{Deserialize, Serialize};

use crate::batch::FailedRecord;
use crate::cursor::{Cursor, CursorType};
use crate::error::HubError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordsResponse {
    pub failed_record_count: usize,
    #[serde(default)]
    pub failed_records: Vec<FailedRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRecordsRequest {
    pub cursor: Cursor,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRecordsMeta {
    pub next_cursor: Cursor,
    pub record_count: usize,
    pub start_seq: i64,
}

/// Serialized as the bare cursor type: `{"Type":"SEQUENCE","Param":2}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GetCursorRequest {
    pub cursor_type: CursorType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetCursorResponse {
    pub cursor: Cursor,
    pub sequence: i64,
    #[serde(default)]
    pub record_time: Option<i64>,
}

const META_LEN_BYTES: usize = 4;

/// Assemble a get-records response frame.
pub fn encode_get_response(meta: &GetRecordsMeta, envelope: &[u8]) -> Result<Vec<u8>, HubError> {
    let meta_json = serde_json::to_vec(meta)?;
    let meta_len = u32::try_from(meta_json.len())
        .map_err(|_| HubError::Protocol(format!("meta too large: {} bytes", meta_json.len())))?;
    let mut frame = Vec::with_capacity(META_LEN_BYTES + meta_json.len() + envelope.len());
    frame.extend_from_slice(&meta_len.to_be_bytes());
    frame.extend_from_slice(&meta_json);
    frame.extend_from_slice(envelope);
    Ok(frame)
}

/// Split a get-records response frame into its meta and record envelope.
pub fn decode_get_response(frame: &[u8]) -> Result<(GetRecordsMeta, &[u8]), HubError> {
    if frame.len() < META_LEN_BYTES {
        return Err(HubError::Protocol(format!(
            "get response too short: {} bytes",
            frame.len()
        )));
    }
    let (len_bytes, rest) = frame.split_at(META_LEN_BYTES);
    let meta_len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    if rest.len() < meta_len {
        return Err(HubError::Protocol(format!(
            "get response meta claims {meta_len} bytes, {} available",
            rest.len()
        )));
    }
    let (meta_json, envelope) = rest.split_at(meta_len);
    let meta: GetRecordsMeta = serde_json::from_slice(meta_json)?;
    Ok((meta, envelope))
}
