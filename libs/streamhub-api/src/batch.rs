use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::record::Record;

/// Stable error symbol for a record rejected inside a put batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordErrorCode {
    InvalidShardId,
    InvalidHashKeyFormat,
    NoShardForHashKey,
    InvalidRecord,
    LimitExceeded,
    /// Code this client version does not know about.
    Other(String),
}

impl RecordErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            RecordErrorCode::InvalidShardId => "InvalidShardId",
            RecordErrorCode::InvalidHashKeyFormat => "InvalidHashKeyFormat",
            RecordErrorCode::NoShardForHashKey => "NoShardForHashKey",
            RecordErrorCode::InvalidRecord => "InvalidRecord",
            RecordErrorCode::LimitExceeded => "LimitExceeded",
            RecordErrorCode::Other(code) => code,
        }
    }
}

impl From<String> for RecordErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "InvalidShardId" => RecordErrorCode::InvalidShardId,
            "InvalidHashKeyFormat" => RecordErrorCode::InvalidHashKeyFormat,
            "NoShardForHashKey" => RecordErrorCode::NoShardForHashKey,
            "InvalidRecord" => RecordErrorCode::InvalidRecord,
            "LimitExceeded" => RecordErrorCode::LimitExceeded,
            _ => RecordErrorCode::Other(code),
        }
    }
}

impl From<RecordErrorCode> for String {
    fn from(code: RecordErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl std::fmt::Display for RecordErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected record of a put batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailedRecord {
    /// Position in the batch the caller submitted.
    pub index: usize,
    pub error_code: RecordErrorCode,
    pub error_message: String,
}

/// Outcome of a put. Rejections are data: the call itself succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutRecordsResult {
    pub attempted: usize,
    /// Sorted by `index`.
    pub failed_records: Vec<FailedRecord>,
}

impl PutRecordsResult {
    pub fn failed_record_count(&self) -> usize {
        self.failed_records.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.attempted.saturating_sub(self.failed_records.len())
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed_records.iter().map(|f| f.index).collect()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_records.is_empty()
    }
}

/// Outcome of a get. Records are contiguous in sequence from `start_seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRecordsResult {
    pub start_seq: i64,
    pub records: Vec<Record>,
    /// Cursor for the following read. Equal to the request cursor when empty.
    pub next_cursor: Cursor,
}

impl GetRecordsResult {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_keep_unknown_symbols() {
        let known: RecordErrorCode = "InvalidShardId".to_string().into();
        assert_eq!(known, RecordErrorCode::InvalidShardId);
        let unknown: RecordErrorCode = "Throttled".to_string().into();
        assert_eq!(unknown.as_str(), "Throttled");
    }

    #[test]
    fn failed_record_json() {
        let failed: FailedRecord = serde_json::from_str(
            r#"{"Index":2,"ErrorCode":"InvalidShardId","ErrorMessage":"Invalid shard id: -1"}"#,
        )
        .unwrap();
        assert_eq!(failed.index, 2);
        assert_eq!(failed.error_code, RecordErrorCode::InvalidShardId);
        assert_eq!(failed.error_message, "Invalid shard id: -1");
    }

    #[test]
    fn put_result_counts() {
        let result = PutRecordsResult {
            attempted: 6,
            failed_records: vec![
                FailedRecord {
                    index: 2,
                    error_code: RecordErrorCode::InvalidHashKeyFormat,
                    error_message: "bad".into(),
                },
                FailedRecord {
                    index: 5,
                    error_code: RecordErrorCode::InvalidHashKeyFormat,
                    error_message: "bad".into(),
                },
            ],
        };
        assert_eq!(result.failed_record_count(), 2);
        assert_eq!(result.succeeded_count(), 4);
        assert_eq!(result.failed_indices(), vec![2, 5]);
        assert!(!result.is_complete_success());
    }

    #[test]
    fn succeeded_count_never_underflows() {
        let failed = FailedRecord {
            index: 0,
            error_code: RecordErrorCode::InvalidRecord,
            error_message: "bad".into(),
        };
        let result = PutRecordsResult {
            attempted: 1,
            failed_records: vec![failed.clone(), failed],
        };
        assert_eq!(result.succeeded_count(), 0);
    }
}
