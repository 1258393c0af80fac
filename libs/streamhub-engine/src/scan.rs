use streamhub_api::{Cursor, GetRecordsResult, HubError, SchemaRef, TopicRef};

use crate::client::StreamClient;

/// Iterator over consecutive `get_records` batches of one shard.
///
/// Yields non-empty batches only. Stops at the first empty batch (caught
/// up with the shard) or after yielding an error. `cursor()` is where a
/// new scan would resume.
pub struct Scan<'a> {
    client: &'a StreamClient,
    topic: &'a TopicRef,
    shard_id: &'a str,
    schema: Option<&'a SchemaRef>,
    cursor: Cursor,
    limit: usize,
    done: bool,
}

impl<'a> Scan<'a> {
    pub(crate) fn new(
        client: &'a StreamClient,
        topic: &'a TopicRef,
        shard_id: &'a str,
        cursor: Cursor,
        limit: usize,
        schema: Option<&'a SchemaRef>,
    ) -> Self {
        Self {
            client,
            topic,
            shard_id,
            schema,
            cursor,
            limit,
            done: false,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<GetRecordsResult, HubError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self
            .client
            .get_records(self.topic, self.shard_id, &self.cursor, self.limit, self.schema)
        {
            Ok(batch) if batch.is_empty() => {
                self.done = true;
                None
            }
            Ok(batch) => {
                self.cursor = batch.next_cursor.clone();
                Some(Ok(batch))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
