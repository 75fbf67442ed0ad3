use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::query::QueryPredicate;
use crate::record::{Record, record_id};
use crate::store::{RecordStore, RecordStream};

/// In-memory record store for testing.
///
/// Records are kept per collection in insertion order and provide the same
/// interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    collections: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in a collection.
    pub async fn record_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Clears every collection.
    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find(
        &self,
        collection: &str,
        predicate: &QueryPredicate,
        relations: &[String],
    ) -> StoreResult<Vec<Record>> {
        tracing::trace!(collection, ?relations, "find");
        let collections = self.collections.read().await;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(predicate.paginate(records.iter().filter(|r| predicate.matches(r)).cloned()))
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        relations: &[String],
    ) -> StoreResult<Option<Record>> {
        tracing::trace!(collection, id, ?relations, "find_by_id");
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned())
    }

    async fn upsert(&self, collection: &str, record: Record) -> StoreResult<()> {
        let id = record_id(&record)
            .ok_or_else(|| StoreError::MissingId {
                collection: collection.to_string(),
            })?
            .to_string();

        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|r| record_id(r) == Some(id.as_str())) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        Ok(records.len() != before)
    }

    async fn stream_all(&self, collection: &str) -> StoreResult<RecordStream> {
        use futures_util::stream;

        let records = self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default();

        Ok(Box::pin(stream::iter(
            records.into_iter().map(Ok::<Record, StoreError>),
        )))
    }
}
