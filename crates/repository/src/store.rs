use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::StoreResult;
use crate::query::QueryPredicate;
use crate::record::Record;

/// A stream of records.
pub type RecordStream = Pin<Box<dyn Stream<Item = StoreResult<Record>> + Send>>;

/// Storage handle the repository reads and writes records through.
///
/// Every operation is scoped to a collection. `relations` name the related
/// data the caller wants loaded with each record; stores that keep records
/// as whole documents already hold it inline. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns records matching `predicate`, oldest first, paginated by its
    /// limit and offset.
    ///
    /// The bundled in-memory and PostgreSQL stores return whole documents and
    /// ignore `relations`.
    async fn find(
        &self,
        collection: &str,
        predicate: &QueryPredicate,
        relations: &[String],
    ) -> StoreResult<Vec<Record>>;

    /// Retrieves a single record by its `id`.
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        relations: &[String],
    ) -> StoreResult<Option<Record>>;

    /// Inserts the record, or replaces the one with the same `id`.
    async fn upsert(&self, collection: &str, record: Record) -> StoreResult<()>;

    /// Deletes a record, returning whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Streams every record of a collection, oldest first.
    async fn stream_all(&self, collection: &str) -> StoreResult<RecordStream>;
}

/// Extension trait providing convenience methods for record stores.
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Returns the first record matching `predicate`.
    async fn find_first(
        &self,
        collection: &str,
        predicate: &QueryPredicate,
        relations: &[String],
    ) -> StoreResult<Option<Record>> {
        let predicate = predicate.clone().limit(1);
        Ok(self
            .find(collection, &predicate, relations)
            .await?
            .into_iter()
            .next())
    }

    /// Checks whether a record with `id` exists.
    async fn contains(&self, collection: &str, id: &str) -> StoreResult<bool> {
        Ok(self.find_by_id(collection, id, &[]).await?.is_some())
    }
}

// Blanket implementation for all RecordStore implementations
impl<T: RecordStore + ?Sized> RecordStoreExt for T {}
