//! The repository port and its record-store-backed implementation.

use std::pin::Pin;

use async_trait::async_trait;
use common::Identifier;
use domain::Entity;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{ConventionConfig, PartialRepositoryConfig, RepositoryConfig};
use crate::error::{
    DOMAIN_MAPPING_FAILED, MapperError, OperationException, QUERY_MAPPING_FAILED, Result,
    TO_ORM_FAILED,
};
use crate::query::QueryPredicate;
use crate::record::Record;
use crate::store::{RecordStore, RecordStoreExt};

/// A stream of rehydrated entities.
pub type EntityStream<P> = Pin<Box<dyn Stream<Item = Result<Entity<P>>> + Send>>;

/// Persistence operations for one entity type.
///
/// `Q` is the query-params type accepted by the finders.
#[async_trait]
pub trait RepositoryPort<P, Q>: Send + Sync
where
    P: Send + Sync + 'static,
    Q: Send + Sync + 'static,
{
    /// Loads the entity with `id`, if stored.
    async fn find_one_by_id(&self, id: &Identifier) -> Result<Option<Entity<P>>>;

    /// Loads the first entity matching `query`.
    async fn find_one(&self, query: &Q) -> Result<Option<Entity<P>>>;

    /// Loads every entity matching `query`.
    async fn find_many(&self, query: &Q) -> Result<Vec<Entity<P>>>;

    /// Streams every stored entity, oldest first.
    async fn find_all(&self) -> Result<EntityStream<P>>;

    /// Inserts or replaces the entity's record.
    async fn save(&self, entity: &Entity<P>) -> Result<()>;

    /// Saves several entities. Nothing is written if any of them fails to map.
    async fn save_many(&self, entities: &[Entity<P>]) -> Result<()>;

    /// Removes the entity's record, returning whether it existed.
    async fn delete(&self, entity: &Entity<P>) -> Result<bool>;

    async fn exists(&self, query: &Q) -> Result<bool>;
}

/// Repository resolved from a [`RepositoryConfig`] over a [`RecordStore`].
pub struct Repository<P, Q, S> {
    config: RepositoryConfig<P, Q>,
    store: S,
}

impl<P, Q, S> Repository<P, Q, S> {
    pub fn new(config: RepositoryConfig<P, Q>, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &RepositoryConfig<P, Q> {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn collection(&self) -> &str {
        &self.config.descriptor.collection
    }

    /// Tags a mapper error and records it.
    fn fault(&self, error: MapperError, code: &str) -> OperationException {
        let fault = OperationException::retag(error, code);
        tracing::debug!(
            collection = %self.config.descriptor.collection,
            code = %fault.code,
            message = %fault.message,
            "mapping failed"
        );
        metrics::counter!("repository_mapping_failures_total", "code" => fault.code.clone())
            .increment(1);
        fault
    }

    fn to_domain(&self, record: &Record) -> std::result::Result<Entity<P>, OperationException> {
        (self.config.mappers.to_domain)(record).map_err(|e| self.fault(e, DOMAIN_MAPPING_FAILED))
    }

    fn to_orm(
        &self,
        entity: &Entity<P>,
        existing: Option<&Record>,
    ) -> std::result::Result<Record, OperationException> {
        (self.config.mappers.to_orm)(entity, existing).map_err(|e| self.fault(e, TO_ORM_FAILED))
    }

    fn prepare_query(&self, query: &Q) -> std::result::Result<QueryPredicate, OperationException> {
        (self.config.prepare_query)(query).map_err(|e| self.fault(e, QUERY_MAPPING_FAILED))
    }
}

impl<P, Q, S> Repository<P, Q, S>
where
    P: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    S: RecordStore,
{
    /// Maps an entity over its stored record.
    async fn record_for(&self, entity: &Entity<P>) -> Result<Record> {
        let existing = self
            .store
            .find_by_id(self.collection(), entity.id().as_str(), &[])
            .await?;
        Ok(self.to_orm(entity, existing.as_ref())?)
    }
}

#[async_trait]
impl<P, Q, S> RepositoryPort<P, Q> for Repository<P, Q, S>
where
    P: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    S: RecordStore,
{
    #[tracing::instrument(skip(self))]
    async fn find_one_by_id(&self, id: &Identifier) -> Result<Option<Entity<P>>> {
        metrics::counter!("repository_operations_total", "operation" => "find_one_by_id")
            .increment(1);

        let record = self
            .store
            .find_by_id(self.collection(), id.as_str(), &self.config.relations)
            .await?;
        match record {
            Some(record) => Ok(Some(self.to_domain(&record)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, query))]
    async fn find_one(&self, query: &Q) -> Result<Option<Entity<P>>> {
        metrics::counter!("repository_operations_total", "operation" => "find_one").increment(1);

        let predicate = self.prepare_query(query)?;
        let record = self
            .store
            .find_first(self.collection(), &predicate, &self.config.relations)
            .await?;
        match record {
            Some(record) => Ok(Some(self.to_domain(&record)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, query))]
    async fn find_many(&self, query: &Q) -> Result<Vec<Entity<P>>> {
        metrics::counter!("repository_operations_total", "operation" => "find_many").increment(1);

        let predicate = self.prepare_query(query)?;
        let records = self
            .store
            .find(self.collection(), &predicate, &self.config.relations)
            .await?;

        let mut entities = Vec::with_capacity(records.len());
        for record in &records {
            entities.push(self.to_domain(record)?);
        }
        tracing::debug!(count = entities.len(), "entities loaded");
        Ok(entities)
    }

    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<EntityStream<P>> {
        metrics::counter!("repository_operations_total", "operation" => "find_all").increment(1);

        let records = self.store.stream_all(self.collection()).await?;
        let to_domain = self.config.mappers.to_domain.clone();
        let collection = self.config.descriptor.collection.clone();

        let entities = records.map(move |record| -> Result<Entity<P>> {
            let record = record?;
            to_domain(&record).map_err(|e| {
                let fault = OperationException::retag(e, DOMAIN_MAPPING_FAILED);
                tracing::debug!(%collection, code = %fault.code, "mapping failed while streaming");
                metrics::counter!("repository_mapping_failures_total", "code" => fault.code.clone())
                    .increment(1);
                fault.into()
            })
        });

        Ok(Box::pin(entities))
    }

    #[tracing::instrument(skip(self, entity), fields(id = %entity.id()))]
    async fn save(&self, entity: &Entity<P>) -> Result<()> {
        metrics::counter!("repository_operations_total", "operation" => "save").increment(1);

        let record = self.record_for(entity).await?;
        self.store.upsert(self.collection(), record).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, entities), fields(count = entities.len()))]
    async fn save_many(&self, entities: &[Entity<P>]) -> Result<()> {
        metrics::counter!("repository_operations_total", "operation" => "save_many").increment(1);

        let mut records = Vec::with_capacity(entities.len());
        for entity in entities {
            records.push(self.record_for(entity).await?);
        }
        for record in records {
            self.store.upsert(self.collection(), record).await?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, entity), fields(id = %entity.id()))]
    async fn delete(&self, entity: &Entity<P>) -> Result<bool> {
        metrics::counter!("repository_operations_total", "operation" => "delete").increment(1);

        Ok(self
            .store
            .delete(self.collection(), entity.id().as_str())
            .await?)
    }

    #[tracing::instrument(skip(self, query))]
    async fn exists(&self, query: &Q) -> Result<bool> {
        metrics::counter!("repository_operations_total", "operation" => "exists").increment(1);

        let predicate = self.prepare_query(query)?;
        Ok(self
            .store
            .find_first(self.collection(), &predicate, &[])
            .await?
            .is_some())
    }
}

/// Creates a repository from an explicit configuration.
pub fn create_repository<P, Q, S>(config: RepositoryConfig<P, Q>, store: S) -> Repository<P, Q, S>
where
    S: RecordStore,
{
    Repository::new(config, store)
}

/// Creates a repository, generating every mapper the configuration lacks.
pub fn create_repository_with_defaults<P, Q, S>(
    partial: PartialRepositoryConfig<P, Q>,
    store: S,
) -> Repository<P, Q, S>
where
    P: Serialize + DeserializeOwned + 'static,
    Q: Serialize + 'static,
    S: RecordStore,
{
    Repository::new(partial.complete(), store)
}

/// Creates a repository whose rows are parsed by the entity's own trait.
pub fn create_repository_with_conventions<P, Q, S>(
    convention: ConventionConfig<P, Q>,
    store: S,
) -> Repository<P, Q, S>
where
    P: Serialize + 'static,
    Q: Serialize + 'static,
    S: RecordStore,
{
    Repository::new(convention.into_config(), store)
}
