//! Incremental repository configuration.

use std::sync::Arc;

use domain::Entity;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{PartialRepositoryConfig, RepositoryConfig};
use crate::error::MapperError;
use crate::query::QueryPredicate;
use crate::record::{EntityDescriptor, Record};
use crate::repository::Repository;
use crate::store::RecordStore;

/// Starts a builder for the entity stored under `descriptor`.
pub fn init_builder<P, Q>(descriptor: EntityDescriptor) -> BuilderState<P, Q> {
    BuilderState {
        partial: PartialRepositoryConfig::new(descriptor),
    }
}

/// Accumulated builder configuration.
///
/// Every `with_*` call returns a new state; cloning a state before a call
/// leaves the clone untouched.
///
/// # Example
///
/// ```ignore
/// let repository = init_builder::<Book, BookQuery>(EntityDescriptor::new("books", "Book"))
///     .with_relations(["author"])
///     .with_query_mapper(|q: &BookQuery| Ok(QueryPredicate::new().eq("title", q.title.clone())))
///     .build_repository(store);
/// ```
pub struct BuilderState<P, Q> {
    partial: PartialRepositoryConfig<P, Q>,
}

impl<P, Q> Clone for BuilderState<P, Q> {
    fn clone(&self) -> Self {
        Self {
            partial: self.partial.clone(),
        }
    }
}

impl<P, Q> BuilderState<P, Q> {
    pub fn with_relations<S: Into<String>>(mut self, relations: impl IntoIterator<Item = S>) -> Self {
        self.partial.relations = relations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_domain_mapper<F>(mut self, to_domain: F) -> Self
    where
        F: Fn(&Record) -> Result<Entity<P>, MapperError> + Send + Sync + 'static,
    {
        self.partial.to_domain = Some(Arc::new(to_domain));
        self
    }

    pub fn with_orm_mapper<F>(mut self, to_orm: F) -> Self
    where
        F: Fn(&Entity<P>, Option<&Record>) -> Result<Record, MapperError> + Send + Sync + 'static,
    {
        self.partial.to_orm = Some(Arc::new(to_orm));
        self
    }

    pub fn with_query_mapper<F>(mut self, prepare_query: F) -> Self
    where
        F: Fn(&Q) -> Result<QueryPredicate, MapperError> + Send + Sync + 'static,
    {
        self.partial.prepare_query = Some(Arc::new(prepare_query));
        self
    }

    /// The configuration so far, with missing members generated.
    pub fn build(&self) -> RepositoryConfig<P, Q>
    where
        P: Serialize + DeserializeOwned + 'static,
        Q: Serialize + 'static,
    {
        self.partial.clone().complete()
    }

    /// Builds the configuration and binds it to a store.
    pub fn build_repository<S: RecordStore>(&self, store: S) -> Repository<P, Q, S>
    where
        P: Serialize + DeserializeOwned + 'static,
        Q: Serialize + 'static,
    {
        Repository::new(self.build(), store)
    }
}
