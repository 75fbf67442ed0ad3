//! Repository mapping for domain entities.
//!
//! A repository converts entities to persisted records and back through a
//! resolved [`RepositoryConfig`], and talks to storage through the
//! [`RecordStore`] port. Configurations come from explicit mappers, from
//! generated defaults, or from an entity trait (convention mode).

pub mod builder;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod repository;
pub mod settings;
pub mod store;

pub use builder::{BuilderState, init_builder};
pub use config::{
    ConventionConfig, CustomMappings, Mappers, PartialRepositoryConfig, PrepareQueryFn,
    RepositoryConfig, ToDomainFn, ToOrmFn,
};
pub use error::{
    DOMAIN_MAPPING_FAILED, MapperError, ORM_MAPPING_FAILED, OperationException,
    QUERY_MAPPING_FAILED, RepositoryError, Result, StoreError, StoreResult, TO_ORM_FAILED,
};
pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;
pub use query::{Condition, QueryPredicate};
pub use record::{EntityDescriptor, Record, auto_to_domain, auto_to_orm};
pub use repository::{
    EntityStream, Repository, RepositoryPort, create_repository, create_repository_with_conventions,
    create_repository_with_defaults,
};
pub use settings::StoreSettings;
pub use store::{RecordStore, RecordStoreExt, RecordStream};
