//! Repository configuration and its three construction modes.
//!
//! - Explicit: [`RepositoryConfig::new`] with every member supplied.
//! - Auto: [`PartialRepositoryConfig::complete`] synthesizes what is missing.
//! - Convention: [`ConventionConfig::into_config`] parses rows through the
//!   entity's own trait.

use std::sync::Arc;

use domain::{CREATED_AT_FIELD, Entity, EntityTrait, UPDATED_AT_FIELD};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{MapperError, OperationException};
use crate::query::QueryPredicate;
use crate::record::{EntityDescriptor, Record, auto_to_domain, auto_to_orm, record_id};

/// Record-to-entity conversion.
pub type ToDomainFn<P> = dyn Fn(&Record) -> Result<Entity<P>, MapperError> + Send + Sync;

/// Entity-to-record conversion; receives the stored record, if any.
pub type ToOrmFn<P> =
    dyn Fn(&Entity<P>, Option<&Record>) -> Result<Record, MapperError> + Send + Sync;

/// Query-params-to-predicate conversion.
pub type PrepareQueryFn<Q> = dyn Fn(&Q) -> Result<QueryPredicate, MapperError> + Send + Sync;

/// The bidirectional converters of a repository.
pub struct Mappers<P> {
    pub to_domain: Arc<ToDomainFn<P>>,
    pub to_orm: Arc<ToOrmFn<P>>,
}

impl<P> Mappers<P> {
    pub fn new<D, O>(to_domain: D, to_orm: O) -> Self
    where
        D: Fn(&Record) -> Result<Entity<P>, MapperError> + Send + Sync + 'static,
        O: Fn(&Entity<P>, Option<&Record>) -> Result<Record, MapperError> + Send + Sync + 'static,
    {
        Self {
            to_domain: Arc::new(to_domain),
            to_orm: Arc::new(to_orm),
        }
    }
}

impl<P> Clone for Mappers<P> {
    fn clone(&self) -> Self {
        Self {
            to_domain: Arc::clone(&self.to_domain),
            to_orm: Arc::clone(&self.to_orm),
        }
    }
}

/// A fully resolved repository configuration.
pub struct RepositoryConfig<P, Q> {
    pub descriptor: EntityDescriptor,
    /// Related data loaded with every read, in order.
    pub relations: Vec<String>,
    pub mappers: Mappers<P>,
    pub prepare_query: Arc<PrepareQueryFn<Q>>,
}

impl<P, Q> RepositoryConfig<P, Q> {
    /// Explicit mode: every member is supplied and used as-is.
    pub fn new<F>(
        descriptor: EntityDescriptor,
        relations: Vec<String>,
        mappers: Mappers<P>,
        prepare_query: F,
    ) -> Self
    where
        F: Fn(&Q) -> Result<QueryPredicate, MapperError> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            relations,
            mappers,
            prepare_query: Arc::new(prepare_query),
        }
    }
}

impl<P, Q> Clone for RepositoryConfig<P, Q> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            relations: self.relations.clone(),
            mappers: self.mappers.clone(),
            prepare_query: Arc::clone(&self.prepare_query),
        }
    }
}

/// Generated `to_domain` for a descriptor.
pub fn auto_to_domain_mapper<P>(descriptor: EntityDescriptor) -> Arc<ToDomainFn<P>>
where
    P: DeserializeOwned + 'static,
{
    Arc::new(move |record: &Record| -> Result<Entity<P>, MapperError> {
        Ok(auto_to_domain(&descriptor, record)?)
    })
}

/// Generated `to_orm`.
pub fn auto_to_orm_mapper<P>() -> Arc<ToOrmFn<P>>
where
    P: Serialize + 'static,
{
    Arc::new(
        |entity: &Entity<P>, existing: Option<&Record>| -> Result<Record, MapperError> {
            Ok(auto_to_orm(entity, existing)?)
        },
    )
}

/// Generated `prepare_query`: the serialized params as an equality predicate.
pub fn auto_prepare_query<Q>() -> Arc<PrepareQueryFn<Q>>
where
    Q: Serialize + 'static,
{
    Arc::new(|params: &Q| -> Result<QueryPredicate, MapperError> {
        Ok(QueryPredicate::from_params(params)?)
    })
}

/// A configuration with optional members, completed with generated ones.
pub struct PartialRepositoryConfig<P, Q> {
    pub descriptor: EntityDescriptor,
    pub relations: Vec<String>,
    pub to_domain: Option<Arc<ToDomainFn<P>>>,
    pub to_orm: Option<Arc<ToOrmFn<P>>>,
    pub prepare_query: Option<Arc<PrepareQueryFn<Q>>>,
}

impl<P, Q> PartialRepositoryConfig<P, Q> {
    /// Starts with nothing but the descriptor.
    pub fn new(descriptor: EntityDescriptor) -> Self {
        Self {
            descriptor,
            relations: Vec::new(),
            to_domain: None,
            to_orm: None,
            prepare_query: None,
        }
    }

    /// Auto mode: fills every missing member with its generated default.
    pub fn complete(self) -> RepositoryConfig<P, Q>
    where
        P: Serialize + DeserializeOwned + 'static,
        Q: Serialize + 'static,
    {
        let to_domain = self
            .to_domain
            .unwrap_or_else(|| auto_to_domain_mapper(self.descriptor.clone()));

        RepositoryConfig {
            mappers: Mappers {
                to_domain,
                to_orm: self.to_orm.unwrap_or_else(auto_to_orm_mapper),
            },
            prepare_query: self.prepare_query.unwrap_or_else(auto_prepare_query),
            descriptor: self.descriptor,
            relations: self.relations,
        }
    }
}

impl<P, Q> Clone for PartialRepositoryConfig<P, Q> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            relations: self.relations.clone(),
            to_domain: self.to_domain.clone(),
            to_orm: self.to_orm.clone(),
            prepare_query: self.prepare_query.clone(),
        }
    }
}

/// Mapper overrides for convention mode.
pub struct CustomMappings<P> {
    pub to_domain: Option<Arc<ToDomainFn<P>>>,
    pub to_orm: Option<Arc<ToOrmFn<P>>>,
}

impl<P> Default for CustomMappings<P> {
    fn default() -> Self {
        Self {
            to_domain: None,
            to_orm: None,
        }
    }
}

/// Convention mode: rows are parsed by the entity's own trait.
pub struct ConventionConfig<P, Q> {
    pub descriptor: EntityDescriptor,
    pub domain_trait: EntityTrait<P>,
    pub relations: Vec<String>,
    pub prepare_query: Option<Arc<PrepareQueryFn<Q>>>,
    pub custom_mappings: CustomMappings<P>,
}

impl<P, Q> ConventionConfig<P, Q> {
    pub fn new(descriptor: EntityDescriptor, domain_trait: EntityTrait<P>) -> Self {
        Self {
            descriptor,
            domain_trait,
            relations: Vec::new(),
            prepare_query: None,
            custom_mappings: CustomMappings::default(),
        }
    }

    /// Resolves the convention into a full configuration.
    ///
    /// Rows without a string `id` and validation failures of the trait
    /// become `DOMAIN_MAPPING_FAILED`.
    /// Overridden mappers replace only themselves.
    pub fn into_config(self) -> RepositoryConfig<P, Q>
    where
        P: Serialize + 'static,
        Q: Serialize + 'static,
    {
        let to_domain = self.custom_mappings.to_domain.unwrap_or_else(|| {
            let domain_trait = self.domain_trait;
            Arc::new(move |row: &Record| -> Result<Entity<P>, MapperError> {
                if record_id(row).is_none() {
                    return Err(OperationException::domain_mapping(format!(
                        "{} row has no id",
                        domain_trait.tag()
                    ))
                    .into());
                }
                domain_trait
                    .parse(&Value::Object(convention_input(row)))
                    .map_err(|errors| OperationException::domain_mapping(errors.to_string()).into())
            })
        });

        RepositoryConfig {
            descriptor: self.descriptor,
            relations: self.relations,
            mappers: Mappers {
                to_domain,
                to_orm: self.custom_mappings.to_orm.unwrap_or_else(auto_to_orm_mapper),
            },
            prepare_query: self.prepare_query.unwrap_or_else(auto_prepare_query),
        }
    }
}

/// The row with null envelope timestamps treated as absent.
fn convention_input(row: &Record) -> Record {
    let mut input = row.clone();
    for key in [CREATED_AT_FIELD, UPDATED_AT_FIELD] {
        if input.get(key).is_some_and(Value::is_null) {
            input.remove(key);
        }
    }
    input
}
