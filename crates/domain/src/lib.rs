//! Domain modeling core.
//!
//! This crate provides:
//! - Validation parsers that aggregate field errors
//! - Entity, aggregate and value-object traits built from props parsers
//! - Command application producing new model versions plus domain events
//! - The domain event publisher port

pub mod command;
pub mod entity;
pub mod error;
pub mod event;
pub mod model;
pub mod publisher;
pub mod validation;
pub mod value_object;
pub mod value_objects;

pub use command::{
    Command, CommandOutcome, CommandRejection, CommandResult, Reduced, as_command,
};
pub use common::{Exception, Identifier};
pub use entity::{
    CREATED_AT_FIELD, Entity, EntityParts, EntityTrait, EntityTraitOptions, ID_FIELD,
    UPDATED_AT_FIELD, create_aggregate_trait, create_entity_trait,
};
pub use error::{CoreException, ValidationError, ValidationErrors};
pub use event::{DomainEvent, DomainEventBuilder, EventId};
pub use model::{DomainModel, ModelKind};
pub use publisher::{DomainEventPublisher, InMemoryEventPublisher, PublishError};
pub use validation::{Fields, ParseResult, Parser, PrimitiveTrait, StructParser, parse_struct};
pub use value_object::{ValueObject, ValueObjectTrait, create_value_object_trait};
pub use value_objects::{NonEmptyString, NonEmptyStringMax10, NonEmptyStringMax100};
