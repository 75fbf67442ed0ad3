//! Identity-bearing models and the traits that construct them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::Identifier;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ValidationError, ValidationErrors};
use crate::model::{DomainModel, ModelKind};
use crate::validation::{ParseResult, Parser, parse_struct, timestamp};

/// Envelope key holding the identifier.
pub const ID_FIELD: &str = "id";
/// Envelope key holding the creation timestamp.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Envelope key holding the last-update timestamp.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

pub const MISSING_IDENTIFIER: &str = "MISSING_IDENTIFIER";
pub const INVALID_IDENTIFIER: &str = "INVALID_IDENTIFIER";
pub const INVALID_INPUT: &str = "INVALID_INPUT";

/// An immutable, identity-bearing domain model.
///
/// Instances are produced by an [`EntityTrait`] or rehydrated from trusted
/// storage with [`Entity::from_parts`]. Every change yields a new value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity<P> {
    #[serde(rename = "_tag")]
    tag: &'static str,
    kind: ModelKind,
    id: Identifier,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    props: P,
}

/// The raw pieces of an entity, used to rehydrate already-validated state.
#[derive(Debug, Clone)]
pub struct EntityParts<P> {
    pub tag: &'static str,
    pub kind: ModelKind,
    pub id: Identifier,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub props: P,
}

impl<P> Entity<P> {
    /// Rehydrates an entity without running a props parser.
    ///
    /// The caller vouches for `props`; the repository uses this after serde
    /// has type-checked a stored record.
    pub fn from_parts(parts: EntityParts<P>) -> Self {
        Self {
            tag: parts.tag,
            kind: parts.kind,
            id: parts.id,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            props: parts.props,
        }
    }

    pub fn into_parts(self) -> EntityParts<P> {
        EntityParts {
            tag: self.tag,
            kind: self.kind,
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            props: self.props,
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns the properties.
    pub fn unpack(&self) -> &P {
        &self.props
    }

    pub fn into_props(self) -> P {
        self.props
    }

    /// Returns a copy with `updated_at` refreshed.
    pub fn mark_updated(&self) -> Self
    where
        P: Clone,
    {
        Self {
            updated_at: Some(self.next_update_stamp()),
            props: self.props.clone(),
            id: self.id.clone(),
            ..*self
        }
    }

    /// Replaces the properties and refreshes `updated_at`.
    pub(crate) fn with_props(self, props: P) -> Self {
        let updated_at = Some(self.next_update_stamp());
        Self {
            props,
            updated_at,
            ..self
        }
    }

    /// The current time, bumped past the previous stamp if the clock has
    /// not advanced.
    fn next_update_stamp(&self) -> DateTime<Utc> {
        let floor = self.updated_at.unwrap_or(self.created_at);
        let now = Utc::now();
        if now > floor {
            now
        } else {
            floor + Duration::nanoseconds(1)
        }
    }
}

impl<P> PartialEq for Entity<P> {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.id == other.id
    }
}

impl<P> Eq for Entity<P> {}

impl<P> DomainModel for Entity<P> {
    type Props = P;

    fn tag(&self) -> &'static str {
        self.tag
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn unpack(&self) -> &P {
        &self.props
    }

    fn is_equal(&self, other: &Self) -> bool {
        self == other
    }
}

/// Options for [`create_entity_trait`].
#[derive(Debug, Clone, Copy)]
pub struct EntityTraitOptions {
    /// Generate a UUID when the input carries no identifier.
    pub auto_gen_id: bool,
}

impl Default for EntityTraitOptions {
    fn default() -> Self {
        Self { auto_gen_id: true }
    }
}

/// Constructs entities of one tag from raw input.
pub struct EntityTrait<P> {
    tag: &'static str,
    kind: ModelKind,
    options: EntityTraitOptions,
    props_parser: Arc<dyn Parser<P>>,
}

impl<P> Clone for EntityTrait<P> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag,
            kind: self.kind,
            options: self.options,
            props_parser: Arc::clone(&self.props_parser),
        }
    }
}

/// Creates the trait for a plain entity.
pub fn create_entity_trait<P>(
    props_parser: impl Parser<P> + 'static,
    tag: &'static str,
    options: EntityTraitOptions,
) -> EntityTrait<P> {
    EntityTrait {
        tag,
        kind: ModelKind::Entity,
        options,
        props_parser: Arc::new(props_parser),
    }
}

/// Creates the trait for an aggregate root.
pub fn create_aggregate_trait<P>(
    props_parser: impl Parser<P> + 'static,
    tag: &'static str,
    options: EntityTraitOptions,
) -> EntityTrait<P> {
    EntityTrait {
        kind: ModelKind::AggregateRoot,
        ..create_entity_trait(props_parser, tag, options)
    }
}

struct Metadata {
    id: Identifier,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl<P> EntityTrait<P> {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Parses raw input into an entity.
    ///
    /// The props parser sees the whole input. Its errors are returned as-is;
    /// envelope fields are only checked once the props are valid.
    pub fn parse(&self, input: &Value) -> ParseResult<Entity<P>> {
        let props = self.props_parser.parse(input)?;
        let meta = self.resolve_metadata(input)?;

        Ok(Entity {
            tag: self.tag,
            kind: self.kind,
            id: meta.id,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            props,
        })
    }

    /// Builds an entity from typed creation params.
    pub fn new<N>(&self, params: &N) -> ParseResult<Entity<P>>
    where
        N: Serialize + ?Sized,
    {
        let input = serde_json::to_value(params)
            .map_err(|e| ValidationErrors::single(INVALID_INPUT, e.to_string()))?;
        self.parse(&input)
    }

    fn resolve_metadata(&self, input: &Value) -> ParseResult<Metadata> {
        parse_struct(input, |fields| {
            let id = fields.optional(ID_FIELD, identifier).map(Option::flatten);
            let created_at = fields.optional(CREATED_AT_FIELD, timestamp);
            let updated_at = fields.optional(UPDATED_AT_FIELD, timestamp);

            let id = match id? {
                Some(id) => id,
                None if self.options.auto_gen_id => Identifier::generate(),
                None => {
                    fields.reject(
                        ValidationError::new(MISSING_IDENTIFIER, "an identifier is required")
                            .at(ID_FIELD),
                    );
                    return None;
                }
            };

            Some(Metadata {
                id,
                created_at: created_at?.unwrap_or_else(Utc::now),
                updated_at: updated_at?,
            })
        })
    }
}

/// Reads an identifier, treating the empty string as absent.
fn identifier(raw: &Value) -> ParseResult<Option<Identifier>> {
    match raw {
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(Identifier::new(s.clone()))),
        _ => Err(ValidationErrors::single(
            INVALID_IDENTIFIER,
            "identifier must be a string",
        )),
    }
}
