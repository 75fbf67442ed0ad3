//! Persisted records and the generated conversions to and from entities.

use chrono::{DateTime, SecondsFormat, Utc};
use common::Identifier;
use domain::{
    CREATED_AT_FIELD, Entity, EntityParts, ID_FIELD, ModelKind, UPDATED_AT_FIELD,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::OperationException;

/// The persisted representation of an entity.
pub type Record = Map<String, Value>;

/// Where and under which tag an entity type is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Store-level collection (table or document collection) name.
    pub collection: String,

    /// Tag given to rehydrated entities.
    pub tag: &'static str,

    /// Kind given to rehydrated entities.
    pub kind: ModelKind,
}

impl EntityDescriptor {
    /// Describes a plain entity.
    pub fn new(collection: impl Into<String>, tag: &'static str) -> Self {
        Self {
            collection: collection.into(),
            tag,
            kind: ModelKind::Entity,
        }
    }

    /// Describes an aggregate root.
    pub fn aggregate(collection: impl Into<String>, tag: &'static str) -> Self {
        Self {
            kind: ModelKind::AggregateRoot,
            ..Self::new(collection, tag)
        }
    }
}

/// Formats a timestamp the way records store it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Reads the `id` field of a record.
pub fn record_id(record: &Record) -> Option<&str> {
    record
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Drops null members recursively. Strings are left untouched.
pub fn drop_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(drop_nulls).collect()),
        other => other,
    }
}

fn parse_envelope_timestamp(
    record: &mut Record,
    key: &str,
) -> Result<Option<DateTime<Utc>>, OperationException> {
    match record.remove(key) {
        None => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| OperationException::domain_mapping(format!("{key} is not a timestamp: {e}"))),
        Some(other) => Err(OperationException::domain_mapping(format!(
            "{key} is not a timestamp: {other}"
        ))),
    }
}

/// Generated record-to-entity conversion.
///
/// Nulls are dropped, the envelope fields lifted out with their timestamps
/// read in UTC, and the remaining members deserialized into `P`.
pub fn auto_to_domain<P>(
    descriptor: &EntityDescriptor,
    record: &Record,
) -> Result<Entity<P>, OperationException>
where
    P: DeserializeOwned,
{
    let Value::Object(mut fields) = drop_nulls(Value::Object(record.clone())) else {
        return Err(OperationException::domain_mapping("record is not an object"));
    };

    let id = match fields.remove(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Identifier::new(id),
        _ => {
            return Err(OperationException::domain_mapping(format!(
                "{} record has no id",
                descriptor.collection
            )));
        }
    };
    let created_at = parse_envelope_timestamp(&mut fields, CREATED_AT_FIELD)?.ok_or_else(|| {
        OperationException::domain_mapping(format!("{} record {id} has no createdAt", descriptor.collection))
    })?;
    let updated_at = parse_envelope_timestamp(&mut fields, UPDATED_AT_FIELD)?;

    let props: P = serde_json::from_value(Value::Object(fields)).map_err(|e| {
        OperationException::domain_mapping(format!(
            "{} record {id} does not match {}: {e}",
            descriptor.collection, descriptor.tag
        ))
    })?;

    Ok(Entity::from_parts(EntityParts {
        tag: descriptor.tag,
        kind: descriptor.kind,
        id,
        created_at,
        updated_at,
        props,
    }))
}

/// Generated entity-to-record conversion.
///
/// Starts from `existing` so columns the entity does not model survive.
/// A null prop clears its key; nested objects are written with their nulls
/// dropped.
pub fn auto_to_orm<P>(
    entity: &Entity<P>,
    existing: Option<&Record>,
) -> Result<Record, OperationException>
where
    P: Serialize,
{
    let props = serde_json::to_value(entity.unpack())
        .map_err(|e| OperationException::orm_mapping(format!("cannot serialize {}: {e}", entity.tag())))?;
    let Value::Object(props) = props else {
        return Err(OperationException::orm_mapping(format!(
            "{} props must serialize to an object",
            entity.tag()
        )));
    };

    let mut record = existing.cloned().unwrap_or_default();
    for (key, value) in props {
        if value.is_null() {
            record.remove(&key);
        } else {
            record.insert(key, drop_nulls(value));
        }
    }

    record.insert(ID_FIELD.to_string(), Value::String(entity.id().to_string()));
    record.insert(
        CREATED_AT_FIELD.to_string(),
        Value::String(format_timestamp(entity.created_at())),
    );
    match entity.updated_at() {
        Some(at) => {
            record.insert(UPDATED_AT_FIELD.to_string(), Value::String(format_timestamp(at)));
        }
        None => {
            record.remove(UPDATED_AT_FIELD);
        }
    }

    Ok(record)
}
