//! Domain events surfaced by commands.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::Identifier;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::Entity;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Something that happened to an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// The event name (e.g., "AccountOpened").
    pub tag: String,

    /// The aggregate the event belongs to.
    pub aggregate_id: Identifier,

    /// The aggregate's tag, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_tag: Option<String>,

    pub occurred_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Additional metadata about the event.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl DomainEvent {
    /// Creates an event stamped now.
    pub fn new(
        tag: impl Into<String>,
        aggregate_id: Identifier,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            tag: tag.into(),
            aggregate_id,
            aggregate_tag: None,
            occurred_at: Utc::now(),
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Creates an event about `entity`.
    pub fn for_entity<P>(
        tag: impl Into<String>,
        entity: &Entity<P>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_tag: Some(entity.tag().to_string()),
            ..Self::new(tag, entity.id().clone(), payload)
        }
    }

    pub fn builder() -> DomainEventBuilder {
        DomainEventBuilder::default()
    }

    /// Deserializes the payload into a typed event body.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Builder for domain events.
#[derive(Debug, Default)]
pub struct DomainEventBuilder {
    event_id: Option<EventId>,
    tag: Option<String>,
    aggregate_id: Option<Identifier>,
    aggregate_tag: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    metadata: HashMap<String, serde_json::Value>,
}

impl DomainEventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn aggregate_id(mut self, id: Identifier) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    /// Sets both the aggregate ID and tag from an entity.
    pub fn aggregate<P>(mut self, entity: &Entity<P>) -> Self {
        self.aggregate_id = Some(entity.id().clone());
        self.aggregate_tag = Some(entity.tag().to_string());
        self
    }

    /// Sets the time of occurrence. Defaults to now.
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the event, returning None if the tag or aggregate ID is missing.
    ///
    /// A missing payload becomes JSON `null`.
    pub fn try_build(self) -> Option<DomainEvent> {
        Some(DomainEvent {
            event_id: self.event_id.unwrap_or_default(),
            tag: self.tag?,
            aggregate_id: self.aggregate_id?,
            aggregate_tag: self.aggregate_tag,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            payload: self.payload.unwrap_or(serde_json::Value::Null),
            metadata: self.metadata,
        })
    }
}
