//! Port for handing domain events to a transport.

use std::sync::Arc;

use async_trait::async_trait;
use common::Exception;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::event::DomainEvent;

pub const EVENT_PUBLISH_FAILED: &str = "EVENT_PUBLISH_FAILED";

/// A publisher failed to accept an event.
#[derive(Debug, Clone, Error)]
#[error("failed to publish {tag}: {reason}")]
pub struct PublishError {
    pub tag: String,
    pub reason: String,
}

impl PublishError {
    pub fn new(event: &DomainEvent, reason: impl Into<String>) -> Self {
        Self {
            tag: event.tag.clone(),
            reason: reason.into(),
        }
    }
}

impl Exception for PublishError {
    fn code(&self) -> &str {
        EVENT_PUBLISH_FAILED
    }
}

/// Receives domain events once a command has succeeded.
#[async_trait]
pub trait DomainEventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;

    /// Publishes events in order, stopping at the first failure.
    async fn publish_all(&self, events: &[DomainEvent]) -> Result<(), PublishError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// Publisher that records events in memory.
#[derive(Clone, Default)]
pub struct InMemoryEventPublisher {
    published: Arc<RwLock<Vec<DomainEvent>>>,
    reject_tag: Arc<RwLock<Option<String>>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later publish of events tagged `tag` fail.
    pub async fn reject_events_tagged(&self, tag: impl Into<String>) {
        *self.reject_tag.write().await = Some(tag.into());
    }

    /// Returns all published events in publication order.
    pub async fn published(&self) -> Vec<DomainEvent> {
        self.published.read().await.clone()
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl DomainEventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        if self.reject_tag.read().await.as_deref() == Some(event.tag.as_str()) {
            return Err(PublishError::new(event, "rejected by publisher"));
        }

        tracing::debug!(event_id = %event.event_id, tag = %event.tag, "event published");
        self.published.write().await.push(event.clone());
        Ok(())
    }
}
