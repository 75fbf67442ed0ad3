//! Command application.
//!
//! A command wraps a reducer that computes new properties from an input and
//! the current entity. Applying it either yields a new entity version with
//! the reducer's events, or rejects and hands back the untouched entity.

use std::fmt;
use std::sync::Arc;

use common::Exception;

use crate::entity::Entity;
use crate::error::CoreException;
use crate::event::DomainEvent;
use crate::publisher::{DomainEventPublisher, PublishError};

/// What a reducer returns on success: the new properties and any events.
#[derive(Debug, Clone)]
pub struct Reduced<P> {
    props: P,
    events: Vec<DomainEvent>,
}

impl<P> Reduced<P> {
    pub fn new(props: P) -> Self {
        Self {
            props,
            events: Vec::new(),
        }
    }

    /// Appends an event.
    pub fn with_event(mut self, event: DomainEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Appends events in order.
    pub fn with_events(mut self, events: impl IntoIterator<Item = DomainEvent>) -> Self {
        self.events.extend(events);
        self
    }
}

impl<P> From<P> for Reduced<P> {
    fn from(props: P) -> Self {
        Self::new(props)
    }
}

/// A successfully applied command.
#[derive(Debug, Clone)]
pub struct CommandOutcome<P> {
    /// The new entity version.
    pub entity: Entity<P>,

    /// Events raised by the reducer, in the order it raised them.
    pub events: Vec<DomainEvent>,
}

impl<P> CommandOutcome<P> {
    pub fn into_entity(self) -> Entity<P> {
        self.entity
    }

    /// Forwards the staged events to `publisher`.
    pub async fn publish<D>(&self, publisher: &D) -> Result<(), PublishError>
    where
        D: DomainEventPublisher + ?Sized,
    {
        if self.events.is_empty() {
            return Ok(());
        }
        publisher.publish_all(&self.events).await
    }
}

/// A rejected command, carrying the entity exactly as it was before.
#[derive(Debug, Clone)]
pub struct CommandRejection<P> {
    pub error: CoreException,
    pub entity: Entity<P>,
}

impl<P> CommandRejection<P> {
    pub fn into_error(self) -> CoreException {
        self.error
    }
}

impl<P> fmt::Display for CommandRejection<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command rejected for {} {}: {}",
            self.entity.tag(),
            self.entity.id(),
            self.error
        )
    }
}

impl<P: fmt::Debug> std::error::Error for CommandRejection<P> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<P: fmt::Debug> Exception for CommandRejection<P> {
    fn code(&self) -> &str {
        &self.error.code
    }

    fn message(&self) -> String {
        self.error.message.clone()
    }
}

/// Result of applying a command.
pub type CommandResult<P> = Result<CommandOutcome<P>, CommandRejection<P>>;

type Reducer<I, P> = dyn Fn(I, &P, &Entity<P>) -> Result<Reduced<P>, CoreException> + Send + Sync;

/// A reusable state transition over entities with props `P`.
pub struct Command<I, P> {
    reducer: Arc<Reducer<I, P>>,
}

impl<I, P> Clone for Command<I, P> {
    fn clone(&self) -> Self {
        Self {
            reducer: Arc::clone(&self.reducer),
        }
    }
}

/// Lifts a reducer into a [`Command`].
pub fn as_command<I, P, F>(reducer: F) -> Command<I, P>
where
    F: Fn(I, &P, &Entity<P>) -> Result<Reduced<P>, CoreException> + Send + Sync + 'static,
{
    Command {
        reducer: Arc::new(reducer),
    }
}

impl<I, P> Command<I, P> {
    /// Runs the reducer against `entity`.
    ///
    /// On success the props are replaced and `updated_at` refreshed; the id,
    /// tag, kind and `created_at` are kept.
    pub fn apply(&self, input: I, entity: Entity<P>) -> CommandResult<P> {
        match (self.reducer)(input, entity.unpack(), &entity) {
            Ok(Reduced { props, events }) => {
                metrics::counter!("domain_commands_total", "outcome" => "applied").increment(1);
                Ok(CommandOutcome {
                    entity: entity.with_props(props),
                    events,
                })
            }
            Err(error) => {
                tracing::debug!(
                    tag = entity.tag(),
                    id = %entity.id(),
                    code = %error.code,
                    "command rejected"
                );
                metrics::counter!("domain_commands_total", "outcome" => "rejected").increment(1);
                Err(CommandRejection { error, entity })
            }
        }
    }

    /// Fixes the input, returning a function of the entity alone.
    pub fn bind(&self, input: I) -> impl FnOnce(Entity<P>) -> CommandResult<P> + use<I, P> {
        let command = self.clone();
        move |entity| command.apply(input, entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityTrait, EntityTraitOptions, create_aggregate_trait};
    use crate::publisher::InMemoryEventPublisher;
    use crate::validation::{ParseResult, integer, parse_struct};
    use serde_json::{Value, json};

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        value: i64,
    }

    fn counter_trait() -> EntityTrait<Counter> {
        create_aggregate_trait(
            |raw: &Value| -> ParseResult<Counter> {
                parse_struct(raw, |f| f.required("value", integer).map(|value| Counter { value }))
            },
            "Counter",
            EntityTraitOptions::default(),
        )
    }

    fn increment() -> Command<i64, Counter> {
        as_command(|by: i64, props: &Counter, entity: &Entity<Counter>| {
            if by <= 0 {
                return Err(CoreException::new("INVALID_INCREMENT", "must be positive"));
            }
            let value = props.value + by;
            Ok(Reduced::new(Counter { value })
                .with_event(DomainEvent::for_entity("Incremented", entity, json!({"by": by})))
                .with_event(DomainEvent::for_entity("Changed", entity, json!({"value": value}))))
        })
    }

    #[test]
    fn apply_replaces_props_and_keeps_identity() {
        let counter = counter_trait().parse(&json!({"value": 1})).unwrap();
        let outcome = increment().apply(2, counter.clone()).unwrap();

        assert_eq!(outcome.entity.unpack().value, 3);
        assert_eq!(outcome.entity.id(), counter.id());
        assert_eq!(outcome.entity.tag(), counter.tag());
        assert_eq!(outcome.entity.kind(), counter.kind());
        assert_eq!(outcome.entity.created_at(), counter.created_at());
        assert!(outcome.entity.updated_at().unwrap() > counter.created_at());
    }

    #[test]
    fn events_surface_in_order() {
        let counter = counter_trait().parse(&json!({"value": 0})).unwrap();
        let outcome = increment().apply(1, counter).unwrap();
        let tags: Vec<_> = outcome.events.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["Incremented", "Changed"]);
    }

    #[test]
    fn rejection_returns_untouched_entity() {
        let counter = counter_trait().parse(&json!({"value": 5})).unwrap();
        let rejection = increment().apply(0, counter.clone()).unwrap_err();

        assert_eq!(rejection.code(), "INVALID_INCREMENT");
        assert_eq!(rejection.entity.unpack(), counter.unpack());
        assert_eq!(rejection.entity.updated_at(), counter.updated_at());
    }

    #[test]
    fn bind_curries_input() {
        let counter = counter_trait().parse(&json!({"value": 1})).unwrap();
        let add_ten = increment().bind(10);
        assert_eq!(add_ten(counter).unwrap().entity.unpack().value, 11);
    }

    #[test]
    fn reducer_can_validate_input_with_question_mark() {
        let set: Command<Value, Counter> = as_command(|input: Value, _props: &Counter, _e: &Entity<Counter>| {
            let value = integer(&input)?;
            Ok(Reduced::new(Counter { value }))
        });
        let counter = counter_trait().parse(&json!({"value": 1})).unwrap();
        let rejection = set.apply(json!("nope"), counter).unwrap_err();
        assert_eq!(rejection.error.code, "INVALID_INTEGER");
    }

    #[tokio::test]
    async fn outcome_publishes_staged_events() {
        let publisher = InMemoryEventPublisher::new();
        let counter = counter_trait().parse(&json!({"value": 0})).unwrap();
        let outcome = increment().apply(4, counter).unwrap();

        assert_eq!(publisher.published_count().await, 0);
        outcome.publish(&publisher).await.unwrap();
        assert_eq!(publisher.published_count().await, 2);
    }
}
