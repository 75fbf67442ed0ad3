//! Operations shared by every domain model.

use serde::{Deserialize, Serialize};

/// Discriminates the three kinds of domain model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Entity,
    AggregateRoot,
    ValueObject,
}

impl ModelKind {
    /// Returns true for kinds that carry an identity.
    pub fn has_identity(&self) -> bool {
        matches!(self, Self::Entity | Self::AggregateRoot)
    }
}

/// A tagged, immutable domain value.
pub trait DomainModel {
    /// The validated properties carried by the model.
    type Props;

    /// The discriminator fixed when the model's trait was created.
    fn tag(&self) -> &'static str;

    fn kind(&self) -> ModelKind;

    /// Returns the properties without any envelope fields.
    fn unpack(&self) -> &Self::Props;

    /// Model equality.
    ///
    /// Identity-bearing models compare tag and id; value objects compare tag
    /// and properties.
    fn is_equal(&self, other: &Self) -> bool;
}
