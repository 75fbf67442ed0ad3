//! Shared types for the domain modeling toolkit.
//!
//! - [`Identifier`]: opaque identity assigned to entities
//! - [`Exception`]: the `{ code, message }` surface every boundary error carries

mod exception;
mod types;

pub use exception::Exception;
pub use types::Identifier;
