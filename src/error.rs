//! Error types for the few fallible edges of the crate.
//!
//! Simulation itself never fails: a missing entity is a defined transition
//! (dropped connection, skipped candidate), not an error.

use crate::ecs::grid::ObjectId;

/// Errors returned by configuration and entity-store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TetherError {
    /// A configuration field holds an unusable value.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    /// The id does not resolve to a live entity.
    #[error("object {0:?} does not exist")]
    UnknownObject(ObjectId),
    /// An entity cannot be attached to itself.
    #[error("object {0:?} cannot be connected to itself")]
    SelfConnection(ObjectId),
}

pub type Result<T> = std::result::Result<T, TetherError>;
