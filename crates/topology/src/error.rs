//! Model errors

use crate::model::EntityKind;

/// Error raised while building model values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown role tag: {0}")]
    UnknownRole(String),
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: EntityKind, name: String },
    #[error("invalid entity reference '{0}', expected <kind>/<name>")]
    InvalidEntityRef(String),
}
