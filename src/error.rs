//! Error types for the execution tracker
//!
//! Every failure is reported synchronously with enough context (entity kind,
//! id, current vs. requested state) for the caller to act on it.

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Execution aggregate root
    Execution,
    /// Sample owned by an execution
    Sample,
    /// Measurement ledger row
    Measurement,
    /// Export job
    Export,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution => write!(f, "execution"),
            Self::Sample => write!(f, "sample"),
            Self::Measurement => write!(f, "measurement"),
            Self::Export => write!(f, "export"),
        }
    }
}

/// Tracker error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or malformed
    #[error("validation failed: {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The requested operation is not legal from the entity's current state
    #[error("invalid transition: cannot {action} {entity} {id} in state {current}")]
    InvalidTransition {
        /// Entity kind
        entity: Entity,
        /// Entity id
        id: String,
        /// State the entity is currently in
        current: String,
        /// Operation or target state that was requested
        action: String,
    },

    /// A referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind
        entity: Entity,
        /// Entity id
        id: String,
    },

    /// A concurrent writer changed the entity between read and write
    #[error("concurrent modification of {entity} {id}; re-read and retry")]
    Conflict {
        /// Entity kind
        entity: Entity,
        /// Entity id
        id: String,
    },

    /// Durable store failure
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Validation error for a missing or blank required field.
    pub fn missing(field: &'static str) -> Self {
        Self::Validation {
            field,
            message: "is required".to_string(),
        }
    }

    /// Validation error with a custom message.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Not-found error for the given entity.
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Invalid-transition error naming current state and requested action.
    pub fn invalid_transition(
        entity: Entity,
        id: impl Into<String>,
        current: impl fmt::Display,
        action: impl fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            id: id.into(),
            current: current.to_string(),
            action: action.to_string(),
        }
    }

    /// Conflict error for a lost conditional write.
    pub fn conflict(entity: Entity, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
        }
    }

    /// Returns `true` for errors the caller fixes by correcting input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` for rejected state-machine moves.
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Returns `true` when the referenced entity does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when a concurrent writer won the race.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("serialization: {err}"))
    }
}

/// Reject blank strings for a required field.
pub(crate) fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::missing(field))
    } else {
        Ok(())
    }
}
