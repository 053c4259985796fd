//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Domain-specific errors
///
/// These errors represent invariant failures of the directory aggregates.
/// They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field is empty or malformed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Lookup by id, serial or name failed
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another sibling under the same scene already uses the name
    #[error("{entity} name repeated: {name}")]
    NameRepeated { entity: &'static str, name: String },

    /// Another scene already claims the master
    #[error("Master already used by another scene: {0}")]
    MasterUsed(String),

    /// Another live device already uses the serial number
    #[error("Device serial repeated: {0}")]
    SerialRepeated(String),

    /// Membership append of an id that is already a member
    #[error("Already a member: {0}")]
    AlreadyMember(String),

    /// Membership removal of an id that is not a member
    #[error("Not a member: {0}")]
    NotMember(String),

    /// Region still has child regions
    #[error("Region has children: {0}")]
    HasChildren(String),

    /// Filter or update key outside the fixed set of named modes
    #[error("Key not defined: {0}")]
    UnknownKey(String),

    /// Value that cannot be parsed for the selected key
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// Operation the aggregate does not support
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn name_repeated(entity: &'static str, name: impl Into<String>) -> Self {
        Self::NameRepeated {
            entity,
            name: name.into(),
        }
    }

    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Check if this is a lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a conflict with existing state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::NameRepeated { .. }
                | Self::MasterUsed(_)
                | Self::SerialRepeated(_)
                | Self::AlreadyMember(_)
                | Self::NotMember(_)
                | Self::HasChildren(_)
        )
    }
}
