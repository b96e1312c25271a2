//! Error types for the object model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while mutating or reconciling an entity locally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A class or field name, date or geo point failed validation.
    #[error(transparent)]
    Invalid(#[from] cirrus_types::Error),

    /// The operation cannot be combined with one already queued for the field.
    #[error("{next} on field {field} cannot follow pending {previous}")]
    IncompatibleOperation {
        field: String,
        previous: &'static str,
        next: &'static str,
    },

    /// The operation's arguments are malformed.
    #[error("invalid operation on field {field}: {reason}")]
    InvalidOperation { field: String, reason: String },

    /// The server reported a different identity than the one already held.
    #[error("object id conflict: local {local}, server {server}")]
    IdentityConflict { local: String, server: String },

    /// A save of a new object was answered without an identity.
    #[error("save response for new {class_name} object has no objectId")]
    MissingObjectId { class_name: String },
}
