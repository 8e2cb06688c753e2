//! Error types for the role permission core

use crate::role::{BuiltinKind, RoleId};
use thiserror::Error;

/// Role permission errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid access control catalog definition
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Role failed attribute validation
    #[error("Role validation failed: {0}")]
    Validation(String),

    /// Role not found
    #[error("Role not found: {0}")]
    RoleNotFound(RoleId),

    /// Another role already uses this name
    #[error("Role name already taken: {0}")]
    DuplicateRole(String),

    /// A required builtin role is absent from the store
    #[error("Missing {0} builtin role")]
    MissingFixture(BuiltinKind),

    /// Role cannot be deleted
    #[error("Can't delete role '{name}': {reason}")]
    NotDeletable {
        /// Name of the role the caller tried to delete
        name: String,
        /// Why the deletion guard refused
        reason: String,
    },
}

/// Result type for role permission operations
pub type Result<T> = std::result::Result<T, AuthzError>;
