//! Relationship engine error types

use amity_domain::UserId;
use std::fmt::Display;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RelationshipError>;

/// Errors returned by relationship operations
///
/// Every rejected action names the exact conflicting state, so callers never
/// have to re-derive why it failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelationshipError {
    /// A connected edge already joins the pair
    #[error("Users are already connected")]
    AlreadyConnected,

    /// The requester already subscribes to the target
    #[error("Requester already subscribes to target")]
    AlreadySubscribed,

    /// The requester already blocks the target
    #[error("Requester already blocks target")]
    AlreadyBlocked,

    /// A block stands in the way of the action
    #[error("A block exists between these users")]
    Blocked,

    /// Requester and target are the same user
    #[error("Requester and target must be different users")]
    SelfReference,

    /// The user id is not known to the directory
    #[error("User {0} does not exist")]
    UnknownUser(UserId),

    /// The email is already registered
    #[error("Email already in use: {0}")]
    EmailInUse(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Persistence(String),
}

impl RelationshipError {
    /// Wrap a store error
    pub(crate) fn persistence<E: Display>(err: E) -> Self {
        RelationshipError::Persistence(err.to_string())
    }

    /// Whether the error is a rejected action rather than a storage failure
    pub fn is_conflict(&self) -> bool {
        !matches!(self, RelationshipError::Persistence(_))
    }
}
