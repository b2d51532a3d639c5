//! Trait definitions for storage interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.
//!
//! Both traits are object safe so business logic can run against a
//! transaction-scoped `&mut dyn EdgeStore`.

use crate::{EdgeId, EdgeStatus, UserId};
use std::collections::BTreeSet;

/// Trait for creating and looking up user accounts
///
/// Implemented by the infrastructure layer (amity-store)
pub trait UserDirectory {
    /// Error type for directory operations
    type Error;

    /// Create a user with the given email and return its new id
    fn create_user(&mut self, email: &str) -> Result<UserId, Self::Error>;

    /// Find the id of the user with exactly this email
    fn resolve_id(&self, email: &str) -> Result<Option<UserId>, Self::Error>;

    /// Resolve many emails at once, silently dropping unknown ones
    fn resolve_ids(&self, emails: &[String]) -> Result<BTreeSet<UserId>, Self::Error>;

    /// Check whether a user id exists
    fn exists(&self, id: UserId) -> Result<bool, Self::Error>;

    /// Look up the emails of the given users, ordered by user id
    fn emails_of(&self, ids: &BTreeSet<UserId>) -> Result<Vec<String>, Self::Error>;

    /// All registered emails, ordered by user id
    fn all_emails(&self) -> Result<Vec<String>, Self::Error>;
}

/// Trait for storing relationship edges and querying the graph they form
///
/// The store performs no validation of which edge combinations are legal;
/// that is decided by the relationship engine.
pub trait EdgeStore: UserDirectory {
    /// Ids of `status` edges between `a` and `b` in either direction
    fn find_symmetric(
        &self,
        a: UserId,
        b: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error>;

    /// Ids of `status` edges going exactly `from → to`
    fn find_directional(
        &self,
        from: UserId,
        to: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error>;

    /// Insert a new edge and return its id
    fn insert(
        &mut self,
        requester: UserId,
        target: UserId,
        status: EdgeStatus,
    ) -> Result<EdgeId, Self::Error>;

    /// Delete the given edges. An empty slice is a no-op.
    fn delete_many(&mut self, ids: &[EdgeId]) -> Result<(), Self::Error>;

    /// Users with a `Connected` edge to `user`, in either direction
    fn friends_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error>;

    /// Users `x` with a `Subscribed` edge `x → user`
    fn subscribers_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error>;

    /// Resolve emails to existing user ids (delegates to the directory)
    fn users_with_emails(&self, emails: &[String]) -> Result<BTreeSet<UserId>, Self::Error> {
        self.resolve_ids(emails)
    }

    /// Run `f` inside a store transaction
    ///
    /// Everything `f` does through the handle it receives is committed when
    /// `f` returns `Ok` and rolled back when it returns `Err` (or panics).
    /// The outer `Result` reports failures to begin or commit the
    /// transaction; the inner one is `f`'s own result.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<Result<T, E>, Self::Error>
    where
        Self: Sized,
        F: FnOnce(&mut dyn EdgeStore<Error = Self::Error>) -> Result<T, E>;
}
