//! Relationship state transitions

use crate::{RelationshipError, Result};
use amity_domain::{EdgeId, EdgeStatus, EdgeStore, UserId};
use std::fmt::Display;
use tracing::{debug, info};

/// Outcome of a successful subscription request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// A new `Subscribed` edge was inserted
    Subscribed(EdgeId),

    /// The pair is already connected, which implies the subscription.
    /// No edge was created.
    AlreadyConnected,
}

/// One transition body, run inside the store transaction
type Step<E, T> = fn(&mut dyn EdgeStore<Error = E>, UserId, UserId) -> Result<T>;

/// The relationship engine
///
/// Stateless business logic over an [`EdgeStore`]. The engine decides which
/// edge combinations are legal; the store only persists them.
///
/// # Examples
///
/// ```no_run
/// use amity_engine::{RelationshipEngine, RelationshipError};
/// use amity_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut engine = RelationshipEngine::new(SqliteStore::new(":memory:")?);
/// let andy = engine.register_user("andy@example.com")?;
/// let john = engine.register_user("john@example.com")?;
///
/// engine.create_block(andy, john)?;
/// assert_eq!(engine.create_connection(john, andy), Err(RelationshipError::Blocked));
/// # Ok(())
/// # }
/// ```
pub struct RelationshipEngine<S> {
    pub(crate) store: S,
}

impl<S> RelationshipEngine<S>
where
    S: EdgeStore,
    S::Error: Display,
{
    /// Create an engine over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the engine and return its store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Register a new user with a unique email
    pub fn register_user(&mut self, email: &str) -> Result<UserId> {
        let id = self
            .store
            .atomically(|tx| {
                if tx
                    .resolve_id(email)
                    .map_err(RelationshipError::persistence)?
                    .is_some()
                {
                    return Err(RelationshipError::EmailInUse(email.to_string()));
                }
                tx.create_user(email).map_err(RelationshipError::persistence)
            })
            .map_err(RelationshipError::persistence)??;

        info!("Registered user {} ({})", id, email);
        Ok(id)
    }

    /// All registered emails, ordered by user id
    pub fn all_users(&self) -> Result<Vec<String>> {
        self.store.all_emails().map_err(RelationshipError::persistence)
    }

    /// Connect two users
    ///
    /// Fails with `AlreadyConnected` if a connection exists in either
    /// direction, then with `Blocked` if either user blocks the other.
    /// Subscriptions between the pair are replaced by the connection.
    pub fn create_connection(&mut self, requester: UserId, target: UserId) -> Result<EdgeId> {
        self.transition("connect", requester, target, connect)
    }

    /// Subscribe `requester` to `target`'s updates
    ///
    /// Fails with `AlreadySubscribed`, then with `Blocked` if the requester
    /// blocks the target. Succeeds without a new edge when the pair is
    /// already connected.
    pub fn create_subscription(
        &mut self,
        requester: UserId,
        target: UserId,
    ) -> Result<SubscriptionOutcome> {
        self.transition("subscribe", requester, target, subscribe)
    }

    /// Block `target` on behalf of `requester`
    ///
    /// Fails with `AlreadyBlocked`. Otherwise cancels the requester's
    /// subscription to the target and dissolves any connection first.
    pub fn create_block(&mut self, requester: UserId, target: UserId) -> Result<EdgeId> {
        self.transition("block", requester, target, block)
    }

    /// Run one transition atomically
    fn transition<T>(
        &mut self,
        action: &'static str,
        requester: UserId,
        target: UserId,
        step: Step<S::Error, T>,
    ) -> Result<T> {
        if requester == target {
            return Err(RelationshipError::SelfReference);
        }

        let outcome = self
            .store
            .atomically(|tx| {
                ensure_user_exists(tx, requester)?;
                ensure_user_exists(tx, target)?;
                step(tx, requester, target)
            })
            .map_err(RelationshipError::persistence)?;

        match &outcome {
            Ok(_) => info!("{}: {} -> {} committed", action, requester, target),
            Err(err) => debug!("{}: {} -> {} rejected: {}", action, requester, target, err),
        }

        outcome
    }

    /// Fail with `UnknownUser` unless the directory knows `user`
    pub(crate) fn require_user(&self, user: UserId) -> Result<()> {
        ensure_user_exists(&self.store, user)
    }
}

pub(crate) fn ensure_user_exists<E: Display>(
    store: &dyn EdgeStore<Error = E>,
    user: UserId,
) -> Result<()> {
    if store.exists(user).map_err(RelationshipError::persistence)? {
        Ok(())
    } else {
        Err(RelationshipError::UnknownUser(user))
    }
}

/// Whether a lookup found at least one edge
fn has_edge<E: Display>(found: std::result::Result<Vec<EdgeId>, E>) -> Result<bool> {
    found
        .map(|ids| !ids.is_empty())
        .map_err(RelationshipError::persistence)
}

fn connect<E: Display>(
    tx: &mut dyn EdgeStore<Error = E>,
    requester: UserId,
    target: UserId,
) -> Result<EdgeId> {
    // 1. Already connected, in either direction
    if has_edge(tx.find_symmetric(requester, target, EdgeStatus::Connected))? {
        return Err(RelationshipError::AlreadyConnected);
    }

    // 2. A block either way takes precedence
    if has_edge(tx.find_symmetric(requester, target, EdgeStatus::Blocked))? {
        return Err(RelationshipError::Blocked);
    }

    // 3. Subscriptions either way are subsumed by the connection
    let subsumed = tx
        .find_symmetric(requester, target, EdgeStatus::Subscribed)
        .map_err(RelationshipError::persistence)?;
    tx.delete_many(&subsumed)
        .map_err(RelationshipError::persistence)?;

    // 4. Commit
    tx.insert(requester, target, EdgeStatus::Connected)
        .map_err(RelationshipError::persistence)
}

fn subscribe<E: Display>(
    tx: &mut dyn EdgeStore<Error = E>,
    requester: UserId,
    target: UserId,
) -> Result<SubscriptionOutcome> {
    // 1. Already subscribed
    if has_edge(tx.find_directional(requester, target, EdgeStatus::Subscribed))? {
        return Err(RelationshipError::AlreadySubscribed);
    }

    // 2. Requester blocks target
    if has_edge(tx.find_directional(requester, target, EdgeStatus::Blocked))? {
        return Err(RelationshipError::Blocked);
    }

    // 3. A connection already implies the subscription
    if has_edge(tx.find_symmetric(requester, target, EdgeStatus::Connected))? {
        return Ok(SubscriptionOutcome::AlreadyConnected);
    }

    // 4. Commit
    tx.insert(requester, target, EdgeStatus::Subscribed)
        .map(SubscriptionOutcome::Subscribed)
        .map_err(RelationshipError::persistence)
}

fn block<E: Display>(
    tx: &mut dyn EdgeStore<Error = E>,
    requester: UserId,
    target: UserId,
) -> Result<EdgeId> {
    // 1. Already blocked
    if has_edge(tx.find_directional(requester, target, EdgeStatus::Blocked))? {
        return Err(RelationshipError::AlreadyBlocked);
    }

    // 2. Cancel the requester's own subscription
    let mut superseded = tx
        .find_directional(requester, target, EdgeStatus::Subscribed)
        .map_err(RelationshipError::persistence)?;

    // 3. Dissolve the connection
    superseded.extend(
        tx.find_symmetric(requester, target, EdgeStatus::Connected)
            .map_err(RelationshipError::persistence)?,
    );
    tx.delete_many(&superseded)
        .map_err(RelationshipError::persistence)?;

    // 4. Commit
    tx.insert(requester, target, EdgeStatus::Blocked)
        .map_err(RelationshipError::persistence)
}
