//! Amity Storage Layer
//!
//! Implements the `UserDirectory` and `EdgeStore` traits on SQLite.
//!
//! # Architecture
//!
//! - `users` table keyed by an autoincrement id, email unique
//! - `relationships` table holding directed edges with a status
//! - Uniqueness constraints on `(requester, target, status)` and on the
//!   unordered pair of every `connected` edge, as a second line of defense
//!   behind the engine's own checks
//! - `atomically` opens a `BEGIN IMMEDIATE` transaction, so concurrent
//!   writers on the same database file are serialized
//!
//! # Examples
//!
//! ```no_run
//! use amity_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for user and edge operations
//! ```

#![warn(missing_docs)]

mod scope;

use amity_domain::{EdgeId, EdgeStatus, EdgeStore, Relationship, UserDirectory, UserId};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use scope::SqliteScope;
use tracing::debug;

/// Default time a writer waits for a competing transaction to finish
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A uniqueness constraint rejected the write
    #[error("Duplicate record rejected by the store")]
    Duplicate,
}

/// SQLite-based implementation of `UserDirectory` and `EdgeStore`
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance, or share one behind a mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use amity_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("amity.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Create a SqliteStore that waits at most `busy_timeout` for locks
    /// held by other connections
    pub fn with_busy_timeout<P: AsRef<Path>>(
        path: P,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn scope(&self) -> SqliteScope<'_> {
        SqliteScope::new(&self.conn)
    }

    /// Every stored edge, ordered by id
    pub fn all_edges(&self) -> Result<Vec<Relationship>, StoreError> {
        self.scope().all_edges()
    }
}

impl UserDirectory for SqliteStore {
    type Error = StoreError;

    fn create_user(&mut self, email: &str) -> Result<UserId, Self::Error> {
        self.scope().create_user(email)
    }

    fn resolve_id(&self, email: &str) -> Result<Option<UserId>, Self::Error> {
        self.scope().resolve_id(email)
    }

    fn resolve_ids(&self, emails: &[String]) -> Result<BTreeSet<UserId>, Self::Error> {
        self.scope().resolve_ids(emails)
    }

    fn exists(&self, id: UserId) -> Result<bool, Self::Error> {
        self.scope().exists(id)
    }

    fn emails_of(&self, ids: &BTreeSet<UserId>) -> Result<Vec<String>, Self::Error> {
        self.scope().emails_of(ids)
    }

    fn all_emails(&self) -> Result<Vec<String>, Self::Error> {
        self.scope().all_emails()
    }
}

impl EdgeStore for SqliteStore {
    fn find_symmetric(
        &self,
        a: UserId,
        b: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error> {
        self.scope().find_symmetric(a, b, status)
    }

    fn find_directional(
        &self,
        from: UserId,
        to: UserId,
        status: EdgeStatus,
    ) -> Result<Vec<EdgeId>, Self::Error> {
        self.scope().find_directional(from, to, status)
    }

    fn insert(
        &mut self,
        requester: UserId,
        target: UserId,
        status: EdgeStatus,
    ) -> Result<EdgeId, Self::Error> {
        self.scope().insert(requester, target, status)
    }

    fn delete_many(&mut self, ids: &[EdgeId]) -> Result<(), Self::Error> {
        self.scope().delete_many(ids)
    }

    fn friends_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error> {
        self.scope().friends_of(user)
    }

    fn subscribers_of(&self, user: UserId) -> Result<BTreeSet<UserId>, Self::Error> {
        self.scope().subscribers_of(user)
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<Result<T, E>, Self::Error>
    where
        F: FnOnce(&mut dyn EdgeStore<Error = Self::Error>) -> Result<T, E>,
    {
        // IMMEDIATE takes the write lock up front so check-then-write
        // sequences from other connections cannot interleave.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = f(&mut SqliteScope::new(&tx));

        match outcome {
            Ok(value) => {
                tx.commit()?;
                Ok(Ok(value))
            }
            Err(err) => {
                tx.rollback()?;
                debug!("Transaction rolled back");
                Ok(Err(err))
            }
        }
    }
}
