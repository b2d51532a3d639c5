//! Amity Relationship Engine
//!
//! Owns every business rule of the relationship graph.
//!
//! The engine provides:
//! - State transitions for connect, subscribe and block actions
//! - Error precedence between conflicting edge states
//! - Derived queries: friend list, common friends, broadcast recipients
//!
//! Each transition runs inside a single store transaction
//! ([`amity_domain::EdgeStore::atomically`]), so a failure part-way through
//! leaves no edge deleted or inserted.
//!
//! # Examples
//!
//! ```no_run
//! use amity_engine::RelationshipEngine;
//! use amity_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = RelationshipEngine::new(SqliteStore::new("amity.db")?);
//!
//! let andy = engine.register_user("andy@example.com")?;
//! let john = engine.register_user("john@example.com")?;
//!
//! engine.create_connection(andy, john)?;
//! assert_eq!(engine.friend_list(andy)?, vec!["john@example.com"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod engine;
mod error;
mod queries;

#[cfg(test)]
mod mock;

pub use engine::{RelationshipEngine, SubscriptionOutcome};
pub use error::{RelationshipError, Result};
