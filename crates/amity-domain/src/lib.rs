//! Amity Domain Layer
//!
//! This crate contains the domain model for Amity's relationship graph.
//! It has ZERO external dependencies and defines the fundamental concepts,
//! value objects, and trait interfaces that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **User**: An account identified by an opaque numeric id and a unique email
//! - **Relationship**: A directed edge `requester → target` with a status
//! - **Edge status**: `Connected` (checked symmetrically), `Subscribed` and
//!   `Blocked` (both directional)
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture:
//! - No external crate dependencies
//! - Business rules live in `amity-engine`
//! - Infrastructure implementations live in other crates (`amity-store`)
//! - Trait definitions for all storage interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod relationship;
pub mod traits;
pub mod user;

// Re-exports for convenience
pub use relationship::{EdgeId, EdgeStatus, Relationship};
pub use traits::{EdgeStore, UserDirectory};
pub use user::UserId;
