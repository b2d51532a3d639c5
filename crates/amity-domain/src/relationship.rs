//! Relationship module - directed edges between users

use crate::UserId;
use std::fmt;

/// Identifier of a relationship edge
///
/// Assigned by the store on insertion. Ids are never reused, even after the
/// edge is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(i64);

impl EdgeId {
    /// Wrap a raw id value
    pub fn from_value(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw id value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status carried by a relationship edge
///
/// - Connected: mutual friendship, stored once and checked in both directions
/// - Subscribed: one-way follow of the target's updates
/// - Blocked: requester blocks the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeStatus {
    /// Mutual connection
    Connected,

    /// One-way subscription
    Subscribed,

    /// One-way block
    Blocked,
}

impl EdgeStatus {
    /// Get the status name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeStatus::Connected => "connected",
            EdgeStatus::Subscribed => "subscribed",
            EdgeStatus::Blocked => "blocked",
        }
    }

    /// Parse a status from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "connected" => Some(EdgeStatus::Connected),
            "subscribed" => Some(EdgeStatus::Subscribed),
            "blocked" => Some(EdgeStatus::Blocked),
            _ => None,
        }
    }

    /// Whether an edge with this status counts in both directions
    pub fn is_symmetric(&self) -> bool {
        matches!(self, EdgeStatus::Connected)
    }
}

impl std::str::FromStr for EdgeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid edge status: {}", s))
    }
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed relationship edge `requester → target`
///
/// Edges are never updated in place. A state change deletes the superseded
/// edge and inserts a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Store-assigned edge id
    pub id: EdgeId,

    /// User who performed the action
    pub requester: UserId,

    /// User the action was aimed at
    pub target: UserId,

    /// Edge status
    pub status: EdgeStatus,
}

impl Relationship {
    /// Whether this edge joins `a` and `b` in either direction
    pub fn joins(&self, a: UserId, b: UserId) -> bool {
        (self.requester == a && self.target == b) || (self.requester == b && self.target == a)
    }

    /// The endpoint opposite to `user`, if `user` is on this edge
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if self.requester == user {
            Some(self.target)
        } else if self.target == user {
            Some(self.requester)
        } else {
            None
        }
    }
}
