//! Action and identity value types.
//!
//! The limiter never interprets these beyond using them as counting-key
//! components. Authorization decisions stay with the caller.

use std::fmt;

/// Opaque identifier for a gated operation (e.g. `"submit_suggestion"`,
/// `"create_comment"`).
///
/// Caller-defined; two attempts share per-action quota exactly when their
/// action types compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionType(String);

impl ActionType {
    /// Create an action type from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ActionType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The actor performing an attempt.
///
/// Supplied by the caller's identity source. `Anonymous` attempts skip
/// identity-scoped tiers unless a tier is marked as requiring identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// No stable actor id is available for this attempt.
    Anonymous,
    /// A stable, authenticated actor id.
    Actor(String),
}

impl Identity {
    /// Create an authenticated identity.
    pub fn actor(id: impl Into<String>) -> Self {
        Self::Actor(id.into())
    }

    /// The anonymous marker.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Get the actor id, if authenticated.
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Actor(id) => Some(id),
        }
    }

    /// Check whether this identity is anonymous.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}
