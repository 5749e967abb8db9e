//! Tier configuration and counting-key derivation.
//!
//! A tier is one independently configured limit: a scope, a sliding window,
//! and a maximum event count. Every applicable tier must pass for an attempt
//! to be admitted. Multiple tiers may share a scope (e.g. a burst window plus
//! a daily window); they then count against the same record list.

use crate::domain::action::{ActionType, Identity};
use std::fmt;
use std::time::Duration;

/// Separator between actor id and action type in combined keys. A control
/// character so caller-defined ids cannot collide with the combined form.
const KEY_SEPARATOR: char = '\u{1f}';

/// The dimension a tier counts along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierScope {
    /// All attempts by all actors, regardless of action.
    Global,
    /// All attempts by one actor, regardless of action.
    PerIdentity,
    /// All attempts for one action type, regardless of actor.
    PerAction,
    /// Attempts by one actor for one action type.
    PerIdentityAction,
}

impl TierScope {
    /// Evaluation order for an attempt: broadest scope first.
    pub const EVALUATION_ORDER: [TierScope; 4] = [
        TierScope::Global,
        TierScope::PerIdentity,
        TierScope::PerAction,
        TierScope::PerIdentityAction,
    ];

    /// Whether tiers of this scope only apply to authenticated attempts.
    pub fn involves_identity(&self) -> bool {
        matches!(self, TierScope::PerIdentity | TierScope::PerIdentityAction)
    }

    /// Stable string form, used in storage keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            TierScope::Global => "global",
            TierScope::PerIdentity => "identity",
            TierScope::PerAction => "action",
            TierScope::PerIdentityAction => "identity_action",
        }
    }

    /// Derive the counting key for this scope, or `None` when the scope
    /// does not apply (identity scopes for anonymous attempts).
    pub fn key_for(&self, action: &ActionType, identity: &Identity) -> Option<TierKey> {
        match self {
            TierScope::Global => Some(TierKey::new(*self, "*")),
            TierScope::PerIdentity => identity.actor_id().map(|id| TierKey::new(*self, id)),
            TierScope::PerAction => Some(TierKey::new(*self, action.as_str())),
            TierScope::PerIdentityAction => identity
                .actor_id()
                .map(|id| TierKey::new(*self, format!("{id}{KEY_SEPARATOR}{action}"))),
        }
    }
}

impl fmt::Display for TierScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    /// The dimension this tier counts along.
    pub scope: TierScope,
    /// Length of the sliding window.
    pub window: Duration,
    /// Maximum accepted attempts within the window. Zero always denies.
    pub max_events: usize,
    /// When set on an identity scope, anonymous attempts are rejected with
    /// `IdentityRequired` instead of skipping the tier.
    pub require_identity: bool,
}

impl TierConfig {
    /// Create a tier. Validation happens when the limiter is built.
    pub fn new(scope: TierScope, window: Duration, max_events: usize) -> Self {
        Self {
            scope,
            window,
            max_events,
            require_identity: false,
        }
    }

    /// Mark this identity-scoped tier as mandatory for all attempts.
    pub fn require_identity(mut self) -> Self {
        self.require_identity = true;
        self
    }

    /// Window length in epoch-millisecond units.
    pub(crate) fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }

    /// Check the tier for configuration errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow { scope: self.scope });
        }
        if self.require_identity && !self.scope.involves_identity() {
            return Err(ConfigError::RequireIdentityNotApplicable { scope: self.scope });
        }
        Ok(())
    }
}

/// Error returned when a limiter is built from invalid tier configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A tier was configured with a zero-length window.
    ZeroWindow {
        /// Scope of the offending tier
        scope: TierScope,
    },
    /// `require_identity` was set on a scope that never counts per identity.
    RequireIdentityNotApplicable {
        /// Scope of the offending tier
        scope: TierScope,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroWindow { scope } => {
                write!(f, "{scope} tier has a zero-length window")
            }
            ConfigError::RequireIdentityNotApplicable { scope } => {
                write!(f, "require_identity is not applicable to the {scope} scope")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Storage and cache key for one record list: `(scope, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TierKey {
    scope: TierScope,
    key: String,
}

impl TierKey {
    /// Create a key from its components.
    pub fn new(scope: TierScope, key: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
        }
    }

    /// The scope component.
    pub fn scope(&self) -> TierScope {
        self.scope
    }

    /// The key component within the scope.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for TierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_per_scope() {
        let action = ActionType::from("vote");
        let identity = Identity::actor("u1");

        assert_eq!(
            TierScope::Global.key_for(&action, &identity),
            Some(TierKey::new(TierScope::Global, "*"))
        );
        assert_eq!(
            TierScope::PerIdentity.key_for(&action, &identity),
            Some(TierKey::new(TierScope::PerIdentity, "u1"))
        );
        assert_eq!(
            TierScope::PerAction.key_for(&action, &identity),
            Some(TierKey::new(TierScope::PerAction, "vote"))
        );
        assert_eq!(
            TierScope::PerIdentityAction.key_for(&action, &identity),
            Some(TierKey::new(TierScope::PerIdentityAction, "u1\u{1f}vote"))
        );
    }

    #[test]
    fn test_identity_scopes_yield_no_key_for_anonymous() {
        let action = ActionType::from("vote");
        let anon = Identity::anonymous();

        assert!(TierScope::PerIdentity.key_for(&action, &anon).is_none());
        assert!(TierScope::PerIdentityAction.key_for(&action, &anon).is_none());
        assert!(TierScope::Global.key_for(&action, &anon).is_some());
        assert!(TierScope::PerAction.key_for(&action, &anon).is_some());
    }

    #[test]
    fn test_combined_key_is_collision_resistant() {
        let a = TierScope::PerIdentityAction
            .key_for(&ActionType::from("b:c"), &Identity::actor("a"))
            .unwrap();
        let b = TierScope::PerIdentityAction
            .key_for(&ActionType::from("c"), &Identity::actor("a:b"))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_window_is_invalid() {
        let tier = TierConfig::new(TierScope::Global, Duration::ZERO, 10);
        assert_eq!(
            tier.validate(),
            Err(ConfigError::ZeroWindow {
                scope: TierScope::Global
            })
        );
    }

    #[test]
    fn test_zero_max_events_is_valid_config() {
        let tier = TierConfig::new(TierScope::PerAction, Duration::from_secs(60), 0);
        assert!(tier.validate().is_ok());
    }

    #[test]
    fn test_require_identity_rejected_on_global_scope() {
        let tier =
            TierConfig::new(TierScope::Global, Duration::from_secs(60), 10).require_identity();
        assert_eq!(
            tier.validate(),
            Err(ConfigError::RequireIdentityNotApplicable {
                scope: TierScope::Global
            })
        );
    }

    #[test]
    fn test_require_identity_accepted_on_identity_scope() {
        let tier = TierConfig::new(TierScope::PerIdentity, Duration::from_secs(60), 10)
            .require_identity();
        assert!(tier.validate().is_ok());
    }
}
