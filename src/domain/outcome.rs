//! Attempt outcomes surfaced to the caller.
//!
//! Only tier violations and the missing-identity case cross the limiter
//! boundary. Storage faults are absorbed inside the limiter and degrade to
//! cache-only operation; they never reach the caller.

use crate::domain::tier::TierScope;
use std::fmt;
use std::time::Duration;

/// Reason an attempt was not admitted.
///
/// Each violation carries the delay after which a retry can succeed,
/// computed from the oldest record still counted by the violating tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// A mandatory identity-scoped tier is configured and the attempt was
    /// anonymous. The caller must authenticate before retrying.
    IdentityRequired,
    /// A global tier denied the attempt.
    GlobalRateLimitExceeded {
        /// Delay until a retry can succeed
        retry_after: Duration,
    },
    /// A per-identity tier denied the attempt.
    IdentityRateLimitExceeded {
        /// Delay until a retry can succeed
        retry_after: Duration,
    },
    /// A per-action tier denied the attempt.
    ActionRateLimitExceeded {
        /// Delay until a retry can succeed
        retry_after: Duration,
    },
    /// A per-identity-per-action tier denied the attempt.
    IdentityActionRateLimitExceeded {
        /// Delay until a retry can succeed
        retry_after: Duration,
    },
}

impl AttemptError {
    /// Build the violation kind matching a tier scope.
    pub(crate) fn limit_exceeded(scope: TierScope, retry_after: Duration) -> Self {
        match scope {
            TierScope::Global => AttemptError::GlobalRateLimitExceeded { retry_after },
            TierScope::PerIdentity => AttemptError::IdentityRateLimitExceeded { retry_after },
            TierScope::PerAction => AttemptError::ActionRateLimitExceeded { retry_after },
            TierScope::PerIdentityAction => {
                AttemptError::IdentityActionRateLimitExceeded { retry_after }
            }
        }
    }

    /// The retry delay, when this is a tier violation.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AttemptError::IdentityRequired => None,
            AttemptError::GlobalRateLimitExceeded { retry_after }
            | AttemptError::IdentityRateLimitExceeded { retry_after }
            | AttemptError::ActionRateLimitExceeded { retry_after }
            | AttemptError::IdentityActionRateLimitExceeded { retry_after } => Some(*retry_after),
        }
    }

    /// The scope of the violating tier, when this is a tier violation.
    pub fn violating_scope(&self) -> Option<TierScope> {
        match self {
            AttemptError::IdentityRequired => None,
            AttemptError::GlobalRateLimitExceeded { .. } => Some(TierScope::Global),
            AttemptError::IdentityRateLimitExceeded { .. } => Some(TierScope::PerIdentity),
            AttemptError::ActionRateLimitExceeded { .. } => Some(TierScope::PerAction),
            AttemptError::IdentityActionRateLimitExceeded { .. } => {
                Some(TierScope::PerIdentityAction)
            }
        }
    }

    /// Check whether this is a tier violation rather than a missing identity.
    pub fn is_rate_limited(&self) -> bool {
        !matches!(self, AttemptError::IdentityRequired)
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::IdentityRequired => {
                write!(f, "this action requires a signed-in identity")
            }
            AttemptError::GlobalRateLimitExceeded { retry_after } => {
                write!(f, "global rate limit exceeded, retry in {retry_after:?}")
            }
            AttemptError::IdentityRateLimitExceeded { retry_after } => {
                write!(f, "rate limit for this identity exceeded, retry in {retry_after:?}")
            }
            AttemptError::ActionRateLimitExceeded { retry_after } => {
                write!(f, "rate limit for this action exceeded, retry in {retry_after:?}")
            }
            AttemptError::IdentityActionRateLimitExceeded { retry_after } => {
                write!(
                    f,
                    "rate limit for this identity and action exceeded, retry in {retry_after:?}"
                )
            }
        }
    }
}

impl std::error::Error for AttemptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_exceeded_maps_scope_to_kind() {
        let retry = Duration::from_secs(5);
        assert_eq!(
            AttemptError::limit_exceeded(TierScope::Global, retry),
            AttemptError::GlobalRateLimitExceeded { retry_after: retry }
        );
        assert_eq!(
            AttemptError::limit_exceeded(TierScope::PerIdentityAction, retry),
            AttemptError::IdentityActionRateLimitExceeded { retry_after: retry }
        );
    }

    #[test]
    fn test_violating_scope_round_trips() {
        let retry = Duration::from_millis(250);
        for scope in TierScope::EVALUATION_ORDER {
            let err = AttemptError::limit_exceeded(scope, retry);
            assert_eq!(err.violating_scope(), Some(scope));
            assert_eq!(err.retry_after(), Some(retry));
            assert!(err.is_rate_limited());
        }
    }

    #[test]
    fn test_identity_required_has_no_retry() {
        let err = AttemptError::IdentityRequired;
        assert_eq!(err.retry_after(), None);
        assert_eq!(err.violating_scope(), None);
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_display_includes_retry_delay() {
        let err = AttemptError::limit_exceeded(TierScope::PerAction, Duration::from_secs(30));
        assert!(err.to_string().contains("30s"));
    }
}
