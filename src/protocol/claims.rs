//! Session token claims and their validity window.

use crate::WolError;
use serde::{Deserialize, Serialize};

/// Claims carried inside a signed session token.
///
/// Wire names follow JWT conventions (`sub`, `iat`, `exp`) but `iat` is in
/// epoch milliseconds and `exp` is a lifetime in seconds, not an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Network address of the authenticated caller.
    #[serde(rename = "sub")]
    pub subject: String,

    /// Issue time in Unix epoch milliseconds.
    #[serde(rename = "iat")]
    pub issued_at_millis: i64,

    /// Lifetime in seconds, counted from `issued_at_millis`.
    #[serde(rename = "exp")]
    pub expiry_seconds: i64,
}

impl TokenClaims {
    /// Create claims for `subject` issued at `issued_at_millis`.
    pub fn new(subject: impl Into<String>, issued_at_millis: i64, expiry_seconds: i64) -> Self {
        Self {
            subject: subject.into(),
            issued_at_millis,
            expiry_seconds,
        }
    }

    /// First instant (epoch millis) at which the claims are no longer valid.
    pub fn expires_at_millis(&self) -> i64 {
        self.issued_at_millis
            .saturating_add(self.expiry_seconds.saturating_mul(1000))
    }

    /// Check that `now_millis` lies in `[iat, iat + exp * 1000)`.
    ///
    /// # Errors
    /// * `InvalidExpiry` - `exp` is negative (checked first, whatever the timestamps)
    /// * `TokenNotYetValid` - `now` is before `iat`
    /// * `TokenExpired` - the lifetime has elapsed
    pub fn check_window(&self, now_millis: i64) -> Result<(), WolError> {
        if self.expiry_seconds < 0 {
            return Err(WolError::InvalidExpiry {
                expiry_seconds: self.expiry_seconds,
            });
        }

        if now_millis < self.issued_at_millis {
            return Err(WolError::TokenNotYetValid {
                issued_at_millis: self.issued_at_millis,
            });
        }

        let expires_at = self.expires_at_millis();
        if now_millis >= expires_at {
            return Err(WolError::TokenExpired {
                expired_at_millis: expires_at,
            });
        }

        Ok(())
    }

    /// Whether the claims are valid at `now_millis`.
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        self.check_window(now_millis).is_ok()
    }
}
