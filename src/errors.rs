//! Wolgate error types.

use thiserror::Error;

/// Errors produced by token handling, key loading and machine control.
#[derive(Debug, Error)]
pub enum WolError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Token has bad syntax, bad encoding or is missing claims.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Token signature does not match its payload.
    #[error("Token signature verification failed")]
    SignatureInvalid,

    /// No token was presented.
    #[error("No token provided")]
    MissingToken,

    /// Token lifetime has elapsed.
    #[error("Token expired at {expired_at_millis}")]
    TokenExpired {
        /// Epoch millis at which the token stopped being valid.
        expired_at_millis: i64,
    },

    /// Token was issued after the current time (clock skew or crafted payload).
    #[error("Token issued in the future ({issued_at_millis})")]
    TokenNotYetValid {
        /// Epoch millis the token claims it was issued at.
        issued_at_millis: i64,
    },

    /// Token carries a negative lifetime.
    #[error("Token has invalid expiry ({expiry_seconds}s)")]
    InvalidExpiry {
        /// The rejected lifetime in seconds.
        expiry_seconds: i64,
    },

    /// Signing key could not be loaded or derived.
    #[error("Key material error: {0}")]
    KeyMaterial(String),

    /// Wake command could not be dispatched.
    #[error("Wake command failed: {0}")]
    WakeCommand(String),

    /// Captcha provider could not be reached or answered garbage.
    #[error("Captcha transport error: {0}")]
    CaptchaTransport(String),

    /// Captcha provider refused the response.
    #[error("Captcha failed ({})", .0.join(", "))]
    CaptchaRejected(Vec<String>),

    /// Caller is not authenticated.
    #[error("Not authenticated")]
    Unauthenticated,
}

impl WolError {
    /// Whether this error invalidates a token (as opposed to a system fault).
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            WolError::MalformedToken(_)
                | WolError::SignatureInvalid
                | WolError::MissingToken
                | WolError::TokenExpired { .. }
                | WolError::TokenNotYetValid { .. }
                | WolError::InvalidExpiry { .. }
        )
    }
}
