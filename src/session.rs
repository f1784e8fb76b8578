//! Session gate: decides whether a request carries a valid token and mints
//! new tokens after external authentication.

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_TOKEN_LIFETIME_SECS;
use crate::crypto::signer::TokenSigner;
use crate::protocol::claims::TokenClaims;
use crate::protocol::codec::decode_claims;
use crate::WolError;
use std::sync::Arc;
use tracing::{debug, info};

/// Issues and validates signed session tokens.
pub struct SessionGate {
    signer: Arc<TokenSigner>,
    clock: Arc<dyn Clock>,
    token_lifetime_secs: i64,
}

impl SessionGate {
    /// Create a gate with the default 4 hour lifetime and the system clock.
    pub fn new(signer: Arc<TokenSigner>) -> Self {
        Self::with_clock(signer, Arc::new(SystemClock))
    }

    /// Create a gate with a custom clock.
    pub fn with_clock(signer: Arc<TokenSigner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            clock,
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }

    /// Change the lifetime of newly issued tokens.
    pub fn with_token_lifetime(mut self, token_lifetime_secs: i64) -> Self {
        self.token_lifetime_secs = token_lifetime_secs;
        self
    }

    /// Lifetime of newly issued tokens in seconds.
    pub fn token_lifetime_secs(&self) -> i64 {
        self.token_lifetime_secs
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    /// * `MissingToken` - no token
    /// * `MalformedToken` / `SignatureInvalid` - shape, encoding or signature problems
    /// * `InvalidExpiry` / `TokenNotYetValid` / `TokenExpired` - outside the validity window
    /// * `KeyMaterial` - the signing key cannot be loaded
    pub fn check_token(&self, token: Option<&str>) -> Result<TokenClaims, WolError> {
        let token = token.ok_or(WolError::MissingToken)?;

        if !self.signer.verify(token)? {
            return Err(WolError::SignatureInvalid);
        }

        let claims = decode_claims(token)?;
        claims.check_window(self.clock.now_millis())?;
        Ok(claims)
    }

    /// Whether `token` is currently valid.
    ///
    /// Every token problem collapses to `Ok(false)`; only key failures
    /// propagate, since no caller could ever be authenticated then.
    pub fn has_valid_token(&self, token: Option<&str>) -> Result<bool, WolError> {
        match self.check_token(token) {
            Ok(_) => Ok(true),
            Err(e) if e.is_token_rejection() => {
                debug!(reason = %e, "token rejected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Mint a token for `caller_address`, valid from now.
    pub fn issue_token(&self, caller_address: &str) -> Result<String, WolError> {
        let claims = TokenClaims::new(
            caller_address,
            self.clock.now_millis(),
            self.token_lifetime_secs,
        );
        let token = self.signer.sign(&claims)?;
        info!(subject = %caller_address, lifetime_secs = self.token_lifetime_secs, "session token issued");
        Ok(token)
    }
}
