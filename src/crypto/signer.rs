//! Token signing and verification.

use crate::crypto::keys::KeyPair;
use crate::protocol::claims::TokenClaims;
use crate::protocol::codec::{claims_to_bytes, split_token, SEPARATOR};
use crate::WolError;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use once_cell::sync::OnceCell;
use std::fmt;
use tracing::info;

/// Where the key pair comes from on first use.
struct KeySource {
    encoded: String,
    passphrase: String,
}

/// Signs claims into tokens and verifies tokens against the derived public key.
///
/// The key pair is materialized at most once, on first use, and is immutable
/// afterwards. Signing and verification take `&self` and may run concurrently.
pub struct TokenSigner {
    source: Option<KeySource>,
    keys: OnceCell<KeyPair>,
}

impl TokenSigner {
    /// Create a signer that lazily decrypts `encoded_key` with `passphrase`.
    pub fn new(encoded_key: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            source: Some(KeySource {
                encoded: encoded_key.into(),
                passphrase: passphrase.into(),
            }),
            keys: OnceCell::new(),
        }
    }

    /// Create a signer around an already available signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            source: None,
            keys: OnceCell::with_value(KeyPair::new(signing_key)),
        }
    }

    /// Get the key pair, materializing it on first call.
    ///
    /// # Errors
    /// * `KeyMaterial` - the configured key cannot be decoded or decrypted
    pub fn keys(&self) -> Result<&KeyPair, WolError> {
        self.keys.get_or_try_init(|| {
            let source = self.source.as_ref().ok_or_else(|| {
                WolError::KeyMaterial("no key source configured".to_string())
            })?;

            let pair = KeyPair::from_encoded(&source.encoded, &source.passphrase)?;
            info!(fingerprint = %pair.fingerprint(), "token signing key loaded");
            Ok(pair)
        })
    }

    /// Sign claims, returning `base64(claims JSON).base64(signature)`.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, WolError> {
        let keys = self.keys()?;
        let payload = claims_to_bytes(claims)?;
        let signature = keys.signing_key().sign(&payload);

        Ok(format!(
            "{}{}{}",
            STANDARD.encode(&payload),
            SEPARATOR,
            STANDARD.encode(signature.to_bytes())
        ))
    }

    /// Verify a token's signature.
    ///
    /// # Returns
    /// * `Ok(true)` - signature matches the payload
    /// * `Ok(false)` - signature is undecodable or does not match (forged/tampered)
    /// * `Err(MalformedToken)` - token does not have the two-segment shape
    /// * `Err(KeyMaterial)` - the key pair could not be materialized
    pub fn verify(&self, token: &str) -> Result<bool, WolError> {
        let (payload_b64, signature_b64) = split_token(token)?;
        let keys = self.keys()?;

        let Ok(payload) = STANDARD.decode(payload_b64) else {
            return Ok(false);
        };
        let Ok(signature_bytes) = STANDARD.decode(signature_b64) else {
            return Ok(false);
        };
        let Ok(signature_array) = <[u8; 64]>::try_from(signature_bytes) else {
            return Ok(false);
        };

        let signature = Signature::from_bytes(&signature_array);
        Ok(keys.verifying_key().verify(&payload, &signature).is_ok())
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("materialized", &self.keys.get().is_some())
            .finish()
    }
}
