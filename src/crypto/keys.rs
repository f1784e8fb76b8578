//! Ed25519 key material for session tokens.
//!
//! The private key is configured as base64 of an encrypted PKCS#8 document
//! (PEM-armoured or raw DER) and unlocked with a passphrase. The public key is
//! derived from it; nothing else is ever configured.

use crate::WolError;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

/// A private signing key and the public key derived from it.
#[derive(Debug, Clone)]
pub struct KeyPair {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl KeyPair {
    /// Build a key pair from a signing key.
    pub fn new(signing: SigningKey) -> Self {
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }

    /// Decode and decrypt a configured key.
    pub fn from_encoded(encoded: &str, passphrase: &str) -> Result<Self, WolError> {
        decode_signing_key(encoded, passphrase).map(Self::new)
    }

    /// The private half.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// The public half.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }

    /// Hex SHA-256 of the public key, safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.verifying.as_bytes()))
    }
}

/// Decode base64 key material and decrypt it with `passphrase`.
///
/// Whitespace inside the base64 text is ignored so wrapped values work.
///
/// # Errors
/// * `KeyMaterial` - bad base64, non-UTF-8 PEM, wrong passphrase, or not an Ed25519 key
pub fn decode_signing_key(encoded: &str, passphrase: &str) -> Result<SigningKey, WolError> {
    let compact: String = encoded.split_whitespace().collect();
    if compact.is_empty() {
        return Err(WolError::KeyMaterial("no signing key configured".to_string()));
    }

    let document = STANDARD
        .decode(compact)
        .map_err(|e| WolError::KeyMaterial(format!("Invalid signing key base64: {}", e)))?;

    let decoded = if document.starts_with(b"-----BEGIN") {
        let pem = std::str::from_utf8(&document)
            .map_err(|_| WolError::KeyMaterial("Signing key PEM is not UTF-8".to_string()))?;
        SigningKey::from_pkcs8_encrypted_pem(pem, passphrase)
    } else {
        SigningKey::from_pkcs8_encrypted_der(&document, passphrase)
    };

    decoded.map_err(|e| WolError::KeyMaterial(format!("Failed to decrypt signing key: {}", e)))
}
