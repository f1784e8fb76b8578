//! Cryptographic primitives for session tokens.

pub mod keys;
pub mod signer;
