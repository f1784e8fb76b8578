//! Token codec: `<base64 claims JSON>.<base64 signature>`.
//!
//! The codec only deals with shape and encoding. Signatures are produced and
//! checked by [`crate::crypto::signer::TokenSigner`].

use crate::protocol::claims::TokenClaims;
use crate::WolError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

/// Separator between the payload and signature segments.
pub const SEPARATOR: char = '.';

/// Claims as found on the wire, before presence checks.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
}

/// Require exactly one separator in `token`.
///
/// Rejects unsigned payloads and concatenated tokens before any decoding work.
pub fn check_syntax(token: &str) -> Result<(), WolError> {
    let mut separators = token.match_indices(SEPARATOR);

    match (separators.next(), separators.next()) {
        (Some(_), None) => Ok(()),
        _ => Err(WolError::MalformedToken(
            "invalid syntax, expected '<Data-Base64>.<Signature-Base64>'".to_string(),
        )),
    }
}

/// Split a token into its payload and signature segments.
///
/// Both segments must be non-empty.
pub fn split_token(token: &str) -> Result<(&str, &str), WolError> {
    check_syntax(token)?;

    let (payload, signature) = token
        .split_once(SEPARATOR)
        .ok_or_else(|| WolError::MalformedToken("missing separator".to_string()))?;

    if payload.is_empty() || signature.is_empty() {
        return Err(WolError::MalformedToken(
            "payload and signature segments must be non-empty".to_string(),
        ));
    }

    Ok((payload, signature))
}

/// Serialize claims to the exact bytes that get signed.
pub fn claims_to_bytes(claims: &TokenClaims) -> Result<Vec<u8>, WolError> {
    serde_json::to_vec(claims)
        .map_err(|e| WolError::MalformedToken(format!("failed to serialize claims: {}", e)))
}

/// JSON-serialize and base64-encode claims (the payload segment).
pub fn encode_claims(claims: &TokenClaims) -> Result<String, WolError> {
    Ok(STANDARD.encode(claims_to_bytes(claims)?))
}

/// Parse claims from raw JSON bytes, requiring `sub`, `iat` and `exp`.
pub fn claims_from_bytes(bytes: &[u8]) -> Result<TokenClaims, WolError> {
    let raw: RawClaims = serde_json::from_slice(bytes)
        .map_err(|e| WolError::MalformedToken(format!("invalid claims JSON: {}", e)))?;

    match raw {
        RawClaims {
            sub: Some(subject),
            iat: Some(issued_at_millis),
            exp: Some(expiry_seconds),
        } => Ok(TokenClaims {
            subject,
            issued_at_millis,
            expiry_seconds,
        }),
        raw => {
            let missing: Vec<&str> = [
                ("sub", raw.sub.is_none()),
                ("iat", raw.iat.is_none()),
                ("exp", raw.exp.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();

            Err(WolError::MalformedToken(format!(
                "payload is missing claims (expected: [sub, iat, exp], missing: [{}])",
                missing.join(", ")
            )))
        }
    }
}

/// Decode the claims of a signed token.
///
/// Does not verify the signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, WolError> {
    let (payload, _) = split_token(token)?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| WolError::MalformedToken(format!("invalid payload base64: {}", e)))?;

    claims_from_bytes(&bytes)
}
