//! Bearer token header handling and unverified claim extraction.
//!
//! The gateway trusts the upstream edge to have already verified the token's
//! signature; here the payload segment is only base64-decoded to read claims.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// Header absent.
    NoToken,
    /// Header present but empty after stripping `Bearer ` and trimming.
    InvalidToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    /// Payload segment missing, not base64, or not JSON.
    TokenParseFailed,
    /// Decoded successfully but neither `universal_id` nor `id` was a non-empty string.
    NoUserId,
}

#[derive(Deserialize)]
struct Claims {
    universal_id: Option<String>,
    id: Option<String>,
}

/// Strip an optional `Bearer ` prefix and trim; classify emptiness.
pub fn extract_bearer_token(header_value: Option<&str>) -> Result<String, HeaderError> {
    let Some(raw) = header_value else {
        return Err(HeaderError::NoToken);
    };
    let stripped = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if stripped.is_empty() {
        return Err(HeaderError::InvalidToken);
    }
    Ok(stripped.to_string())
}

/// Parse the token's payload segment without verifying its signature, preferring
/// the `universal_id` claim and falling back to the legacy `id` claim.
pub fn extract_identity(token: &str) -> Result<String, ClaimError> {
    let payload_segment = token
        .split('.')
        .nth(1)
        .ok_or(ClaimError::TokenParseFailed)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload_segment)
        .map_err(|_| ClaimError::TokenParseFailed)?;
    let claims: Claims =
        serde_json::from_slice(&decoded).map_err(|_| ClaimError::TokenParseFailed)?;

    let identity = claims
        .universal_id
        .filter(|s| !s.is_empty())
        .or_else(|| claims.id.filter(|s| !s.is_empty()));

    identity.ok_or(ClaimError::NoUserId)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_payload(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn make_token(payload_json: &str) -> String {
        format!("header.{}.sig", encode_payload(payload_json))
    }

    #[test]
    fn extract_bearer_token_strips_prefix_and_trims() {
        assert_eq!(
            extract_bearer_token(Some("Bearer  abc123 ")).unwrap(),
            "abc123"
        );
        assert_eq!(extract_bearer_token(Some("abc123")).unwrap(), "abc123");
    }

    #[test]
    fn extract_bearer_token_classifies_missing_and_empty() {
        assert_eq!(extract_bearer_token(None), Err(HeaderError::NoToken));
        assert_eq!(
            extract_bearer_token(Some("Bearer ")),
            Err(HeaderError::InvalidToken)
        );
        assert_eq!(extract_bearer_token(Some("   ")), Err(HeaderError::InvalidToken));
    }

    #[test]
    fn extract_identity_prefers_universal_id() {
        let token = make_token(r#"{"universal_id":"u1","id":"legacy"}"#);
        assert_eq!(extract_identity(&token).unwrap(), "u1");
    }

    #[test]
    fn extract_identity_falls_back_to_legacy_id() {
        let token = make_token(r#"{"id":"legacy"}"#);
        assert_eq!(extract_identity(&token).unwrap(), "legacy");
    }

    #[test]
    fn extract_identity_rejects_empty_claims() {
        let token = make_token(r#"{"universal_id":"","id":""}"#);
        assert_eq!(extract_identity(&token), Err(ClaimError::NoUserId));
    }

    #[test]
    fn extract_identity_rejects_malformed_token() {
        assert_eq!(
            extract_identity("not-a-jwt"),
            Err(ClaimError::TokenParseFailed)
        );
        assert_eq!(
            extract_identity("a.not-base64!!!.c"),
            Err(ClaimError::TokenParseFailed)
        );
    }
}
