//! Compact session tokens: `header.payload.signature`, each segment base64url.
//!
//! The dashboard only ever decodes the payload; the signature belongs to the
//! backend and is not checked here. `TokenIssuer` produces HS256 tokens for the
//! issuing side, fixtures and the CLI.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use super::claims::Claims;
use super::session::SessionError;

type HmacSha256 = Hmac<Sha256>;

const MAX_TOKEN_LEN: usize = 8 * 1024;

#[derive(Serialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

fn decode_segment(seg: &str) -> Result<Vec<u8>, SessionError> {
    // Tolerate padded segments; JWT producers disagree on this.
    URL_SAFE_NO_PAD
        .decode(seg.trim_end_matches('='))
        .map_err(|e| SessionError::Malformed(format!("token segment is not base64url: {}", e)))
}

/// Decode the claims carried in the middle segment of `token`.
pub fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let token = token.trim();
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(SessionError::Malformed("token length out of range".into()));
    }
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(SessionError::Malformed("token must have three segments".into()));
    };
    let bytes = decode_segment(payload)?;
    serde_json::from_slice::<Claims>(&bytes)
        .map_err(|e| SessionError::Malformed(format!("token claims: {}", e)))
}

/// Signs claims into compact HS256 tokens.
pub struct TokenIssuer {
    key: Vec<u8>,
}

impl TokenIssuer {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self { key: key.as_ref().to_vec() }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, SessionError> {
        let header = serde_json::to_vec(&Header { alg: "HS256", typ: "JWT" })
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        let payload = serde_json::to_vec(claims).map_err(|e| SessionError::Malformed(e.to_string()))?;
        let signing_input = format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(payload));
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        let sig = mac.finalize().into_bytes();
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(sig)))
    }

    /// Check a token's signature against this issuer's key.
    pub fn verify(&self, token: &str) -> bool {
        let Some((signing_input, sig)) = token.rsplit_once('.') else { return false; };
        let Ok(expected) = decode_segment(sig) else { return false; };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else { return false; };
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}
