//! Sealing of the stored credential.
//!
//! Blob layout: standard base64 of `nonce (12 bytes) || ChaCha20-Poly1305 ciphertext`.
//! The key is SHA-256 of the shared secret. A wrong secret fails the AEAD tag
//! check and is reported as a malformed credential.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use sha2::{Digest, Sha256};

use super::session::SessionError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Clone)]
pub struct CredentialCipher {
    key: [u8; 32],
}

impl CredentialCipher {
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    fn aead(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key))
    }

    pub fn seal(&self, token: &str) -> Result<String, SessionError> {
        let mut nonce = [0u8; NONCE_LEN];
        getrandom::getrandom(&mut nonce).map_err(|e| SessionError::Crypto(e.to_string()))?;
        let ct = self
            .aead()
            .encrypt(Nonce::from_slice(&nonce), token.as_bytes())
            .map_err(|_| SessionError::Crypto("seal failed".into()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ct.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ct);
        Ok(STANDARD.encode(out))
    }

    pub fn open(&self, blob: &str) -> Result<String, SessionError> {
        let raw = STANDARD
            .decode(blob.trim())
            .map_err(|e| SessionError::Malformed(format!("credential is not base64: {}", e)))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(SessionError::Malformed("credential too short".into()));
        }
        let (nonce, ct) = raw.split_at(NONCE_LEN);
        let plain = self
            .aead()
            .decrypt(Nonce::from_slice(nonce), ct)
            .map_err(|_| SessionError::Malformed("credential does not open with the configured secret".into()))?;
        String::from_utf8(plain).map_err(|_| SessionError::Malformed("credential is not utf-8".into()))
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher(..)")
    }
}
