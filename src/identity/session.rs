use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::access::Navigator;
use crate::config::AuthConfig;

use super::cipher::CredentialCipher;
use super::claims::{Claims, Identity};
use super::role::Role;
use super::store::SessionStore;
use super::token;

/// Why a stored credential did not yield a session.
///
/// Page components never see this: every variant resolves to the same
/// "no session" outcome. It exists for `diagnose` and for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no credential stored")]
    Missing,
    #[error("malformed credential: {0}")]
    Malformed(String),
    #[error("credential expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },
    #[error("credential names unknown role '{0}'")]
    UnknownRole(String),
    #[error("crypto failure: {0}")]
    Crypto(String),
    #[error("credential store failure: {0}")]
    Store(String),
}

impl SessionError {
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Missing => "missing",
            SessionError::Malformed(_) => "malformed",
            SessionError::Expired { .. } => "expired",
            SessionError::UnknownRole(_) => "unknown_role",
            SessionError::Crypto(_) => "crypto",
            SessionError::Store(_) => "store",
        }
    }
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Result of `SessionResolver::resolve`: the identity, or none, plus logout.
pub struct ResolvedSession<'r> {
    identity: Option<Identity>,
    resolver: &'r SessionResolver,
}

impl<'r> ResolvedSession<'r> {
    pub fn identity(&self) -> Option<&Identity> { self.identity.as_ref() }

    pub fn into_identity(self) -> Option<Identity> { self.identity }

    pub fn is_authenticated(&self) -> bool { self.identity.is_some() }

    pub fn role(&self) -> Option<Role> { self.identity.as_ref().map(|i| i.role) }

    pub fn first_name(&self) -> Option<&str> { self.identity.as_ref().map(|i| i.first_name.as_str()) }

    pub fn last_name(&self) -> Option<&str> { self.identity.as_ref().map(|i| i.last_name.as_str()) }

    pub fn email(&self) -> Option<&str> { self.identity.as_ref().map(|i| i.email.as_str()) }

    pub fn logout(&self) { self.resolver.logout() }
}

impl std::fmt::Debug for ResolvedSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSession").field("identity", &self.identity).finish()
    }
}

/// Turns the stored credential into an identity, failing closed.
pub struct SessionResolver {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    cipher: CredentialCipher,
    storage_key: String,
    sign_in_path: String,
}

impl SessionResolver {
    pub fn new(config: &AuthConfig, store: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            navigator,
            cipher: CredentialCipher::new(&config.secret),
            storage_key: config.storage_key.clone(),
            sign_in_path: config.sign_in_path.clone(),
        }
    }

    pub fn cipher(&self) -> &CredentialCipher { &self.cipher }

    /// The sealed blob as stored, for the `Authorization` header.
    pub fn stored_credential(&self) -> Option<String> {
        self.store.get(&self.storage_key).filter(|s| !s.trim().is_empty())
    }

    fn open_blob_at(&self, blob: &str, now: i64) -> Result<Identity, SessionError> {
        let token = self.cipher.open(blob)?;
        let claims = token::decode_claims(&token)?;
        if claims.is_expired_at(now) {
            return Err(SessionError::Expired { exp: claims.exp, now });
        }
        identity_from_claims(claims)
    }

    /// Validate without side effects and report the precise failure.
    pub fn diagnose_at(&self, now: i64) -> Result<Identity, SessionError> {
        let blob = self.stored_credential().ok_or(SessionError::Missing)?;
        self.open_blob_at(&blob, now)
    }

    pub fn diagnose(&self) -> Result<Identity, SessionError> {
        self.diagnose_at(now_secs())
    }

    /// Validate without side effects.
    pub fn peek_at(&self, now: i64) -> Option<Identity> {
        self.diagnose_at(now).ok()
    }

    pub fn peek(&self) -> Option<Identity> {
        self.peek_at(now_secs())
    }

    /// Resolve the caller. Any failure logs out and yields the null identity.
    pub fn resolve_at(&self, now: i64) -> ResolvedSession<'_> {
        match self.diagnose_at(now) {
            Ok(identity) => {
                debug!(target: "session", "session.resolve user={} role={}", identity.id, identity.role);
                ResolvedSession { identity: Some(identity), resolver: self }
            }
            Err(e) => {
                match &e {
                    SessionError::Missing => debug!(target: "session", "session.resolve no credential"),
                    other => info!(target: "session", "session.resolve rejected reason={} detail={}", other.reason(), other),
                }
                self.logout();
                ResolvedSession { identity: None, resolver: self }
            }
        }
    }

    pub fn resolve(&self) -> ResolvedSession<'_> {
        self.resolve_at(now_secs())
    }

    /// Clear the stored credential and navigate to sign-in.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear(&self.storage_key) {
            warn!(target: "session", "session.logout clear failed: {}", e);
        }
        self.navigator.navigate(&self.sign_in_path);
    }

    /// Persist a credential blob after checking it would resolve.
    pub fn sign_in_at(&self, blob: &str, now: i64) -> Result<Identity, SessionError> {
        let identity = self.open_blob_at(blob, now)?;
        self.store
            .set(&self.storage_key, blob.trim())
            .map_err(|e| SessionError::Store(e.to_string()))?;
        info!(target: "session", "session.sign_in user={} role={} exp={}", identity.id, identity.role, identity.expires_at);
        Ok(identity)
    }

    pub fn sign_in(&self, blob: &str) -> Result<Identity, SessionError> {
        self.sign_in_at(blob, now_secs())
    }
}

fn identity_from_claims(claims: Claims) -> Result<Identity, SessionError> {
    let role: Role = claims.role.parse()?;
    Ok(Identity {
        id: claims.id,
        email: claims.email,
        first_name: claims.first_name,
        last_name: claims.last_name,
        role,
        expires_at: claims.exp,
    })
}
