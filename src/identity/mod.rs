//! Session identity: the stored credential, its claims and the resolver that
//! turns one into the other. Keep the public surface thin.

mod role;
mod claims;
mod token;
mod cipher;
mod store;
mod session;

pub use role::{Role, RoleSet};
pub use claims::{Claims, Identity};
pub use token::{decode_claims, TokenIssuer};
pub use cipher::CredentialCipher;
pub use store::{SessionStore, MemorySessionStore, FileSessionStore};
pub use session::{SessionResolver, ResolvedSession, SessionError, now_secs};
