pub mod admin;
pub mod store;
pub mod user;

use chrono::Utc;

use crate::middleware::auth::Audience;
use crate::utils::jwt::read_claims;

pub use admin::{AdminLoginStep, AdminSession, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, StoreKey, TokenStore};
pub use user::UserSession;

/// A stored bearer token and what the client could learn from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub principal_id: Option<String>,
    pub audience: Audience,
    /// No readable expiry; only the server can say when it stops working.
    pub expires_implicitly: bool,
    expired: bool,
}

impl SessionToken {
    pub fn new(token: impl Into<String>, audience: Audience) -> Self {
        let token = token.into();
        let claims = read_claims(&token);

        Self {
            principal_id: claims
                .as_ref()
                .and_then(|c| c.principal_id())
                .map(str::to_string),
            expires_implicitly: claims.as_ref().and_then(|c| c.exp).is_none(),
            expired: claims.as_ref().is_some_and(|c| c.is_expired(Utc::now())),
            token,
            audience,
        }
    }

    /// Expired according to its own `exp` claim.
    pub fn is_expired(&self) -> bool {
        self.expired
    }
}
