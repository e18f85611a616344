use crate::error::AppResult;
use crate::routes::{endpoints, pages};
use crate::session::store::{StoreKey, TokenStore};

/// Which credential a request is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    Admin,
    User,
    Public,
}

impl Audience {
    /// Guess the audience of an untagged request.
    ///
    /// Admin when the endpoint is under `/admin` or `/dashboard`, or the
    /// current page is part of the back office. User otherwise.
    pub fn classify(path: &str, current_page: &str) -> Self {
        let on_admin_page = current_page == pages::ADMIN || current_page.starts_with("/admin/");
        if path.starts_with("/admin") || path.starts_with("/dashboard") || on_admin_page {
            Audience::Admin
        } else {
            Audience::User
        }
    }

    pub fn store_key(&self) -> Option<StoreKey> {
        match self {
            Audience::Admin => Some(StoreKey::AdminToken),
            Audience::User => Some(StoreKey::UserToken),
            Audience::Public => None,
        }
    }

    pub fn login_route(&self) -> Option<&'static str> {
        match self {
            Audience::Admin => Some(pages::ADMIN_LOGIN),
            Audience::User => Some(pages::SIGN_IN),
            Audience::Public => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Admin => "admin",
            Audience::User => "user",
            Audience::Public => "public",
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored token for `audience`. A missing token means the request goes out
/// without credentials; there is no fallback to the other audience.
pub fn select_token(store: &dyn TokenStore, audience: Audience) -> AppResult<Option<String>> {
    match audience.store_key() {
        Some(key) => Ok(store.get(key)?.filter(|t| !t.trim().is_empty())),
        None => Ok(None),
    }
}

/// Format a value for the `Authorization` header, leaving a preformatted
/// scheme alone.
pub fn bearer_header(token: &str) -> String {
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

/// A 401 only ends the session when the auth check itself says the token
/// is bad. Other 401s are surfaced to the caller with the session intact.
pub fn should_clear_session(path: &str, message: Option<&str>) -> bool {
    endpoints::is_check_auth(path)
        && message.is_some_and(|m| m.contains("Authentication failed"))
}

/// Keys removed when a session of `audience` is cleared.
pub fn session_keys(audience: Audience) -> &'static [StoreKey] {
    match audience {
        Audience::Admin => &[StoreKey::AdminToken],
        Audience::User => &[StoreKey::UserToken, StoreKey::User],
        Audience::Public => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemoryTokenStore;

    #[test]
    fn test_classify() {
        assert_eq!(Audience::classify("/admin/bookings", "/"), Audience::Admin);
        assert_eq!(Audience::classify("/admin/drivers", "/user/mybooking"), Audience::Admin);
        assert_eq!(Audience::classify("/dashboard/stats", "/"), Audience::Admin);
        assert_eq!(Audience::classify("/cars", "/admin/manage-cars"), Audience::Admin);
        assert_eq!(Audience::classify("/bookings/user", "/user/mybooking"), Audience::User);
        assert_eq!(Audience::classify("/cars", "/administrator"), Audience::User);
    }

    #[test]
    fn test_missing_token_does_not_fall_back() {
        let store = MemoryTokenStore::new();
        store.set(StoreKey::UserToken, "user-token").unwrap();

        assert_eq!(select_token(&store, Audience::Admin).unwrap(), None);
        assert_eq!(
            select_token(&store, Audience::User).unwrap().as_deref(),
            Some("user-token")
        );
        assert_eq!(select_token(&store, Audience::Public).unwrap(), None);
    }

    #[test]
    fn test_clear_only_on_failed_auth_check() {
        assert!(should_clear_session(
            "/admin/check-auth",
            Some("Authentication failed: token expired")
        ));
        assert!(!should_clear_session("/admin/check-auth", Some("jwt malformed")));
        assert!(!should_clear_session("/bookings/user", Some("Authentication failed")));
        assert!(!should_clear_session("/admin/check-auth", None));
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(bearer_header("abc"), "Bearer abc");
        assert_eq!(bearer_header("Bearer abc"), "Bearer abc");
    }
}
