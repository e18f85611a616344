use crate::api::auth::AuthApi;
use crate::client::ApiClient;
use crate::entities::user::{LoginRequest, ProfileUpdate, RegisterRequest, ResetPasswordRequest, User};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{select_token, Audience};
use crate::routes::{pages, require_user, Guard};
use crate::utils::validation::{is_valid_email, passwords_match, require_non_empty};

use super::store::StoreKey;
use super::SessionToken;

pub const BLOCKED_MESSAGE: &str =
    "Your account has been blocked. Please contact support for assistance.";

/// Sign-up form, including the confirmation field the API never sees.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    pub fn validate(&self) -> AppResult<()> {
        for value in [&self.name, &self.email, &self.phone, &self.password] {
            require_non_empty(value, "Please fill all required fields")?;
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("Please enter a valid email address"));
        }
        passwords_match(&self.password, &self.confirm_password)
    }
}

/// Customer session: the `token` and cached `user` entries of the store.
#[derive(Clone)]
pub struct UserSession {
    client: ApiClient,
}

impl UserSession {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(&self.client)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        require_non_empty(email, "Please fill all required fields")?;
        require_non_empty(password, "Please fill all required fields")?;

        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp = match self.auth().login(&req).await {
            Ok(resp) => resp,
            Err(e) if e.status().is_some() && e.to_string().contains("blocked") => {
                return Err(AppError::Forbidden(BLOCKED_MESSAGE.to_string()));
            }
            Err(e) => return Err(e),
        };

        if !resp.success {
            return Err(AppError::Unauthorized(
                resp.message.unwrap_or_else(|| "Login failed!".to_string()),
            ));
        }

        let user = resp
            .user
            .ok_or_else(|| AppError::Decode("login response did not include the user".to_string()))?;
        if user.is_blocked {
            tracing::warn!(user_id = %user.id, "Blocked user attempted to sign in");
            return Err(AppError::Forbidden(BLOCKED_MESSAGE.to_string()));
        }
        let token = resp
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Decode("login response did not include a token".to_string()))?;

        let store = self.client.store();
        store.set(StoreKey::UserToken, &token)?;
        store.set(StoreKey::User, &serde_json::to_string(&user)?)?;

        let next = store
            .take(StoreKey::ReturnUrl)?
            .unwrap_or_else(|| pages::USER_DASHBOARD.to_string());
        self.client.navigator().navigate(next);

        tracing::info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    /// Create an account. The user still has to sign in afterwards.
    pub async fn register(&self, form: &Registration) -> AppResult<()> {
        form.validate()?;

        let req = RegisterRequest {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
            phone: form.phone.trim().to_string(),
        };
        let resp = self.auth().register(&req).await?;
        if resp.token.is_none() && !resp.success {
            return Err(AppError::BadRequest(
                resp.message.unwrap_or_else(|| "Registration failed".to_string()),
            ));
        }

        tracing::info!(email = %req.email, "Account registered");
        self.client.navigator().navigate(pages::SIGN_IN);
        Ok(())
    }

    pub fn logout(&self) -> AppResult<()> {
        let store = self.client.store();
        store.remove(StoreKey::UserToken)?;
        store.remove(StoreKey::User)?;
        self.client.navigator().navigate(pages::HOME);
        tracing::info!("User signed out");
        Ok(())
    }

    pub fn current_token(&self) -> AppResult<Option<SessionToken>> {
        Ok(select_token(self.client.store().as_ref(), Audience::User)?
            .map(|token| SessionToken::new(token, Audience::User)))
    }

    pub fn current_user(&self) -> AppResult<Option<User>> {
        match self.client.store().get(StoreKey::User)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Signed in as far as the client can tell: a token that has not
    /// visibly expired plus a cached profile.
    pub fn is_valid(&self) -> bool {
        let has_token = matches!(self.current_token(), Ok(Some(t)) if !t.is_expired());
        let has_user = matches!(self.current_user(), Ok(Some(_)));
        has_token && has_user
    }

    pub fn remember_return_url(&self, route: &str) -> AppResult<()> {
        self.client.store().set(StoreKey::ReturnUrl, route)
    }

    /// Guard a customer page. A redirect remembers `requested` so login
    /// can come back to it.
    pub fn guard(&self, requested: &str) -> AppResult<Guard> {
        let guard = require_user(self.is_valid());
        if let Guard::Redirect(to) = guard {
            self.remember_return_url(requested)?;
            self.client.navigator().navigate(to);
        }
        Ok(guard)
    }

    pub async fn forgot_password(&self, email: &str) -> AppResult<String> {
        require_non_empty(email, "Please enter your email")?;
        let ack = self.auth().forgot_password(email).await?;
        if !ack.success {
            return Err(AppError::BadRequest(
                ack.message.unwrap_or_else(|| "Failed to send OTP".to_string()),
            ));
        }
        Ok(ack.message.unwrap_or_else(|| "OTP sent to your email".to_string()))
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> AppResult<String> {
        passwords_match(new_password, confirm_password)?;
        require_non_empty(otp, "Please enter the OTP")?;

        let req = ResetPasswordRequest {
            email: email.trim().to_string(),
            otp: otp.trim().to_string(),
            new_password: new_password.to_string(),
        };
        let ack = self.auth().reset_password(&req).await?;
        if !ack.success {
            return Err(AppError::BadRequest(
                ack.message.unwrap_or_else(|| "Failed to reset password".to_string()),
            ));
        }
        self.client.navigator().navigate(pages::SIGN_IN);
        Ok(ack.message.unwrap_or_else(|| "Password reset successfully".to_string()))
    }

    /// Save profile changes and refresh the cached user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> AppResult<User> {
        if let Some(new_password) = &update.new_password {
            if update.current_password.as_deref().is_none_or(|p| p.is_empty()) {
                return Err(AppError::validation("Please enter your current password"));
            }
            require_non_empty(new_password, "Please enter a new password")?;
        }
        let user = self.client.customer().update_profile(update).await?;
        self.client
            .store()
            .set(StoreKey::User, &serde_json::to_string(&user)?)?;
        Ok(user)
    }
}
