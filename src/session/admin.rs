use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::api::auth::AuthApi;
use crate::client::ApiClient;
use crate::entities::user::{AdminLoginRequest, AdminOtpRequest, AdminOtpResponse, CreateAdminRequest};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{select_token, Audience};
use crate::routes::{pages, require_admin, Guard};
use crate::utils::validation::require_non_empty;

use super::store::StoreKey;
use super::SessionToken;

/// Consecutive failed checks that end the session.
pub const MAX_CHECK_FAILURES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unknown,
    /// Token found in the store, not yet confirmed by the server.
    OptimisticallyAuthenticated,
    Verified,
    /// `n` consecutive failed checks; still treated as signed in.
    Failed(u8),
    LoggedOut,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            SessionState::OptimisticallyAuthenticated | SessionState::Verified | SessionState::Failed(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminLoginStep {
    Authenticated,
    /// The server emailed a one-time code; call `login_with_otp`.
    OtpRequired { message: Option<String> },
}

/// Back-office session with periodic re-validation.
///
/// Clones share state. The revalidation timer stops on `unmount`, on
/// logout, or when the last clone is dropped.
#[derive(Clone)]
pub struct AdminSession {
    inner: Arc<Inner>,
}

struct Inner {
    client: ApiClient,
    state: RwLock<SessionState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    revalidate_every: Duration,
}

impl AdminSession {
    pub fn new(client: ApiClient) -> Self {
        let every = client.config().revalidate_interval();
        Self::with_revalidate_interval(client, every)
    }

    pub fn with_revalidate_interval(client: ApiClient, revalidate_every: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                state: RwLock::new(SessionState::Unknown),
                timer: Mutex::new(None),
                revalidate_every,
            }),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.inner.state.read().await
    }

    pub async fn is_valid(&self) -> bool {
        self.state().await.is_authenticated()
    }

    pub fn current_token(&self) -> AppResult<Option<SessionToken>> {
        Ok(select_token(self.inner.client.store().as_ref(), Audience::Admin)?
            .map(|token| SessionToken::new(token, Audience::Admin)))
    }

    pub fn has_scheduled_check(&self) -> bool {
        self.inner
            .timer
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Pick up a stored token and, on back-office pages other than the
    /// login page, confirm it with the server.
    pub async fn mount(&self) -> AppResult<SessionState> {
        let token = select_token(self.inner.client.store().as_ref(), Audience::Admin)?;
        let initial = if token.is_some() {
            SessionState::OptimisticallyAuthenticated
        } else {
            SessionState::LoggedOut
        };
        self.inner.set_state(initial).await;

        let navigator = self.inner.client.navigator();
        if navigator.is_under(pages::ADMIN) && !navigator.is_at(pages::ADMIN_LOGIN) {
            return self.inner.verify().await;
        }
        Ok(initial)
    }

    pub fn unmount(&self) {
        self.inner.cancel_timer();
    }

    /// Run one server check now.
    pub async fn verify(&self) -> AppResult<SessionState> {
        self.inner.verify().await
    }

    pub async fn guard(&self) -> Guard {
        let guard = require_admin(self.is_valid().await);
        if let Guard::Redirect(to) = guard {
            self.inner.client.navigator().navigate(to);
        }
        guard
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<AdminLoginStep> {
        require_non_empty(username, "Please enter username and password")?;
        require_non_empty(password, "Please enter username and password")?;
        self.submit_login(AdminLoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
            otp: None,
        })
        .await
    }

    pub async fn login_with_otp(&self, username: &str, password: &str, otp: &str) -> AppResult<()> {
        require_non_empty(otp, "Please enter the OTP")?;
        let step = self
            .submit_login(AdminLoginRequest {
                username: username.trim().to_string(),
                password: password.to_string(),
                otp: Some(otp.trim().to_string()),
            })
            .await?;

        match step {
            AdminLoginStep::Authenticated => Ok(()),
            AdminLoginStep::OtpRequired { message } => Err(AppError::Unauthorized(
                message.unwrap_or_else(|| "OTP verification failed".to_string()),
            )),
        }
    }

    async fn submit_login(&self, req: AdminLoginRequest) -> AppResult<AdminLoginStep> {
        let client = &self.inner.client;
        // Only one identity at a time: an admin login ends the customer session.
        client.store().remove(StoreKey::UserToken)?;

        let resp = AuthApi::new(client).admin_login(&req).await?;
        if resp.require_otp && req.otp.is_none() {
            tracing::info!(username = %req.username, "Admin login requires OTP");
            return Ok(AdminLoginStep::OtpRequired {
                message: resp.message,
            });
        }

        let token = match resp.token.filter(|t| !t.is_empty()) {
            Some(token) if resp.success => token,
            _ => {
                return Err(AppError::Unauthorized(
                    resp.message.unwrap_or_else(|| "Login failed".to_string()),
                ))
            }
        };

        client.store().set(StoreKey::AdminToken, &token)?;
        self.inner.set_state(SessionState::Verified).await;
        self.inner.schedule_revalidation();
        client.navigator().navigate(pages::ADMIN_DASHBOARD);

        tracing::info!(username = %req.username, "Admin signed in");
        Ok(AdminLoginStep::Authenticated)
    }

    /// First step of admin registration: have the server email a code.
    pub async fn request_registration_otp(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> AppResult<AdminOtpResponse> {
        for value in [username, password, email] {
            require_non_empty(value, "Please fill all required fields")?;
        }
        let req = AdminOtpRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
            email: email.trim().to_string(),
        };
        let resp = AuthApi::new(&self.inner.client).request_admin_otp(&req).await?;
        if !resp.success {
            return Err(AppError::BadRequest(
                resp.message.unwrap_or_else(|| "Failed to send OTP".to_string()),
            ));
        }
        Ok(resp)
    }

    pub async fn create_admin(&self, username: &str, otp: &str) -> AppResult<String> {
        require_non_empty(otp, "Please enter the OTP")?;
        let req = CreateAdminRequest {
            username: username.trim().to_string(),
            otp: otp.trim().to_string(),
        };
        let ack = AuthApi::new(&self.inner.client).create_admin(&req).await?;
        if !ack.success {
            return Err(AppError::BadRequest(
                ack.message.unwrap_or_else(|| "Registration failed".to_string()),
            ));
        }
        Ok(ack
            .message
            .unwrap_or_else(|| "Admin account created! Please login.".to_string()))
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.inner.cancel_timer();
        self.inner.client.store().remove(StoreKey::AdminToken)?;
        self.inner.set_state(SessionState::LoggedOut).await;
        self.inner.client.navigator().navigate(pages::ADMIN_LOGIN);
        tracing::info!("Admin signed out");
        Ok(())
    }
}

impl Inner {
    async fn set_state(&self, next: SessionState) {
        let mut state = self.state.write().await;
        if *state != next {
            tracing::debug!(from = ?*state, to = ?next, "Admin session state");
        }
        *state = next;
    }

    async fn verify(self: &Arc<Self>) -> AppResult<SessionState> {
        let Some(token) = select_token(self.client.store().as_ref(), Audience::Admin)? else {
            self.cancel_timer();
            self.set_state(SessionState::LoggedOut).await;
            return Ok(SessionState::LoggedOut);
        };

        let checked = AuthApi::new(&self.client).check_admin(&token).await;

        // Signed out or replaced while the check was in flight.
        let current = select_token(self.client.store().as_ref(), Audience::Admin)?;
        if current.as_deref() != Some(token.as_str()) {
            tracing::debug!("Admin token changed during auth check, result discarded");
            return Ok(*self.state.read().await);
        }

        let reason = match checked {
            Ok(ack) if ack.success => {
                self.set_state(SessionState::Verified).await;
                self.schedule_revalidation();
                return Ok(SessionState::Verified);
            }
            Ok(ack) => ack
                .message
                .unwrap_or_else(|| "Invalid auth response".to_string()),
            Err(e) => e.to_string(),
        };

        let next = {
            let mut state = self.state.write().await;
            let failures = match *state {
                SessionState::Failed(n) => n.saturating_add(1),
                _ => 1,
            };
            *state = if failures >= MAX_CHECK_FAILURES {
                SessionState::LoggedOut
            } else {
                SessionState::Failed(failures)
            };
            tracing::warn!(failures, max = MAX_CHECK_FAILURES, reason = %reason, "Admin auth check failed");
            *state
        };

        if next == SessionState::LoggedOut {
            self.cancel_timer();
            self.client.store().remove(StoreKey::AdminToken)?;
            tracing::warn!("Multiple auth check failures, admin signed out");
        }
        Ok(next)
    }

    fn schedule_revalidation(self: &Arc<Self>) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let every = self.revalidate_every;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(every).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Detach ourselves so the check can schedule the next run.
            if let Ok(mut timer) = inner.timer.lock() {
                timer.take();
            }
            if let Err(e) = inner.verify().await {
                tracing::warn!(error = %e, "Scheduled admin auth check failed");
            }
        });

        if let Ok(mut timer) = self.timer.lock() {
            if let Some(previous) = timer.replace(handle) {
                previous.abort();
            }
        }
    }

    fn cancel_timer(&self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_checks_still_count_as_signed_in() {
        assert!(SessionState::Failed(2).is_authenticated());
        assert!(SessionState::OptimisticallyAuthenticated.is_authenticated());
        assert!(!SessionState::LoggedOut.is_authenticated());
        assert!(!SessionState::Unknown.is_authenticated());
    }
}
