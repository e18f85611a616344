use crate::client::{ApiClient, RequestOptions};
use crate::entities::user::{
    AdminLoginRequest, AdminLoginResponse, AdminOtpRequest, AdminOtpResponse, AuthResponse,
    CreateAdminRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};
use crate::entities::Ack;
use crate::error::AppResult;
use crate::routes::endpoints;

/// Credential endpoints. All of these go out without a stored token.
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    // ============ Customers ============

    pub async fn login(&self, req: &LoginRequest) -> AppResult<AuthResponse> {
        self.client
            .post(endpoints::USER_LOGIN, req, &RequestOptions::public())
            .await
    }

    pub async fn register(&self, req: &RegisterRequest) -> AppResult<AuthResponse> {
        self.client
            .post(endpoints::USER_REGISTER, req, &RequestOptions::public())
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> AppResult<Ack> {
        let req = ForgotPasswordRequest {
            email: email.trim().to_string(),
        };
        self.client
            .post(endpoints::FORGOT_PASSWORD, &req, &RequestOptions::public())
            .await
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> AppResult<Ack> {
        self.client
            .post(endpoints::RESET_PASSWORD, req, &RequestOptions::public())
            .await
    }

    // ============ Administrators ============

    pub async fn admin_login(&self, req: &AdminLoginRequest) -> AppResult<AdminLoginResponse> {
        self.client
            .post(endpoints::ADMIN_LOGIN, req, &RequestOptions::public())
            .await
    }

    pub async fn request_admin_otp(&self, req: &AdminOtpRequest) -> AppResult<AdminOtpResponse> {
        self.client
            .post(endpoints::ADMIN_REQUEST_OTP, req, &RequestOptions::public())
            .await
    }

    pub async fn create_admin(&self, req: &CreateAdminRequest) -> AppResult<Ack> {
        self.client
            .post(endpoints::ADMIN_CREATE, req, &RequestOptions::public())
            .await
    }

    /// Ask the server whether `token` is still a valid admin token. Sent
    /// outside the 401 policy so a failed check never clears the store.
    pub async fn check_admin(&self, token: &str) -> AppResult<Ack> {
        let opts = RequestOptions::admin().with_bearer(token).bypass_auth_policy();
        self.client.get(endpoints::ADMIN_CHECK_AUTH, &opts).await
    }
}
