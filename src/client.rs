use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::entities::Upload;
use crate::error::{generic_failure, AppError, AppResult};
use crate::middleware::auth::{bearer_header, select_token, session_keys, should_clear_session, Audience};
use crate::middleware::logging::{log_request, log_response, log_transport_error};
use crate::middleware::retry::RetryPolicy;
use crate::routes::Navigator;
use crate::session::store::TokenStore;

/// Delay between clearing a rejected session and the redirect to login.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(1);

/// Per-request knobs. The default lets the client classify the request
/// from its path and the current page.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub audience: Option<Audience>,
    /// Full `Authorization` header value; never replaced by the stored token.
    pub authorization: Option<String>,
    /// Skip the 401 retry and session clearing.
    pub bypass_auth_policy: bool,
    pub timeout: Option<Duration>,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn for_audience(audience: Audience) -> Self {
        Self {
            audience: Some(audience),
            ..Self::default()
        }
    }

    pub fn admin() -> Self {
        Self::for_audience(Audience::Admin)
    }

    pub fn user() -> Self {
        Self::for_audience(Audience::User)
    }

    pub fn public() -> Self {
        Self::for_audience(Audience::Public)
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.authorization = Some(bearer_header(token));
        self
    }

    pub fn bypass_auth_policy(mut self) -> Self {
        self.bypass_auth_policy = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Multipart body that can be rebuilt for a retry.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    files: Vec<(String, Upload)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, upload: Upload) -> Self {
        self.files.push((name.into(), upload));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn build(&self) -> AppResult<Form> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for (name, upload) in &self.files {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.mime)?;
            form = form.part(name.clone(), part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A successful response with its body already parsed.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> AppResult<T> {
        Ok(serde_json::from_value(self.body)?)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

/// HTTP client for the rental API. Picks the credential for each request
/// and applies the 401 policy. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
    store: Arc<dyn TokenStore>,
    navigator: Navigator,
    retry: RetryPolicy,
    redirect_delay: Duration,
}

impl ApiClient {
    pub fn new(config: Config, store: Arc<dyn TokenStore>, navigator: Navigator) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            config,
            store,
            navigator,
            retry: RetryPolicy::default(),
            redirect_delay: REDIRECT_DELAY,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    // ============ Typed helpers ============

    pub async fn get<T: DeserializeOwned>(&self, path: &str, opts: &RequestOptions) -> AppResult<T> {
        self.send(Method::GET, path, Payload::Empty, opts).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B, opts: &RequestOptions) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = Payload::Json(serde_json::to_value(body)?);
        self.send(Method::POST, path, payload, opts).await?.json()
    }

    pub async fn put<B, T>(&self, path: &str, body: &B, opts: &RequestOptions) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = Payload::Json(serde_json::to_value(body)?);
        self.send(Method::PUT, path, payload, opts).await?.json()
    }

    /// PUT without a body, e.g. the toggle endpoints.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str, opts: &RequestOptions) -> AppResult<T> {
        self.send(Method::PUT, path, Payload::Empty, opts).await?.json()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, opts: &RequestOptions) -> AppResult<T> {
        self.send(Method::DELETE, path, Payload::Empty, opts).await?.json()
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
        opts: &RequestOptions,
    ) -> AppResult<T> {
        self.send(Method::POST, path, Payload::Multipart(form), opts)
            .await?
            .json()
    }

    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
        opts: &RequestOptions,
    ) -> AppResult<T> {
        self.send(Method::PUT, path, Payload::Multipart(form), opts)
            .await?
            .json()
    }

    // ============ Core ============

    /// Send a request and return the parsed body of a 2xx response.
    /// Anything else becomes an `AppError` carrying the server's message.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
        opts: &RequestOptions,
    ) -> AppResult<ApiResponse> {
        let audience = opts
            .audience
            .unwrap_or_else(|| Audience::classify(path, &self.navigator.current()));
        let url = self.url(path);
        let mut attempt = 0;

        loop {
            let sent = match opts.authorization {
                Some(_) => None,
                None => select_token(self.store.as_ref(), audience)?,
            };

            let mut request = self.http.request(method.clone(), &url);
            if let Some(timeout) = opts.timeout {
                request = request.timeout(timeout);
            }
            if !opts.query.is_empty() {
                request = request.query(&opts.query);
            }
            match (&opts.authorization, &sent) {
                (Some(preset), _) => request = request.header(AUTHORIZATION, preset.as_str()),
                (None, Some(token)) => request = request.header(AUTHORIZATION, bearer_header(token)),
                (None, None) => {}
            }
            request = match &payload {
                Payload::Empty => request,
                Payload::Json(body) => request.json(body),
                Payload::Multipart(form) => request.multipart(form.build()?),
            };

            log_request(&method, path, audience, opts.authorization.is_some() || sent.is_some());
            let started = Instant::now();
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    log_transport_error(&method, path, audience, &e);
                    return Err(e.into());
                }
            };
            let status = response.status();
            log_response(&method, path, audience, status, started.elapsed());

            let body = read_body(response).await?;
            if status.is_success() {
                return Ok(ApiResponse { status, body });
            }

            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);

            if status == StatusCode::UNAUTHORIZED && !opts.bypass_auth_policy {
                if opts.authorization.is_none() {
                    let current = select_token(self.store.as_ref(), audience)?;
                    if self.retry.should_retry(attempt, sent.as_deref(), current.as_deref()) {
                        attempt += 1;
                        tracing::info!(path = %path, audience = %audience, attempt, "Retrying with refreshed token");
                        continue;
                    }
                }
                self.handle_unauthorized(audience, path, message.as_deref())?;
            }

            return Err(AppError::from_status(status, message, &generic_failure(status)));
        }
    }

    fn handle_unauthorized(&self, audience: Audience, path: &str, message: Option<&str>) -> AppResult<()> {
        if !should_clear_session(path, message) {
            return Ok(());
        }

        for key in session_keys(audience) {
            self.store.remove(*key)?;
        }
        tracing::warn!(audience = %audience, path = %path, "Session cleared after failed auth check");

        if let Some(route) = audience.login_route() {
            self.navigator.schedule_redirect(route, self.redirect_delay);
        }
        Ok(())
    }
}

async fn read_body(response: reqwest::Response) -> AppResult<Value> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.api_base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_options_builders() {
        let opts = RequestOptions::user()
            .with_bearer("t1")
            .timeout(Duration::from_secs(15));
        assert_eq!(opts.audience, Some(Audience::User));
        assert_eq!(opts.authorization.as_deref(), Some("Bearer t1"));
        assert_eq!(opts.timeout, Some(Duration::from_secs(15)));
        assert!(!opts.bypass_auth_policy);
    }

    #[test]
    fn test_multipart_form_fields() {
        let form = MultipartForm::new()
            .text("name", "Swift")
            .file("images", Upload::new("a.png", "image/png", vec![1, 2, 3]));
        assert_eq!(form.field("name"), Some("Swift"));
        assert_eq!(form.file_count(), 1);
        assert!(form.build().is_ok());
    }
}
