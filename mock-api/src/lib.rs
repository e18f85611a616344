//! In-memory stand-in for the rental REST API, used by the client's
//! integration tests. Every request is recorded so tests can assert on
//! the exact traffic the client produced.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use state::{MockState, RecordedRequest, ADMIN_OTP, ADMIN_PASSWORD, ADMIN_USERNAME, USER_PASSWORD};

const MAX_BODY: usize = 10 * 1024 * 1024;

pub fn create_router(state: MockState) -> Router {
    let public_routes = Router::new()
        .route("/users/login", post(handlers::user_login))
        .route("/admin/login", post(handlers::admin_login))
        .route("/cars", get(handlers::list_cars))
        .route("/cars/{id}", get(handlers::get_car));

    let user_routes = Router::new()
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings/user", get(handlers::user_bookings))
        .route("/bookings/{id}", get(handlers::get_booking))
        .route("/bookings/{id}/status", put(handlers::update_booking_status))
        .route("/bookings/{id}/cancel", put(handlers::cancel_booking))
        .route("/payment/khalti/initiate", post(handlers::khalti_initiate))
        .route("/payment/khalti/lookup", post(handlers::khalti_lookup))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_user));

    let admin_routes = Router::new()
        .route("/admin/check-auth", get(handlers::check_auth))
        .route("/admin/bookings", get(handlers::admin_bookings))
        .route("/admin/drivers", get(handlers::list_drivers))
        .route("/admin/drivers/assign", post(handlers::assign_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    let api = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state);

    Router::new().nest("/api", api)
}

/// Log the request into the shared state before it is routed.
async fn record_request(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => return (axum::http::StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response(),
    };

    state.record(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        authorization: parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&bytes).unwrap_or_default(),
    });
    tracing::debug!(method = %parts.method, path = %parts.uri.path(), "Mock request");

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// A running mock server on an ephemeral port. Dropping it stops the server.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: MockState,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(MockState::default()).await
    }

    pub async fn start_with(state: MockState) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = create_router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock server stopped");
            }
        });

        Ok(Self { addr, state, handle })
    }

    /// Base URL to configure the client with, including the `/api` prefix.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
