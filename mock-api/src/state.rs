use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::auth::{create_token, ROLE_ADMIN, ROLE_USER};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const ADMIN_OTP: &str = "123456";
pub const USER_PASSWORD: &str = "secret123";

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Rental records, kept as the JSON the real API would return.
#[derive(Debug)]
pub(crate) struct Data {
    pub users: Vec<Value>,
    pub cars: Vec<Value>,
    pub bookings: Vec<Value>,
    pub drivers: Vec<Value>,
}

impl Data {
    fn seed() -> Self {
        Self {
            users: vec![
                json!({ "_id": "u1", "name": "Asha Gurung", "email": "asha@example.com", "phone": "9800000001", "isBlocked": false }),
                json!({ "_id": "u2", "name": "Bikash Rai", "email": "blocked@example.com", "phone": "9800000002", "isBlocked": true }),
            ],
            cars: vec![
                json!({ "_id": "c1", "name": "Hyundai Creta", "brand": "Hyundai", "type": "SUV", "price": 1000, "seats": 5, "status": "available", "images": ["/uploads/creta.jpg"] }),
                json!({ "_id": "c2", "name": "Suzuki Swift", "brand": "Suzuki", "type": "Hatchback", "price": "2500", "seats": 5, "status": "not-available", "images": [] }),
            ],
            bookings: vec![
                json!({
                    "_id": "b-driver", "user": "u1", "car": "c1",
                    "startDate": "2026-03-01T00:00:00Z", "endDate": "2026-03-03T00:00:00Z",
                    "needsDriver": true, "driverAssigned": false,
                    "status": "confirmed", "totalAmount": 4000, "createdAt": "2026-02-20T08:00:00Z"
                }),
                json!({
                    "_id": "b-self", "user": "u1", "car": "c1",
                    "startDate": "2026-04-01T00:00:00Z", "endDate": "2026-04-02T00:00:00Z",
                    "needsDriver": false, "driverAssigned": false,
                    "status": "pending", "totalAmount": 1000, "createdAt": "2026-02-25T08:00:00Z"
                }),
            ],
            drivers: vec![
                json!({ "_id": "d1", "name": "Ram Thapa", "licenseNumber": "KTM-4521", "phone": "9811111111", "status": "available" }),
            ],
        }
    }
}

#[derive(Debug)]
struct Knobs {
    check_auth_failures: u32,
    check_auth_message: String,
    check_auth_delay: Duration,
    admin_otp_required: bool,
    khalti_initiate_failure: Option<StatusCode>,
    khalti_lookup: (StatusCode, Value),
}

impl Default for Knobs {
    fn default() -> Self {
        Self {
            check_auth_failures: 0,
            check_auth_message: "Invalid admin session".to_string(),
            check_auth_delay: Duration::ZERO,
            admin_otp_required: false,
            khalti_initiate_failure: None,
            khalti_lookup: (StatusCode::OK, json!({ "success": true, "data": { "status": "Pending" } })),
        }
    }
}

struct Inner {
    jwt_secret: String,
    data: Mutex<Data>,
    knobs: Mutex<Knobs>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Shared state of the mock server. Cloning shares it, so tests keep a
/// handle to script responses and inspect traffic.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new("mock-secret")
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockState {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                jwt_secret: jwt_secret.into(),
                data: Mutex::new(Data::seed()),
                knobs: Mutex::new(Knobs::default()),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner.jwt_secret
    }

    pub(crate) fn data(&self) -> MutexGuard<'_, Data> {
        lock(&self.inner.data)
    }

    // ============ Tokens ============

    pub fn user_token(&self, user_id: &str) -> String {
        create_token(user_id, ROLE_USER, &self.inner.jwt_secret, 24)
    }

    pub fn admin_token(&self) -> String {
        self.admin_token_for(ADMIN_USERNAME)
    }

    pub fn admin_token_for(&self, admin_id: &str) -> String {
        create_token(admin_id, ROLE_ADMIN, &self.inner.jwt_secret, 24)
    }

    // ============ Scripted behaviour ============

    /// The next `count` admin checks answer 401 with `message`.
    pub fn fail_check_auth(&self, count: u32, message: &str) {
        let mut knobs = lock(&self.inner.knobs);
        knobs.check_auth_failures = count;
        knobs.check_auth_message = message.to_string();
    }

    pub(crate) fn take_check_auth_failure(&self) -> Option<String> {
        let mut knobs = lock(&self.inner.knobs);
        if knobs.check_auth_failures == 0 {
            return None;
        }
        knobs.check_auth_failures -= 1;
        Some(knobs.check_auth_message.clone())
    }

    /// Hold every admin check for `delay` before answering.
    pub fn delay_check_auth(&self, delay: Duration) {
        lock(&self.inner.knobs).check_auth_delay = delay;
    }

    pub(crate) fn check_auth_delay(&self) -> Duration {
        lock(&self.inner.knobs).check_auth_delay
    }

    pub fn require_admin_otp(&self, required: bool) {
        lock(&self.inner.knobs).admin_otp_required = required;
    }

    pub(crate) fn admin_otp_required(&self) -> bool {
        lock(&self.inner.knobs).admin_otp_required
    }

    pub fn fail_khalti_initiate(&self, status: Option<StatusCode>) {
        lock(&self.inner.knobs).khalti_initiate_failure = status;
    }

    pub(crate) fn khalti_initiate_failure(&self) -> Option<StatusCode> {
        lock(&self.inner.knobs).khalti_initiate_failure
    }

    pub fn set_khalti_lookup(&self, status: StatusCode, body: Value) {
        lock(&self.inner.knobs).khalti_lookup = (status, body);
    }

    pub(crate) fn khalti_lookup(&self) -> (StatusCode, Value) {
        lock(&self.inner.knobs).khalti_lookup.clone()
    }

    // ============ Traffic ============

    pub(crate) fn record(&self, request: RecordedRequest) {
        lock(&self.inner.requests).push(request);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner.requests).clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    pub fn booking(&self, id: &str) -> Option<Value> {
        self.data().bookings.iter().find(|b| b["_id"] == id).cloned()
    }
}
