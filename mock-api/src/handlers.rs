use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::state::{MockState, ADMIN_OTP, ADMIN_PASSWORD, ADMIN_USERNAME, USER_PASSWORD};

type JsonResult = ApiResult<Json<Value>>;

// ============ Auth ============

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn user_login(State(state): State<MockState>, Json(payload): Json<LoginRequest>) -> JsonResult {
    let user = state
        .data()
        .users
        .iter()
        .find(|u| u["email"] == payload.email.as_str())
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if payload.password != USER_PASSWORD {
        return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
    }
    if user["isBlocked"] == true {
        return Err(ApiError::Forbidden("Your account has been blocked".to_string()));
    }

    let id = user["_id"].as_str().unwrap_or_default();
    Ok(Json(json!({ "success": true, "token": state.user_token(id), "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
    pub otp: Option<String>,
}

pub async fn admin_login(State(state): State<MockState>, Json(payload): Json<AdminLoginRequest>) -> JsonResult {
    if payload.username != ADMIN_USERNAME || payload.password != ADMIN_PASSWORD {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }
    if state.admin_otp_required() {
        match payload.otp.as_deref() {
            None => {
                return Ok(Json(json!({
                    "success": true,
                    "requireOTP": true,
                    "message": "OTP sent to your registered email"
                })));
            }
            Some(otp) if otp != ADMIN_OTP => {
                return Err(ApiError::Unauthorized("Invalid or expired OTP".to_string()));
            }
            Some(_) => {}
        }
    }
    Ok(Json(json!({ "success": true, "token": state.admin_token() })))
}

pub async fn check_auth(State(state): State<MockState>) -> JsonResult {
    let failure = state.take_check_auth_failure();
    let delay = state.check_auth_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if let Some(message) = failure {
        return Err(ApiError::Unauthorized(message));
    }
    Ok(Json(json!({ "success": true, "message": "Authenticated" })))
}

// ============ Cars ============

pub async fn list_cars(State(state): State<MockState>) -> JsonResult {
    let cars = state.data().cars.clone();
    Ok(Json(json!({ "success": true, "data": cars })))
}

pub async fn get_car(State(state): State<MockState>, Path(id): Path<String>) -> JsonResult {
    let car = find(&state.data().cars, &id).ok_or_else(|| ApiError::NotFound("Car not found".to_string()))?;
    Ok(Json(json!({ "success": true, "car": car })))
}

fn find(records: &[Value], id: &str) -> Option<Value> {
    records.iter().find(|r| r["_id"] == id).cloned()
}

// ============ Bookings ============

pub async fn create_booking(
    State(state): State<MockState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    for field in ["car", "startDate", "endDate", "totalAmount"] {
        if payload.get(field).is_none_or(Value::is_null) {
            return Err(ApiError::BadRequest(format!("{} is required", field)));
        }
    }

    let mut data = state.data();
    let car_id = payload["car"].as_str().unwrap_or_default();
    let car = find(&data.cars, car_id).ok_or_else(|| ApiError::NotFound("Car not found".to_string()))?;
    if car["status"] != "available" {
        return Err(ApiError::BadRequest("Car is not available for booking".to_string()));
    }

    let mut booking = payload.clone();
    booking["_id"] = json!(Uuid::new_v4().to_string());
    booking["user"] = json!(claims.id);
    booking["car"] = car;
    booking["status"] = json!("pending");
    booking["paymentStatus"] = json!("pending");
    booking["driverAssigned"] = json!(false);
    booking["createdAt"] = json!(Utc::now());
    data.bookings.push(booking.clone());

    tracing::debug!(booking_id = %booking["_id"], "Mock booking created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "booking": booking }))))
}

pub async fn user_bookings(State(state): State<MockState>, Extension(claims): Extension<Claims>) -> Json<Value> {
    let bookings: Vec<Value> = state
        .data()
        .bookings
        .iter()
        .filter(|b| b["user"] == claims.id.as_str())
        .cloned()
        .collect();
    Json(Value::Array(bookings))
}

pub async fn get_booking(State(state): State<MockState>, Path(id): Path<String>) -> JsonResult {
    let booking = state
        .booking(&id)
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;
    Ok(Json(json!({ "success": true, "booking": booking })))
}

fn update_booking(state: &MockState, id: &str, changes: &Value) -> ApiResult<Value> {
    let mut data = state.data();
    let booking = data
        .bookings
        .iter_mut()
        .find(|b| b["_id"] == id)
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;
    if let (Some(target), Some(changes)) = (booking.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(booking.clone())
}

pub async fn update_booking_status(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> JsonResult {
    if payload.get("status").is_none() {
        return Err(ApiError::BadRequest("Status is required".to_string()));
    }
    let booking = update_booking(&state, &id, &payload)?;
    Ok(Json(json!({ "success": true, "message": "Booking status updated", "booking": booking })))
}

pub async fn cancel_booking(State(state): State<MockState>, Path(id): Path<String>) -> JsonResult {
    update_booking(&state, &id, &json!({ "status": "cancelled" }))?;
    Ok(Json(json!({ "success": true, "message": "Booking cancelled" })))
}

// ============ Payment ============

pub async fn khalti_initiate(State(state): State<MockState>, Json(payload): Json<Value>) -> JsonResult {
    if let Some(status) = state.khalti_initiate_failure() {
        return Err(ApiError::Status(status, "Khalti request failed".to_string()));
    }
    let booking_id = payload["bookingId"]
        .as_str()
        .ok_or_else(|| ApiError::BadRequest("bookingId is required".to_string()))?;
    let pidx = format!("pidx-{}", booking_id);
    Ok(Json(json!({
        "success": true,
        "data": {
            "pidx": pidx,
            "payment_url": format!("https://test-pay.khalti.com/?pidx={}", pidx)
        }
    })))
}

pub async fn khalti_lookup(State(state): State<MockState>) -> (StatusCode, Json<Value>) {
    let (status, body) = state.khalti_lookup();
    (status, Json(body))
}

// ============ Admin ============

pub async fn admin_bookings(State(state): State<MockState>) -> Json<Value> {
    let bookings = state.data().bookings.clone();
    Json(json!({ "success": true, "data": bookings }))
}

pub async fn list_drivers(State(state): State<MockState>) -> Json<Value> {
    let drivers = state.data().drivers.clone();
    Json(json!({ "success": true, "data": drivers }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverRequest {
    pub driver_id: String,
    pub booking_id: String,
}

pub async fn assign_driver(State(state): State<MockState>, Json(payload): Json<AssignDriverRequest>) -> JsonResult {
    if find(&state.data().drivers, &payload.driver_id).is_none() {
        return Err(ApiError::NotFound("Driver not found".to_string()));
    }
    update_booking(
        &state,
        &payload.booking_id,
        &json!({ "driverAssigned": true, "driver": payload.driver_id }),
    )?;
    Ok(Json(json!({ "success": true, "message": "Driver assigned successfully" })))
}
