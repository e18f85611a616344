use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::car::Car;
use super::driver::Driver;
use super::{number_or_string, HasId, Ref};
use crate::error::{AppError, AppResult};
use crate::utils::geo::LatLng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "active" => Ok(BookingStatus::Active),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(AppError::validation(format!("Unknown booking status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Khalti,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub car: Option<Ref<Car>>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub pickup_time: Option<String>,
    #[serde(default)]
    pub dropoff_time: Option<String>,
    #[serde(default)]
    pub needs_driver: bool,
    #[serde(default)]
    pub driver_assigned: bool,
    #[serde(default)]
    pub driver: Option<Ref<Driver>>,
    pub status: BookingStatus,
    #[serde(deserialize_with = "number_or_string")]
    pub total_amount: f64,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub location: Option<LatLng>,
    #[serde(default)]
    pub pickup_coords: Option<LatLng>,
    #[serde(default)]
    pub dropoff_coords: Option<LatLng>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for Booking {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Booking {
    pub fn car_name(&self) -> Option<&str> {
        self.car.as_ref()?.populated().map(|c| c.name.as_str())
    }

    /// Needs a driver and has none yet: eligible for admin assignment.
    pub fn awaiting_driver(&self) -> bool {
        self.needs_driver && !self.driver_assigned
    }

    pub fn is_cancellable(&self) -> bool {
        self.status == BookingStatus::Pending
    }
}

/// Payload of `POST /bookings`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub car: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub pickup_time: String,
    pub dropoff_time: String,
    pub needs_driver: bool,
    pub driver_price: f64,
    pub total_amount: f64,
    pub address: String,
    pub email: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_coords: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff_coords: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff_address: Option<String>,
}

/// `POST /bookings` and `GET /bookings/{id}` answer `{ success, booking }`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingResponse {
    #[serde(default)]
    pub success: bool,
    pub booking: Option<Booking>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `PUT /bookings/{id}/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusUpdate {
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

impl BookingStatusUpdate {
    pub fn status(status: BookingStatus) -> Self {
        Self {
            status,
            payment_method: None,
            payment_status: None,
        }
    }

    /// Cash on delivery: booking stays pending until the car is handed over.
    pub fn cash_on_delivery() -> Self {
        Self {
            status: BookingStatus::Pending,
            payment_method: Some(PaymentMethod::Cod),
            payment_status: Some(PaymentStatus::Pending),
        }
    }
}
