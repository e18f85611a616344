use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{number_or_string, optional_number_or_string, HasId, Upload};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CarStatus {
    #[default]
    Available,
    NotAvailable,
    OutOfService,
    AvailableSoon,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::NotAvailable => "not-available",
            CarStatus::OutOfService => "out-of-service",
            CarStatus::AvailableSoon => "available-soon",
        }
    }
}

impl std::str::FromStr for CarStatus {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "available" => Ok(CarStatus::Available),
            "not-available" => Ok(CarStatus::NotAvailable),
            "out-of-service" => Ok(CarStatus::OutOfService),
            "available-soon" => Ok(CarStatus::AvailableSoon),
            other => Err(AppError::validation(format!("Unknown car status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(rename = "type", default)]
    pub car_type: String,
    #[serde(default)]
    pub transmission: String,
    #[serde(default)]
    pub fuel: String,
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub seats: Option<f64>,
    /// Daily rate in rupees.
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub mileage: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: CarStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for Car {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Car {
    pub fn is_available(&self) -> bool {
        self.status == CarStatus::Available
    }
}

/// `GET /cars/{id}` answers `{ success, car }`.
#[derive(Debug, Clone, Deserialize)]
pub struct CarResponse {
    #[serde(default)]
    pub success: bool,
    pub car: Car,
}

/// Fields of the admin car form, sent as multipart.
#[derive(Debug, Clone, Default)]
pub struct CarForm {
    pub name: String,
    pub brand: String,
    pub car_type: String,
    pub transmission: String,
    pub fuel: String,
    pub seats: u32,
    pub price: f64,
    pub mileage: Option<f64>,
    pub description: String,
    pub images: Vec<Upload>,
}

impl CarForm {
    pub const MIN_SEATS: u32 = 2;
    pub const MAX_SEATS: u32 = 10;

    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Car name is required."));
        }
        if !(Self::MIN_SEATS..=Self::MAX_SEATS).contains(&self.seats) {
            return Err(AppError::validation("Seats must be between 2 and 10."));
        }
        if self.price <= 0.0 {
            return Err(AppError::validation("Price per day must be positive."));
        }
        Ok(())
    }

    /// Text fields in the order the form posts them.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("brand", self.brand.clone()),
            ("type", self.car_type.clone()),
            ("transmission", self.transmission.clone()),
            ("fuel", self.fuel.clone()),
            ("seats", self.seats.to_string()),
            ("price", self.price.to_string()),
            ("description", self.description.clone()),
        ];
        if let Some(mileage) = self.mileage {
            fields.push(("mileage", mileage.to_string()));
        }
        fields
    }
}

#[derive(Debug, Serialize)]
pub struct CarStatusUpdate {
    pub status: CarStatus,
}
