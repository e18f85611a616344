use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booking::Booking;
use super::{optional_number_or_string, HasId, Ref, Upload};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverStatus {
    #[default]
    Available,
    Assigned,
    OnLeave,
    Inactive,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Available => "available",
            DriverStatus::Assigned => "assigned",
            DriverStatus::OnLeave => "on-leave",
            DriverStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "available" => Ok(DriverStatus::Available),
            "assigned" => Ok(DriverStatus::Assigned),
            "on-leave" => Ok(DriverStatus::OnLeave),
            "inactive" => Ok(DriverStatus::Inactive),
            other => Err(AppError::validation(format!("Unknown driver status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub experience: Option<f64>,
    #[serde(default)]
    pub status: DriverStatus,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub license_image: Option<String>,
    #[serde(default)]
    pub current_booking: Option<Ref<Booking>>,
    #[serde(default)]
    pub booking_history: Vec<Ref<Booking>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for Driver {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Driver {
    pub fn can_be_assigned(&self) -> bool {
        self.status == DriverStatus::Available && self.current_booking.is_none()
    }
}

/// Admin driver form, sent as multipart. Images are only attached when a new
/// file was picked; existing image paths are left untouched on update.
#[derive(Debug, Clone, Default)]
pub struct DriverForm {
    pub name: String,
    pub license_number: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub date_of_birth: Option<String>,
    pub experience: Option<f64>,
    pub status: DriverStatus,
    pub profile_image: Option<Upload>,
    pub license_image: Option<Upload>,
}

impl DriverForm {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.license_number.trim().is_empty() {
            return Err(AppError::validation("Driver name and license number are required"));
        }
        Ok(())
    }

    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("licenseNumber", self.license_number.clone()),
            ("phone", self.phone.clone()),
            ("email", self.email.clone()),
            ("address", self.address.clone()),
            ("status", self.status.as_str().to_string()),
        ];
        if let Some(dob) = &self.date_of_birth {
            fields.push(("dateOfBirth", dob.clone()));
        }
        if let Some(years) = self.experience {
            fields.push(("experience", years.to_string()));
        }
        fields
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverRequest {
    pub driver_id: String,
    pub booking_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAssignmentRequest {
    pub driver_id: String,
}

#[derive(Debug, Serialize)]
pub struct DriverStatusUpdate {
    pub status: DriverStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_history_mixes_ids_and_objects() {
        let driver: Driver = serde_json::from_value(serde_json::json!({
            "_id": "d1",
            "name": "Ram",
            "status": "on-leave",
            "experience": "6",
            "bookingHistory": ["b1", "b2"]
        }))
        .unwrap();

        assert_eq!(driver.status, DriverStatus::OnLeave);
        assert_eq!(driver.experience, Some(6.0));
        assert_eq!(driver.booking_history.len(), 2);
        assert_eq!(driver.booking_history[1].id(), "b2");
        assert!(!driver.can_be_assigned());
    }
}
