use crate::client::{ApiClient, MultipartForm, RequestOptions};
use crate::entities::booking::Booking;
use crate::entities::driver::{AssignDriverRequest, CompleteAssignmentRequest, Driver, DriverForm};
use crate::entities::{Ack, DataEnvelope};
use crate::error::{AppError, AppResult};
use crate::routes::endpoints;

use super::admin::AdminApi;

/// Driver management in the back office.
pub struct DriversApi<'a> {
    client: &'a ApiClient,
}

fn opts() -> RequestOptions {
    RequestOptions::admin()
}

impl<'a> DriversApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> AppResult<Vec<Driver>> {
        let resp: DataEnvelope<Vec<Driver>> = self.client.get(endpoints::ADMIN_DRIVERS, &opts()).await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn get(&self, id: &str) -> AppResult<Driver> {
        let resp: DataEnvelope<Driver> = self.client.get(&endpoints::driver(id), &opts()).await?;
        resp.data.ok_or_else(|| {
            AppError::NotFound(resp.message.unwrap_or_else(|| "Driver information is incomplete".to_string()))
        })
    }

    pub async fn available(&self) -> AppResult<Vec<Driver>> {
        let resp: DataEnvelope<Vec<Driver>> = self
            .client
            .get(endpoints::AVAILABLE_DRIVERS, &opts())
            .await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn create(&self, form: &DriverForm) -> AppResult<Driver> {
        form.validate()?;
        let resp: DataEnvelope<Driver> = self
            .client
            .post_multipart(endpoints::ADMIN_DRIVERS, driver_multipart(form), &opts())
            .await?;
        resp.data.ok_or_else(|| {
            AppError::BadRequest(resp.message.unwrap_or_else(|| "Failed to add driver".to_string()))
        })
    }

    pub async fn update(&self, id: &str, form: &DriverForm) -> AppResult<Driver> {
        form.validate()?;
        let resp: DataEnvelope<Driver> = self
            .client
            .put_multipart(&endpoints::driver(id), driver_multipart(form), &opts())
            .await?;
        resp.data.ok_or_else(|| {
            AppError::BadRequest(resp.message.unwrap_or_else(|| "Failed to update driver".to_string()))
        })
    }

    pub async fn delete(&self, id: &str) -> AppResult<Ack> {
        self.client.delete(&endpoints::driver(id), &opts()).await
    }

    /// Bookings that asked for a driver and do not have one yet.
    pub async fn bookings_awaiting_driver(&self) -> AppResult<Vec<Booking>> {
        let bookings = AdminApi::new(self.client).list_bookings().await?;
        Ok(bookings.into_iter().filter(Booking::awaiting_driver).collect())
    }

    pub async fn assign(&self, driver_id: &str, booking_id: &str) -> AppResult<Ack> {
        let body = AssignDriverRequest {
            driver_id: driver_id.to_string(),
            booking_id: booking_id.to_string(),
        };
        let ack: Ack = self.client.post(endpoints::ASSIGN_DRIVER, &body, &opts()).await?;
        if !ack.success {
            return Err(AppError::BadRequest("Failed to assign driver".to_string()));
        }
        tracing::info!(driver_id, booking_id, "Driver assigned");
        Ok(ack)
    }

    pub async fn complete_assignment(&self, driver_id: &str) -> AppResult<Ack> {
        let body = CompleteAssignmentRequest {
            driver_id: driver_id.to_string(),
        };
        let ack: Ack = self
            .client
            .post(endpoints::COMPLETE_ASSIGNMENT, &body, &opts())
            .await?;
        if !ack.success {
            return Err(AppError::BadRequest("Failed to complete assignment".to_string()));
        }
        Ok(ack)
    }
}

fn driver_multipart(form: &DriverForm) -> MultipartForm {
    let mut multipart = form
        .text_fields()
        .into_iter()
        .fold(MultipartForm::new(), |m, (name, value)| m.text(name, value));
    if let Some(image) = &form.profile_image {
        multipart = multipart.file("profileImage", image.clone());
    }
    if let Some(image) = &form.license_image {
        multipart = multipart.file("licenseImage", image.clone());
    }
    multipart
}

/// The "assign driver" dialog: one driver, the bookings it may take, and
/// the booking picked so far.
#[derive(Debug, Clone)]
pub struct DriverAssignment {
    driver_id: String,
    candidates: Vec<Booking>,
    selected: Option<String>,
}

impl DriverAssignment {
    pub fn new(driver_id: impl Into<String>, candidates: Vec<Booking>) -> Self {
        Self {
            driver_id: driver_id.into(),
            candidates: candidates.into_iter().filter(Booking::awaiting_driver).collect(),
            selected: None,
        }
    }

    /// Preselect the booking the bookings page sent us here for, if it is
    /// still waiting for a driver.
    pub fn with_pending(mut self, booking_id: Option<&str>) -> Self {
        if let Some(id) = booking_id {
            if self.candidates.iter().any(|b| b.id == id) {
                self.selected = Some(id.to_string());
            }
        }
        self
    }

    pub fn candidates(&self) -> &[Booking] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, booking_id: &str) -> AppResult<()> {
        if !self.candidates.iter().any(|b| b.id == booking_id) {
            return Err(AppError::validation("Booking is not awaiting a driver"));
        }
        self.selected = Some(booking_id.to_string());
        Ok(())
    }

    /// Nothing is sent until a booking has been picked.
    pub async fn submit(&self, api: &DriversApi<'_>) -> AppResult<Ack> {
        let Some(booking_id) = self.selected.as_deref() else {
            return Err(AppError::validation("Please select a booking"));
        };
        api.assign(&self.driver_id, booking_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(id: &str, needs_driver: bool, driver_assigned: bool) -> Booking {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "startDate": "2026-03-01T00:00:00Z",
            "endDate": "2026-03-03T00:00:00Z",
            "status": "confirmed",
            "totalAmount": 8000,
            "needsDriver": needs_driver,
            "driverAssigned": driver_assigned,
        }))
        .unwrap()
    }

    #[test]
    fn test_only_bookings_awaiting_driver_are_candidates() {
        let assignment = DriverAssignment::new(
            "d1",
            vec![
                booking("b1", true, false),
                booking("b2", false, false),
                booking("b3", true, true),
            ],
        );
        let ids: Vec<&str> = assignment.candidates().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b1"]);
    }

    #[test]
    fn test_pending_hint_and_selection() {
        let mut assignment = DriverAssignment::new("d1", vec![booking("b1", true, false)])
            .with_pending(Some("b9"));
        assert_eq!(assignment.selected(), None);

        assert!(assignment.select("b3").is_err());
        assignment.select("b1").unwrap();
        assert_eq!(assignment.selected(), Some("b1"));
    }

    #[test]
    fn test_driver_multipart_attaches_only_new_images() {
        let form = DriverForm {
            name: "Ram".to_string(),
            license_number: "L-1".to_string(),
            experience: Some(4.0),
            ..DriverForm::default()
        };
        let multipart = driver_multipart(&form);
        assert_eq!(multipart.field("licenseNumber"), Some("L-1"));
        assert_eq!(multipart.field("experience"), Some("4"));
        assert_eq!(multipart.file_count(), 0);
    }
}
