use chrono::{DateTime, Utc};

use crate::client::ApiClient;
use crate::entities::booking::CreateBookingRequest;
use crate::entities::car::Car;
use crate::entities::user::User;
use crate::error::{AppError, AppResult};
use crate::routes::pages;
use crate::utils::geo::{directions_url, find_landmark, label_point, LatLng};
use crate::utils::validation::{validate_time_slot, DEFAULT_TIME_SLOT};

use super::pricing::{Quote, DRIVER_DAILY_RATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardStep {
    #[default]
    SelectCarAndDates,
    ChooseLocation,
    ConfirmAndPay,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::SelectCarAndDates => 1,
            WizardStep::ChooseLocation => 2,
            WizardStep::ConfirmAndPay => 3,
        }
    }
}

/// Where the car is handed over and returned.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationPlan {
    Same {
        location: Option<LatLng>,
    },
    Different {
        pickup: Option<LatLng>,
        dropoff: Option<LatLng>,
        pickup_address: Option<String>,
        dropoff_address: Option<String>,
    },
}

impl Default for LocationPlan {
    fn default() -> Self {
        LocationPlan::Same { location: None }
    }
}

/// A destination picked elsewhere (the dashboard search or a landmark)
/// to start the wizard with. Applying it consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationHint {
    pub location: LatLng,
    pub label: Option<String>,
}

impl LocationHint {
    pub fn new(location: LatLng, label: Option<String>) -> Self {
        Self { location, label }
    }

    pub fn landmark(name: &str) -> Option<Self> {
        find_landmark(name).map(|l| Self::new(l.coords, Some(l.name.to_string())))
    }
}

/// Everything the customer has entered so far.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub car: Option<Car>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub pickup_time: String,
    pub dropoff_time: String,
    pub needs_driver: bool,
    pub location: LocationPlan,
    pub address: String,
    pub email: String,
    pub contact: String,
    pub user_id: Option<String>,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            car: None,
            start_date: None,
            end_date: None,
            pickup_time: DEFAULT_TIME_SLOT.to_string(),
            dropoff_time: DEFAULT_TIME_SLOT.to_string(),
            needs_driver: false,
            location: LocationPlan::default(),
            address: String::new(),
            email: String::new(),
            contact: String::new(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub booking_id: String,
    /// `/user/payment?bookingId=<id>`
    pub payment_route: String,
}

/// Three-step booking form: car and dates, location, confirmation.
#[derive(Debug, Clone, Default)]
pub struct BookingWizard {
    step: WizardStep,
    draft: BookingDraft,
    total_price: f64,
    submitting: bool,
}

impl BookingWizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill contact details from the signed-in user.
    pub fn for_user(user: &User) -> Self {
        let mut wizard = Self::new();
        wizard.draft.user_id = Some(user.id.clone());
        wizard.draft.email = user.email.clone();
        wizard.draft.contact = user.phone.clone().unwrap_or_default();
        wizard
    }

    pub fn with_hint(mut self, hint: Option<LocationHint>) -> Self {
        if let Some(hint) = hint {
            self.apply_hint(hint);
        }
        self
    }

    pub fn apply_hint(&mut self, hint: LocationHint) {
        let (location, address) = match hint.label.filter(|l| !l.trim().is_empty()) {
            Some(label) => (hint.location, label),
            None => label_point(hint.location, "Location"),
        };
        tracing::debug!(address = %address, "Using preselected location");
        self.draft.location = LocationPlan::Same {
            location: Some(location),
        };
        self.draft.address = address;
    }

    // ============ Accessors ============

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn quote(&self) -> Option<Quote> {
        let car = self.draft.car.as_ref()?;
        Some(Quote::new(
            car.price,
            self.draft.start_date?,
            self.draft.end_date?,
            self.draft.needs_driver,
        ))
    }

    /// Driving directions from the office to the chosen location.
    pub fn directions_url(&self) -> Option<String> {
        match &self.draft.location {
            LocationPlan::Same { location: Some(loc) } if loc.is_set() => Some(directions_url(*loc)),
            _ => None,
        }
    }

    // ============ Step 1: car and dates ============

    pub fn select_car(&mut self, car: Car) {
        tracing::debug!(car_id = %car.id, "Car selected for booking");
        self.draft.car = Some(car);
        self.recalculate();
    }

    pub fn set_dates(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
        if end < start {
            return Err(AppError::validation("Return date must be after pickup date"));
        }
        self.draft.start_date = Some(start);
        self.draft.end_date = Some(end);
        self.recalculate();
        Ok(())
    }

    pub fn set_times(&mut self, pickup: &str, dropoff: &str) -> AppResult<()> {
        validate_time_slot(pickup)?;
        validate_time_slot(dropoff)?;
        self.draft.pickup_time = pickup.to_string();
        self.draft.dropoff_time = dropoff.to_string();
        Ok(())
    }

    pub fn set_needs_driver(&mut self, needs_driver: bool) {
        self.draft.needs_driver = needs_driver;
        self.recalculate();
    }

    pub fn set_contact(&mut self, email: &str, contact: &str) {
        self.draft.email = email.trim().to_string();
        self.draft.contact = contact.trim().to_string();
    }

    fn recalculate(&mut self) {
        self.total_price = self.quote().map(|q| q.total).unwrap_or(0.0);
    }

    // ============ Step 2: location ============

    pub fn use_same_location(&mut self) {
        if let LocationPlan::Different { pickup, .. } = &self.draft.location {
            self.draft.location = LocationPlan::Same { location: *pickup };
        }
    }

    pub fn use_different_locations(&mut self) {
        if let LocationPlan::Same { location } = &self.draft.location {
            self.draft.location = LocationPlan::Different {
                pickup: *location,
                dropoff: *location,
                pickup_address: None,
                dropoff_address: None,
            };
        }
    }

    /// Set the shared pickup/return point. Without a name, a point near a
    /// landmark snaps to it and anything else reads `Location at <lat>, <lng>`.
    pub fn set_location(&mut self, location: LatLng, name: Option<&str>) {
        let (location, address) = named_or_labelled(location, name, "Location");
        self.draft.location = LocationPlan::Same {
            location: Some(location),
        };
        self.draft.address = address;
    }

    pub fn set_pickup(&mut self, location: LatLng, name: Option<&str>) {
        self.use_different_locations();
        let (location, address) = named_or_labelled(location, name, "Pickup");
        if let LocationPlan::Different {
            pickup, pickup_address, ..
        } = &mut self.draft.location
        {
            *pickup = Some(location);
            *pickup_address = Some(address);
        }
    }

    pub fn set_dropoff(&mut self, location: LatLng, name: Option<&str>) {
        self.use_different_locations();
        let (location, address) = named_or_labelled(location, name, "Dropoff");
        if let LocationPlan::Different {
            dropoff,
            dropoff_address,
            ..
        } = &mut self.draft.location
        {
            *dropoff = Some(location);
            *dropoff_address = Some(address);
        }
    }

    pub fn set_address(&mut self, address: &str) {
        self.draft.address = address.to_string();
    }

    // ============ Navigation ============

    pub fn next(&mut self) -> AppResult<WizardStep> {
        self.step = match self.step {
            WizardStep::SelectCarAndDates => {
                if self.draft.car.is_none() {
                    return Err(AppError::validation("Please select a car for booking."));
                }
                if self.draft.start_date.is_none() || self.draft.end_date.is_none() {
                    return Err(AppError::validation("Please select pickup and return dates."));
                }
                WizardStep::ChooseLocation
            }
            WizardStep::ChooseLocation => WizardStep::ConfirmAndPay,
            WizardStep::ConfirmAndPay => {
                return Err(AppError::validation("Already at the final step"));
            }
        };
        Ok(self.step)
    }

    pub fn previous(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::SelectCarAndDates | WizardStep::ChooseLocation => WizardStep::SelectCarAndDates,
            WizardStep::ConfirmAndPay => WizardStep::ChooseLocation,
        };
        self.step
    }

    // ============ Submission ============

    /// Validate the draft and build the `POST /bookings` body.
    pub fn build_request(&self) -> AppResult<CreateBookingRequest> {
        let draft = &self.draft;
        let (car, start, end) = match (&draft.car, draft.start_date, draft.end_date) {
            (Some(car), Some(start), Some(end)) if self.total_price > 0.0 => (car, start, end),
            _ => return Err(AppError::validation("Some required fields are missing")),
        };

        let mut req = CreateBookingRequest {
            car: car.id.clone(),
            user: draft.user_id.clone(),
            start_date: start,
            end_date: end,
            pickup_time: draft.pickup_time.clone(),
            dropoff_time: draft.dropoff_time.clone(),
            needs_driver: draft.needs_driver,
            driver_price: 0.0,
            total_amount: self.total_price,
            address: draft.address.clone(),
            email: draft.email.clone(),
            contact: draft.contact.clone(),
            location: None,
            pickup_coords: None,
            dropoff_coords: None,
            pickup_address: None,
            dropoff_address: None,
        };
        if draft.needs_driver {
            let days = self.quote().map(|q| q.days).unwrap_or(0);
            req.driver_price = DRIVER_DAILY_RATE * days as f64;
        }

        match &draft.location {
            LocationPlan::Same { location } => match location {
                Some(loc) if loc.is_set() => req.location = Some(*loc),
                _ => return Err(AppError::validation("Please select a location")),
            },
            LocationPlan::Different {
                pickup,
                dropoff,
                pickup_address,
                dropoff_address,
            } => match (pickup, dropoff) {
                (Some(p), Some(d)) if p.is_set() && d.is_set() => {
                    req.pickup_coords = Some(*p);
                    req.dropoff_coords = Some(*d);
                    req.pickup_address = pickup_address.clone();
                    req.dropoff_address = dropoff_address.clone();
                }
                _ => {
                    return Err(AppError::validation(
                        "Please select both pickup and dropoff locations",
                    ))
                }
            },
        }

        Ok(req)
    }

    /// Create the booking and move on to payment.
    ///
    /// The wizard is marked busy until the server answers. If the returned
    /// future is dropped mid-request the mark stays, and further calls are
    /// refused until [`BookingWizard::reset_submission`].
    pub async fn submit(&mut self, client: &ApiClient) -> AppResult<SubmitOutcome> {
        if self.submitting {
            return Err(AppError::Conflict(
                "Booking submission already in progress".to_string(),
            ));
        }
        let request = self.build_request()?;

        self.submitting = true;
        let result = client.customer().create_booking(&request).await;
        self.submitting = false;

        let resp = result.map_err(|e| e.or_message("Booking failed"))?;
        if !resp.success {
            return Err(AppError::BadRequest(
                resp.message.unwrap_or_else(|| "Booking failed".to_string()),
            ));
        }
        let booking = resp
            .booking
            .ok_or_else(|| AppError::Decode("booking missing from response".to_string()))?;

        let payment_route = pages::payment(&booking.id);
        tracing::info!(booking_id = %booking.id, total = self.total_price, "Booking created");
        client.navigator().navigate(payment_route.clone());

        Ok(SubmitOutcome {
            booking_id: booking.id,
            payment_route,
        })
    }

    /// Clear a busy mark left by an abandoned submission.
    pub fn reset_submission(&mut self) {
        self.submitting = false;
    }
}

fn named_or_labelled(location: LatLng, name: Option<&str>, prefix: &str) -> (LatLng, String) {
    match name {
        Some(name) => (location, name.to_string()),
        None => label_point(location, prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn car(price: f64) -> Car {
        serde_json::from_value(serde_json::json!({
            "_id": "c1",
            "name": "Hyundai Creta",
            "price": price,
            "status": "available"
        }))
        .unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, 10, 0, 0).unwrap()
    }

    fn ready_wizard() -> BookingWizard {
        let mut wizard = BookingWizard::new();
        wizard.select_car(car(1000.0));
        wizard.set_dates(day(1), day(4)).unwrap();
        wizard
    }

    #[test]
    fn test_step_one_requires_car_and_dates() {
        let mut wizard = BookingWizard::new();
        assert_eq!(
            wizard.next().unwrap_err().to_string(),
            "Please select a car for booking."
        );

        wizard.select_car(car(2000.0));
        assert_eq!(
            wizard.next().unwrap_err().to_string(),
            "Please select pickup and return dates."
        );
        assert_eq!(wizard.step(), WizardStep::SelectCarAndDates);

        wizard.set_dates(day(1), day(2)).unwrap();
        assert_eq!(wizard.next().unwrap(), WizardStep::ChooseLocation);
        assert_eq!(wizard.next().unwrap(), WizardStep::ConfirmAndPay);
        assert!(wizard.next().is_err());
        assert_eq!(wizard.previous(), WizardStep::ChooseLocation);
    }

    #[test]
    fn test_price_follows_inputs() {
        let mut wizard = ready_wizard();
        assert_eq!(wizard.total_price(), 3000.0);

        wizard.set_needs_driver(true);
        assert_eq!(wizard.total_price(), 6000.0);

        wizard.select_car(car(2500.0));
        assert_eq!(wizard.total_price(), 10500.0);
    }

    #[test]
    fn test_same_location_is_required() {
        let wizard = ready_wizard();
        assert_eq!(
            wizard.build_request().unwrap_err().to_string(),
            "Please select a location"
        );
    }

    #[test]
    fn test_different_locations_need_both_points() {
        let mut wizard = ready_wizard();
        wizard.set_pickup(LatLng::new(27.7, 85.33), None);
        wizard.set_dropoff(LatLng::new(0.0, 0.0), None);
        assert_eq!(
            wizard.build_request().unwrap_err().to_string(),
            "Please select both pickup and dropoff locations"
        );

        wizard.set_dropoff(LatLng::new(27.6980, 85.3592), Some("Tribhuvan Airport"));
        let req = wizard.build_request().unwrap();
        assert_eq!(req.pickup_address.as_deref(), Some("Pickup at 27.7000, 85.3300"));
        assert_eq!(req.dropoff_address.as_deref(), Some("Tribhuvan Airport"));
        assert!(req.location.is_none());
    }

    #[test]
    fn test_picks_near_a_landmark_take_its_name() {
        let mut wizard = ready_wizard();
        wizard.set_location(LatLng::new(27.7156, 85.3125), None);
        assert_eq!(wizard.draft().address, "Thamel");
        assert_eq!(
            wizard.draft().location,
            LocationPlan::Same {
                location: Some(LatLng::new(27.7154, 85.3123))
            }
        );

        wizard.set_pickup(LatLng::new(27.6985, 85.3590), None);
        wizard.set_dropoff(LatLng::new(27.7, 85.33), None);
        let req = wizard.build_request().unwrap();
        assert_eq!(req.pickup_address.as_deref(), Some("Tribhuvan Airport"));
        assert_eq!(req.dropoff_address.as_deref(), Some("Dropoff at 27.7000, 85.3300"));
    }

    #[test]
    fn test_missing_fields_checked_first() {
        let mut wizard = BookingWizard::new();
        wizard.set_location(LatLng::new(27.7, 85.3), None);
        assert_eq!(
            wizard.build_request().unwrap_err().to_string(),
            "Some required fields are missing"
        );

        let mut free = BookingWizard::new();
        free.select_car(car(0.0));
        free.set_dates(day(1), day(3)).unwrap();
        free.set_location(LatLng::new(27.7, 85.3), None);
        assert!(free.build_request().is_err());
    }

    #[test]
    fn test_request_body_with_driver() {
        let mut wizard = ready_wizard();
        wizard.set_needs_driver(true);
        wizard.set_location(LatLng::new(27.73001, 85.32999), None);

        let req = wizard.build_request().unwrap();
        assert_eq!(req.total_amount, 6000.0);
        assert_eq!(req.driver_price, 3000.0);
        assert_eq!(req.address, "Location at 27.7300, 85.3300");
        assert_eq!(req.pickup_time, "10:00");
    }

    #[test]
    fn test_hint_is_applied_once() {
        let hint = LocationHint::landmark("Thamel").unwrap();
        let wizard = BookingWizard::new().with_hint(Some(hint));
        assert_eq!(wizard.draft().address, "Thamel");
        assert!(wizard.directions_url().is_some());

        let unnamed = LocationHint::new(LatLng::new(27.7, 85.33), None);
        let wizard = BookingWizard::new().with_hint(Some(unnamed));
        assert_eq!(wizard.draft().address, "Location at 27.7000, 85.3300");
    }

    #[test]
    fn test_time_slots_are_checked() {
        let mut wizard = BookingWizard::new();
        assert!(wizard.set_times("07:30", "10:00").is_err());
        wizard.set_times("08:30", "17:00").unwrap();
        assert_eq!(wizard.draft().dropoff_time, "17:00");
    }

    #[tokio::test]
    async fn test_busy_wizard_refuses_second_submit() {
        let mut wizard = ready_wizard();
        wizard.set_location(LatLng::new(27.7, 85.33), None);
        wizard.submitting = true;

        let client = ApiClient::new(
            crate::config::Config::for_base_url("http://127.0.0.1:9"),
            std::sync::Arc::new(crate::session::store::MemoryTokenStore::new()),
            crate::routes::Navigator::default(),
        )
        .unwrap();
        let err = wizard.submit(&client).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Booking submission already in progress");

        wizard.reset_submission();
        assert!(!wizard.is_submitting());
    }
}
