use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::Instant;

use crate::client::ApiClient;
use crate::entities::booking::{Booking, BookingStatusUpdate, PaymentMethod};
use crate::entities::payment::KhaltiInitiateRequest;
use crate::error::{AppError, AppResult};
use crate::routes::pages;
use crate::session::store::StoreKey;

/// How long a failed gateway attempt stays on screen before the form
/// switches back to cash on delivery.
pub const COD_FALLBACK_DELAY: Duration = Duration::from_millis(1500);

pub const MISSING_TOKEN: &str = "Authentication token not found. Please log in again.";
pub const AUTH_FAILED: &str = "Authentication failed. Please log in again.";
pub const GATEWAY_ERROR: &str = "Payment gateway error. Please try again or choose a different payment method.";
pub const GATEWAY_CONFIG_ERROR: &str = "Payment gateway configuration error. Please contact support.";
pub const GATEWAY_UNREACHABLE: &str =
    "Unable to connect to payment gateway. Please try again or use cash on delivery.";
pub const INVALID_GATEWAY_RESPONSE: &str = "Payment gateway returned an invalid response";
pub const INITIATE_FAILED: &str = "Failed to initiate payment. Please try again or use cash on delivery.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Cash on delivery recorded; the user was sent to their bookings.
    Completed,
    /// Continue at the gateway's hosted payment page.
    Redirect(String),
}

/// The payment page for one booking.
#[derive(Debug, Clone)]
pub struct Checkout {
    booking: Booking,
    method: PaymentMethod,
    gateway_error: Option<String>,
    failed_at: Option<Instant>,
    loading: bool,
}

impl Checkout {
    pub fn new(booking: Booking) -> Self {
        Self {
            booking,
            method: PaymentMethod::Cod,
            gateway_error: None,
            failed_at: None,
            loading: false,
        }
    }

    pub async fn load(client: &ApiClient, booking_id: &str) -> AppResult<Self> {
        let booking = client
            .customer()
            .get_booking(booking_id)
            .await
            .map_err(|e| e.or_message("Failed to fetch booking details."))?;
        Ok(Self::new(booking))
    }

    pub fn booking(&self) -> &Booking {
        &self.booking
    }

    pub fn gateway_error(&self) -> Option<&str> {
        self.gateway_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The method currently selected. A failed gateway attempt reverts
    /// to cash on delivery once [`COD_FALLBACK_DELAY`] has passed.
    pub fn method(&self) -> PaymentMethod {
        match self.failed_at {
            Some(at) if at.elapsed() >= COD_FALLBACK_DELAY => PaymentMethod::Cod,
            _ => self.method,
        }
    }

    /// Khalti stays disabled while its last error is shown. Picking cash
    /// on delivery clears it.
    pub fn select(&mut self, method: PaymentMethod) -> AppResult<()> {
        if method == PaymentMethod::Khalti && self.gateway_error.is_some() {
            return Err(AppError::validation("Khalti is unavailable for this booking right now"));
        }
        self.method = method;
        self.gateway_error = None;
        self.failed_at = None;
        Ok(())
    }

    pub async fn pay(&mut self, client: &ApiClient) -> AppResult<CheckoutOutcome> {
        self.loading = true;
        let outcome = match self.method() {
            PaymentMethod::Cod => self.pay_on_delivery(client).await,
            PaymentMethod::Khalti => self.pay_with_khalti(client).await,
        };
        self.loading = false;
        outcome
    }

    async fn pay_on_delivery(&mut self, client: &ApiClient) -> AppResult<CheckoutOutcome> {
        client
            .payments()
            .update_booking_payment(&self.booking.id, &BookingStatusUpdate::cash_on_delivery())
            .await
            .map_err(|e| e.or_message("Failed to process your booking."))?;

        tracing::info!(booking_id = %self.booking.id, "Cash on delivery selected");
        self.method = PaymentMethod::Cod;
        client.navigator().navigate(pages::MY_BOOKINGS);
        Ok(CheckoutOutcome::Completed)
    }

    async fn pay_with_khalti(&mut self, client: &ApiClient) -> AppResult<CheckoutOutcome> {
        self.gateway_error = None;
        self.failed_at = None;

        let Some(token) = client.store().get(StoreKey::UserToken)? else {
            return Err(AppError::Unauthorized(MISSING_TOKEN.to_string()));
        };

        let config = client.config();
        let req = KhaltiInitiateRequest {
            booking_id: self.booking.id.clone(),
            amount: self.booking.total_amount,
            return_url: format!("{}{}", config.app_origin.trim_end_matches('/'), pages::MY_BOOKINGS),
        };

        match client
            .payments()
            .initiate_khalti(&req, &token, config.payment_timeout())
            .await
        {
            Ok(resp) => match resp.payment_url() {
                Some(url) => {
                    tracing::info!(booking_id = %self.booking.id, "Redirecting to Khalti");
                    Ok(CheckoutOutcome::Redirect(url.to_string()))
                }
                None => {
                    tracing::warn!(booking_id = %self.booking.id, "Khalti initiation returned no payment url");
                    self.gateway_error = Some(INVALID_GATEWAY_RESPONSE.to_string());
                    Err(AppError::BadRequest(INITIATE_FAILED.to_string()))
                }
            },
            Err(err) => {
                let (message, err) = gateway_failure(err);
                tracing::warn!(booking_id = %self.booking.id, error = %message, "Khalti initiation failed");
                self.gateway_error = Some(message);
                self.failed_at = Some(Instant::now());
                Err(err)
            }
        }
    }
}

/// Message to show for a failed initiation, and the error to return.
fn gateway_failure(err: AppError) -> (String, AppError) {
    let err = match err.status() {
        Some(StatusCode::UNAUTHORIZED) => AppError::Unauthorized(AUTH_FAILED.to_string()),
        Some(StatusCode::INTERNAL_SERVER_ERROR) => {
            AppError::Server(StatusCode::INTERNAL_SERVER_ERROR, GATEWAY_ERROR.to_string())
        }
        Some(StatusCode::BAD_GATEWAY) => AppError::Server(StatusCode::BAD_GATEWAY, GATEWAY_CONFIG_ERROR.to_string()),
        Some(_) => err.or_message(GATEWAY_UNREACHABLE),
        None => return (GATEWAY_UNREACHABLE.to_string(), err),
    };
    (err.user_message(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::generic_failure;

    fn booking() -> Booking {
        serde_json::from_value(serde_json::json!({
            "_id": "b1",
            "startDate": "2026-03-01T00:00:00Z",
            "endDate": "2026-03-04T00:00:00Z",
            "status": "pending",
            "totalAmount": 6000
        }))
        .unwrap()
    }

    #[test]
    fn test_gateway_status_messages() {
        let (msg, err) = gateway_failure(AppError::Unauthorized("jwt expired".to_string()));
        assert_eq!(msg, AUTH_FAILED);
        assert!(matches!(err, AppError::Unauthorized(_)));

        let (msg, _) = gateway_failure(AppError::Server(StatusCode::BAD_GATEWAY, "bad key".to_string()));
        assert_eq!(msg, GATEWAY_CONFIG_ERROR);

        let (msg, _) = gateway_failure(AppError::Server(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()));
        assert_eq!(msg, GATEWAY_ERROR);

        let (msg, _) = gateway_failure(AppError::BadRequest("Amount must be at least Rs. 10".to_string()));
        assert_eq!(msg, "Amount must be at least Rs. 10");

        let (msg, _) = gateway_failure(AppError::BadRequest(generic_failure(StatusCode::BAD_REQUEST)));
        assert_eq!(msg, GATEWAY_UNREACHABLE);

        let (msg, err) = gateway_failure(AppError::Timeout);
        assert_eq!(msg, GATEWAY_UNREACHABLE);
        assert!(matches!(err, AppError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_khalti_falls_back_to_cod() {
        let mut checkout = Checkout::new(booking());
        checkout.select(PaymentMethod::Khalti).unwrap();
        checkout.gateway_error = Some(GATEWAY_ERROR.to_string());
        checkout.failed_at = Some(Instant::now());

        assert_eq!(checkout.method(), PaymentMethod::Khalti);
        assert!(checkout.select(PaymentMethod::Khalti).is_err());

        tokio::time::advance(COD_FALLBACK_DELAY).await;
        assert_eq!(checkout.method(), PaymentMethod::Cod);
        assert_eq!(checkout.gateway_error(), Some(GATEWAY_ERROR));
    }

    #[test]
    fn test_choosing_cod_clears_gateway_error() {
        let mut checkout = Checkout::new(booking());
        checkout.gateway_error = Some(INVALID_GATEWAY_RESPONSE.to_string());
        checkout.select(PaymentMethod::Cod).unwrap();
        assert_eq!(checkout.gateway_error(), None);
        checkout.select(PaymentMethod::Khalti).unwrap();
        assert_eq!(checkout.method(), PaymentMethod::Khalti);
    }
}
