mod common;

use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::json;

use car_rental_client::booking::{BookingWizard, LocationHint};
use car_rental_client::entities::booking::PaymentMethod;
use car_rental_client::payment::checkout::{AUTH_FAILED, GATEWAY_CONFIG_ERROR};
use car_rental_client::payment::{Checkout, CheckoutOutcome, Confirmation, VerificationStatus};
use car_rental_client::routes::pages;
use car_rental_client::session::store::{StoreKey, TokenStore};
use car_rental_client::session::UserSession;
use car_rental_client::utils::geo::LatLng;
use car_rental_client::AppError;
use common::Harness;

async fn signed_in_wizard(h: &Harness) -> BookingWizard {
    let session = UserSession::new(h.client.clone());
    let user = session.login("asha@example.com", mock_api::USER_PASSWORD).await.unwrap();
    let car = h.client.customer().get_car("c1").await.unwrap();

    let mut wizard = BookingWizard::for_user(&user);
    wizard.select_car(car);
    wizard
        .set_dates(
            Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap(),
        )
        .unwrap();
    wizard
}

#[tokio::test]
async fn test_submit_creates_booking_and_opens_payment() {
    let h = Harness::start().await;
    let mut wizard = signed_in_wizard(&h)
        .await
        .with_hint(LocationHint::landmark("Thamel"));
    wizard.set_needs_driver(true);
    wizard.next().unwrap();
    wizard.next().unwrap();

    let outcome = wizard.submit(&h.client).await.unwrap();
    assert_eq!(outcome.payment_route, pages::payment(&outcome.booking_id));
    assert_eq!(h.navigator.current(), outcome.payment_route);
    assert!(!wizard.is_submitting());

    let sent = h.server.state.requests_to("POST", "/bookings");
    let body = &sent[0].body;
    assert_eq!(body["totalAmount"], json!(6000.0));
    assert_eq!(body["driverPrice"], json!(3000.0));
    assert_eq!(body["user"], "u1");
    assert_eq!(body["email"], "asha@example.com");
    assert_eq!(body["contact"], "9800000001");
    assert_eq!(body["address"], "Thamel");
    assert_eq!(body["location"]["lat"], json!(27.7154));
}

#[tokio::test]
async fn test_rejected_booking_surfaces_server_message() {
    let h = Harness::start().await;
    let mut wizard = signed_in_wizard(&h).await;
    let unavailable = h.client.customer().get_car("c2").await.unwrap();
    wizard.select_car(unavailable);
    wizard.set_location(LatLng::new(27.7, 85.33), None);

    let err = wizard.submit(&h.client).await.unwrap_err();
    assert_eq!(err.to_string(), "Car is not available for booking");
    assert!(!wizard.is_submitting());
    assert!(h.navigator.is_at(pages::USER_DASHBOARD));
}

#[tokio::test]
async fn test_invalid_location_sends_nothing() {
    let h = Harness::start().await;
    let mut wizard = signed_in_wizard(&h).await;

    let err = wizard.submit(&h.client).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(h.server.state.count("POST", "/bookings"), 0);
}

#[tokio::test]
async fn test_cash_on_delivery_skips_gateway() {
    let h = Harness::start().await;
    h.sign_in_user();

    let mut checkout = Checkout::load(&h.client, "b-self").await.unwrap();
    assert_eq!(checkout.method(), PaymentMethod::Cod);
    let outcome = checkout.pay(&h.client).await.unwrap();

    assert_eq!(outcome, CheckoutOutcome::Completed);
    assert!(h.navigator.is_at(pages::MY_BOOKINGS));

    let sent = h.server.state.requests_to("PUT", "/bookings/b-self/status");
    assert_eq!(
        sent[0].body,
        json!({ "status": "pending", "paymentMethod": "cod", "paymentStatus": "pending" })
    );
    let gateway_calls = h
        .server
        .state
        .requests()
        .into_iter()
        .filter(|r| r.path.starts_with("/payment/"))
        .count();
    assert_eq!(gateway_calls, 0);
}

#[tokio::test]
async fn test_khalti_redirects_with_explicit_user_token() {
    let h = Harness::start().await;
    let token = h.sign_in_user();
    h.sign_in_admin();
    h.navigator.navigate(pages::ADMIN_DASHBOARD);

    let mut checkout = Checkout::load(&h.client, "b-self").await.unwrap();
    checkout.select(PaymentMethod::Khalti).unwrap();
    let outcome = checkout.pay(&h.client).await.unwrap();

    assert_eq!(
        outcome,
        CheckoutOutcome::Redirect("https://test-pay.khalti.com/?pidx=pidx-b-self".to_string())
    );
    let sent = h.server.state.requests_to("POST", "/payment/khalti/initiate");
    assert_eq!(sent[0].authorization, Harness::bearer(&token));
    assert_eq!(
        sent[0].body,
        json!({ "bookingId": "b-self", "amount": 1000.0, "returnUrl": "http://rental.test/user/mybooking" })
    );
}

#[tokio::test]
async fn test_khalti_gateway_errors_are_translated() {
    let h = Harness::start().await;
    h.sign_in_user();
    h.server.state.fail_khalti_initiate(Some(StatusCode::BAD_GATEWAY));

    let mut checkout = Checkout::load(&h.client, "b-self").await.unwrap();
    checkout.select(PaymentMethod::Khalti).unwrap();
    let err = checkout.pay(&h.client).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    assert_eq!(err.user_message(), GATEWAY_CONFIG_ERROR);
    assert_eq!(checkout.gateway_error(), Some(GATEWAY_CONFIG_ERROR));
    assert!(checkout.select(PaymentMethod::Khalti).is_err());
}

#[tokio::test]
async fn test_khalti_without_user_token_is_not_sent() {
    let h = Harness::start().await;
    h.sign_in_user();
    let mut checkout = Checkout::load(&h.client, "b-self").await.unwrap();
    h.client.store().remove(StoreKey::UserToken).unwrap();

    checkout.select(PaymentMethod::Khalti).unwrap();
    let err = checkout.pay(&h.client).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_ne!(err.to_string(), AUTH_FAILED);
    assert_eq!(h.server.state.count("POST", "/payment/khalti/initiate"), 0);
}

#[tokio::test]
async fn test_pending_lookup_is_not_repeated() {
    let h = Harness::start().await;
    h.sign_in_user();

    let confirmation =
        Confirmation::from_return_url("/user/mybooking?pidx=pidx-b-self&status=Pending&purchase_order_id=b-self")
            .unwrap();
    let result = confirmation.lookup(&h.client).await;

    assert_eq!(result.status, VerificationStatus::Pending);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let lookups = h.server.state.requests_to("POST", "/payment/khalti/lookup");
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].body, json!({ "pidx": "pidx-b-self" }));
}

#[tokio::test]
async fn test_completed_lookup_and_missing_pidx() {
    let h = Harness::start().await;
    h.sign_in_user();
    let booking = h.server.state.booking("b-driver").unwrap();
    h.server.state.set_khalti_lookup(
        StatusCode::OK,
        json!({ "success": true, "booking": booking, "data": { "status": "Completed" } }),
    );

    let confirmation = Confirmation::from_return_url("/user/mybooking?pidx=abc").unwrap();
    assert_eq!(confirmation.lookup(&h.client).await.status, VerificationStatus::Success);

    let no_pidx = Confirmation::from_return_url("/user/mybooking?status=Completed").unwrap();
    assert_eq!(no_pidx.lookup(&h.client).await.status, VerificationStatus::Failed);
    assert_eq!(h.server.state.count("POST", "/payment/khalti/lookup"), 1);
}

#[tokio::test]
async fn test_accepted_status_means_pending() {
    let h = Harness::start().await;
    h.sign_in_user();
    h.server.state.set_khalti_lookup(
        StatusCode::ACCEPTED,
        json!({ "success": false, "message": "Payment is being processed" }),
    );

    let confirmation = Confirmation::from_return_url("/user/mybooking?pidx=abc").unwrap();
    let result = confirmation.lookup(&h.client).await;
    assert_eq!(result.status, VerificationStatus::Pending);
    assert_eq!(result.message.as_deref(), Some("Payment is being processed"));
}
