mod common;

use std::time::Duration;

use car_rental_client::api::DriverAssignment;
use car_rental_client::routes::{pages, Guard};
use car_rental_client::session::store::{StoreKey, TokenStore};
use car_rental_client::session::{AdminLoginStep, AdminSession, SessionState};
use common::Harness;

#[tokio::test]
async fn test_third_failed_check_signs_admin_out() {
    let h = Harness::start().await;
    h.sign_in_admin();
    h.navigator.navigate(pages::MANAGE_BOOKINGS);
    h.server.state.fail_check_auth(3, "Invalid admin session");
    let session = AdminSession::new(h.client.clone());

    assert_eq!(session.mount().await.unwrap(), SessionState::Failed(1));
    assert!(session.is_valid().await);
    assert_eq!(session.verify().await.unwrap(), SessionState::Failed(2));
    assert!(session.is_valid().await);
    assert!(h.store.get(StoreKey::AdminToken).unwrap().is_some());

    assert_eq!(session.verify().await.unwrap(), SessionState::LoggedOut);
    assert!(!session.is_valid().await);
    assert_eq!(h.store.get(StoreKey::AdminToken).unwrap(), None);
    assert_eq!(session.guard().await, Guard::Redirect(pages::ADMIN_LOGIN));
    assert!(h.navigator.is_at(pages::ADMIN_LOGIN));
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let h = Harness::start().await;
    h.sign_in_admin();
    h.navigator.navigate(pages::ADMIN_DASHBOARD);
    h.server.state.fail_check_auth(2, "Invalid admin session");
    let session = AdminSession::new(h.client.clone());

    assert_eq!(session.mount().await.unwrap(), SessionState::Failed(1));
    assert_eq!(session.verify().await.unwrap(), SessionState::Failed(2));
    assert_eq!(session.verify().await.unwrap(), SessionState::Verified);
    assert!(session.has_scheduled_check());

    session.unmount();
    tokio::task::yield_now().await;
    assert!(!session.has_scheduled_check());
}

#[tokio::test]
async fn test_login_page_skips_server_check() {
    let h = Harness::start().await;
    h.sign_in_admin();
    h.navigator.navigate(pages::ADMIN_LOGIN);
    let session = AdminSession::new(h.client.clone());

    assert_eq!(session.mount().await.unwrap(), SessionState::OptimisticallyAuthenticated);
    assert_eq!(h.server.state.count("GET", "/admin/check-auth"), 0);
}

#[tokio::test]
async fn test_revalidation_timer_runs_checks() {
    let h = Harness::start().await;
    h.sign_in_admin();
    h.navigator.navigate(pages::ADMIN_DASHBOARD);
    let session = AdminSession::with_revalidate_interval(h.client.clone(), Duration::from_millis(100));

    assert_eq!(session.mount().await.unwrap(), SessionState::Verified);
    tokio::time::sleep(Duration::from_millis(350)).await;
    let checks = h.server.state.count("GET", "/admin/check-auth");
    assert!(checks >= 2, "expected repeated checks, got {}", checks);

    drop(session);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_drop = h.server.state.count("GET", "/admin/check-auth");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.server.state.count("GET", "/admin/check-auth"), after_drop);
}

#[tokio::test]
async fn test_admin_login_with_otp_replaces_user_session() {
    let h = Harness::start().await;
    h.sign_in_user();
    h.server.state.require_admin_otp(true);
    let session = AdminSession::new(h.client.clone());

    let step = session
        .login(mock_api::ADMIN_USERNAME, mock_api::ADMIN_PASSWORD)
        .await
        .unwrap();
    assert!(matches!(step, AdminLoginStep::OtpRequired { .. }));
    assert!(!session.is_valid().await);

    session
        .login_with_otp(mock_api::ADMIN_USERNAME, mock_api::ADMIN_PASSWORD, mock_api::ADMIN_OTP)
        .await
        .unwrap();
    assert_eq!(session.state().await, SessionState::Verified);
    assert!(h.store.get(StoreKey::AdminToken).unwrap().is_some());
    assert_eq!(h.store.get(StoreKey::UserToken).unwrap(), None);
    assert!(h.navigator.is_at(pages::ADMIN_DASHBOARD));

    session.logout().await.unwrap();
    assert_eq!(h.store.get(StoreKey::AdminToken).unwrap(), None);
    assert!(h.navigator.is_at(pages::ADMIN_LOGIN));
}

#[tokio::test]
async fn test_assignment_needs_a_selected_booking() {
    let h = Harness::start().await;
    h.sign_in_admin();
    h.navigator.navigate(pages::MANAGE_DRIVERS);
    let drivers = h.client.drivers();

    let candidates = drivers.bookings_awaiting_driver().await.unwrap();
    let ids: Vec<&str> = candidates.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b-driver"]);

    let mut assignment = DriverAssignment::new("d1", candidates);
    let err = assignment.submit(&drivers).await.unwrap_err();
    assert_eq!(err.to_string(), "Please select a booking");
    assert_eq!(h.server.state.count("POST", "/admin/drivers/assign"), 0);

    assignment.select("b-driver").unwrap();
    assignment.submit(&drivers).await.unwrap();
    let sent = h.server.state.requests_to("POST", "/admin/drivers/assign");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body["bookingId"], "b-driver");
    assert_eq!(sent[0].body["driverId"], "d1");

    assert!(drivers.bookings_awaiting_driver().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_during_check_stays_logged_out() {
    let h = Harness::start().await;
    h.sign_in_admin();
    h.navigator.navigate(pages::ADMIN_DASHBOARD);
    h.server.state.delay_check_auth(Duration::from_millis(200));
    let session = AdminSession::new(h.client.clone());

    let checking = session.clone();
    let in_flight = tokio::spawn(async move { checking.verify().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.logout().await.unwrap();

    assert_eq!(in_flight.await.unwrap().unwrap(), SessionState::LoggedOut);
    assert_eq!(session.state().await, SessionState::LoggedOut);
    assert!(!session.has_scheduled_check());
    assert_eq!(h.store.get(StoreKey::AdminToken).unwrap(), None);
}
