mod common;

use car_rental_client::routes::{pages, Guard};
use car_rental_client::session::store::{StoreKey, TokenStore};
use car_rental_client::session::user::BLOCKED_MESSAGE;
use car_rental_client::session::UserSession;
use car_rental_client::AppError;
use common::Harness;

#[tokio::test]
async fn test_login_returns_to_requested_page() {
    let h = Harness::start().await;
    let session = UserSession::new(h.client.clone());

    let guard = session.guard(&pages::book_car("c1")).unwrap();
    assert_eq!(guard, Guard::Redirect(pages::SIGN_IN));
    assert!(h.navigator.is_at(pages::SIGN_IN));

    let user = session.login("asha@example.com", mock_api::USER_PASSWORD).await.unwrap();
    assert_eq!(user.id, "u1");
    assert!(h.navigator.is_at(&pages::book_car("c1")));
    assert_eq!(h.store.get(StoreKey::ReturnUrl).unwrap(), None);
    assert_eq!(session.current_user().unwrap().map(|u| u.email), Some("asha@example.com".to_string()));
    assert_eq!(
        session.current_token().unwrap().and_then(|t| t.principal_id),
        Some("u1".to_string())
    );
}

#[tokio::test]
async fn test_blocked_account_is_refused() {
    let h = Harness::start().await;
    let session = UserSession::new(h.client.clone());

    let err = session
        .login("blocked@example.com", mock_api::USER_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.to_string(), BLOCKED_MESSAGE);
    assert_eq!(h.store.get(StoreKey::UserToken).unwrap(), None);
}

#[tokio::test]
async fn test_wrong_password_keeps_server_message() {
    let h = Harness::start().await;
    let session = UserSession::new(h.client.clone());

    let err = session.login("asha@example.com", "nope").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(!session.is_valid());
}

#[tokio::test]
async fn test_logout_clears_token_and_profile() {
    let h = Harness::start().await;
    let session = UserSession::new(h.client.clone());
    session.login("asha@example.com", mock_api::USER_PASSWORD).await.unwrap();

    session.logout().unwrap();
    assert_eq!(h.store.get(StoreKey::UserToken).unwrap(), None);
    assert_eq!(h.store.get(StoreKey::User).unwrap(), None);
    assert_eq!(session.guard(pages::MY_BOOKINGS).unwrap(), Guard::Redirect(pages::SIGN_IN));
}
