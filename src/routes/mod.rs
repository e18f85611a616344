use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Client-side page routes.
pub mod pages {
    pub const HOME: &str = "/";
    pub const SIGN_IN: &str = "/auth/signin";
    pub const SIGN_UP: &str = "/auth/signup";
    pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
    pub const CARS: &str = "/cars";
    pub const USER_DASHBOARD: &str = "/user/dashboard";
    pub const MY_BOOKINGS: &str = "/user/mybooking";
    pub const PAYMENT: &str = "/user/payment";
    pub const PAYMENT_CONFIRMATION: &str = "/user/payment-confirmation";
    pub const WISHLIST: &str = "/user/wishlist";
    pub const PROFILE: &str = "/user/profile";
    pub const ADMIN: &str = "/admin";
    pub const ADMIN_LOGIN: &str = "/admin/login";
    pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
    pub const MANAGE_BOOKINGS: &str = "/admin/manage-bookings";
    pub const MANAGE_DRIVERS: &str = "/admin/manage-drivers";

    pub fn car(id: &str) -> String {
        format!("/car/{}", id)
    }

    pub fn book_car(car_id: &str) -> String {
        format!("/user/bookings/{}", car_id)
    }

    pub fn payment(booking_id: &str) -> String {
        format!("{}?bookingId={}", PAYMENT, booking_id)
    }

    pub fn review(car_id: &str) -> String {
        format!("/user/review/{}", car_id)
    }
}

/// REST paths, relative to the API base URL.
pub mod endpoints {
    pub const USER_LOGIN: &str = "/users/login";
    pub const USER_REGISTER: &str = "/users/register";
    pub const FORGOT_PASSWORD: &str = "/users/forgot-password";
    pub const RESET_PASSWORD: &str = "/users/reset-password";
    pub const PROFILE: &str = "/users/profile";
    pub const USERS: &str = "/users";

    pub const ADMIN_LOGIN: &str = "/admin/login";
    pub const ADMIN_REQUEST_OTP: &str = "/admin/request-otp";
    pub const ADMIN_CREATE: &str = "/admin/create";
    pub const ADMIN_CHECK_AUTH: &str = "/admin/check-auth";
    pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
    pub const ADMIN_BOOKINGS: &str = "/admin/bookings";
    pub const ADMIN_DRIVERS: &str = "/admin/drivers";
    pub const AVAILABLE_DRIVERS: &str = "/admin/available-drivers";
    pub const ASSIGN_DRIVER: &str = "/admin/drivers/assign";
    pub const COMPLETE_ASSIGNMENT: &str = "/admin/drivers/complete-assignment";

    pub const CARS: &str = "/cars";
    pub const BOOKINGS: &str = "/bookings";
    pub const USER_BOOKINGS: &str = "/bookings/user";
    pub const REVIEWS: &str = "/reviews";
    pub const REVIEW_SEARCH: &str = "/reviews/search";
    pub const CLIENT_REVIEWS: &str = "/client-reviews";
    pub const PUBLIC_CLIENT_REVIEWS: &str = "/client-reviews/public";
    pub const MESSAGES: &str = "/messages";
    pub const WISHLIST: &str = "/wishlist";

    pub const KHALTI_INITIATE: &str = "/payment/khalti/initiate";
    pub const KHALTI_VERIFY: &str = "/payment/khalti/verify";
    pub const KHALTI_LOOKUP: &str = "/payment/khalti/lookup";

    pub fn car(id: &str) -> String {
        format!("{}/{}", CARS, id)
    }

    pub fn car_status(id: &str) -> String {
        format!("{}/{}/status", CARS, id)
    }

    pub fn booking(id: &str) -> String {
        format!("{}/{}", BOOKINGS, id)
    }

    pub fn booking_status(id: &str) -> String {
        format!("{}/{}/status", BOOKINGS, id)
    }

    pub fn cancel_booking(id: &str) -> String {
        format!("{}/{}/cancel", BOOKINGS, id)
    }

    pub fn driver(id: &str) -> String {
        format!("{}/{}", ADMIN_DRIVERS, id)
    }

    pub fn car_reviews(car_id: &str) -> String {
        format!("{}/car/{}", REVIEWS, car_id)
    }

    pub fn can_review(car_id: &str) -> String {
        format!("{}/car/{}/can-review", REVIEWS, car_id)
    }

    pub fn submit_car_review(car_id: &str) -> String {
        format!("{}/car/{}/reviews", REVIEWS, car_id)
    }

    pub fn driver_review(driver_id: &str) -> String {
        format!("{}/driver/{}", REVIEWS, driver_id)
    }

    pub fn review(id: &str) -> String {
        format!("{}/{}", REVIEWS, id)
    }

    pub fn client_review(id: &str) -> String {
        format!("{}/{}", CLIENT_REVIEWS, id)
    }

    pub fn toggle_client_review(id: &str) -> String {
        format!("{}/{}/toggle", CLIENT_REVIEWS, id)
    }

    pub fn message(id: &str) -> String {
        format!("{}/{}", MESSAGES, id)
    }

    pub fn message_status(id: &str) -> String {
        format!("{}/{}/status", MESSAGES, id)
    }

    pub fn wishlist_item(car_id: &str) -> String {
        format!("{}/{}", WISHLIST, car_id)
    }

    pub fn user(id: &str) -> String {
        format!("{}/{}", USERS, id)
    }

    pub fn toggle_block(id: &str) -> String {
        format!("{}/{}/toggle-block", USERS, id)
    }

    pub fn is_check_auth(path: &str) -> bool {
        path.contains("check-auth")
    }
}

fn strip_query(route: &str) -> &str {
    route.split(['?', '#']).next().unwrap_or(route)
}

/// Tracks the current page and any redirect scheduled by the auth layer.
///
/// Cloning shares state. A newly scheduled redirect aborts the previous one;
/// a plain `navigate` leaves it pending.
#[derive(Clone)]
pub struct Navigator {
    current: Arc<watch::Sender<String>>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Navigator {
    pub fn new(initial: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(initial.into());
        Self {
            current: Arc::new(tx),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    pub fn navigate(&self, route: impl Into<String>) {
        let route = route.into();
        tracing::debug!(route = %route, "navigate");
        self.current.send_replace(route);
    }

    /// Same page, ignoring query string and fragment.
    pub fn is_at(&self, route: &str) -> bool {
        strip_query(&self.current.borrow()) == strip_query(route)
    }

    pub fn is_under(&self, prefix: &str) -> bool {
        let current = self.current.borrow();
        let path = strip_query(&current);
        path == prefix || path.starts_with(&format!("{}/", prefix.trim_end_matches('/')))
    }

    /// Redirect to `route` after `delay` unless already there.
    /// Returns false when nothing was scheduled.
    pub fn schedule_redirect(&self, route: &str, delay: Duration) -> bool {
        if self.is_at(route) {
            return false;
        }

        let target = route.to_string();
        let current = Arc::clone(&self.current);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let already_there = strip_query(&current.borrow()) == strip_query(&target);
            if !already_there {
                tracing::info!(route = %target, "redirecting");
                current.send_replace(target);
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(handle) {
                previous.abort();
            }
        }
        true
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.pending
            .lock()
            .map(|p| p.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    pub fn cancel_pending_redirect(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(pages::HOME)
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .finish()
    }
}

/// Outcome of a route guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Allow,
    Redirect(&'static str),
}

/// Customer pages need a user token.
pub fn require_user(has_user_token: bool) -> Guard {
    if has_user_token {
        Guard::Allow
    } else {
        Guard::Redirect(pages::SIGN_IN)
    }
}

/// Back-office pages need an authenticated admin session.
pub fn require_admin(admin_authenticated: bool) -> Guard {
    if admin_authenticated {
        Guard::Allow
    } else {
        Guard::Redirect(pages::ADMIN_LOGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_matching_ignores_query() {
        let nav = Navigator::new("/user/payment?bookingId=b1");
        assert!(nav.is_at(pages::PAYMENT));
        assert!(nav.is_under("/user"));
        assert!(!nav.is_under("/us"));
        assert_eq!(pages::payment("b9"), "/user/payment?bookingId=b9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_fires_after_delay() {
        let nav = Navigator::new("/admin/dashboard");
        assert!(nav.schedule_redirect(pages::ADMIN_LOGIN, Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(nav.current(), "/admin/dashboard");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(nav.current(), pages::ADMIN_LOGIN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_skipped_when_already_there() {
        let nav = Navigator::new(pages::SIGN_IN);
        assert!(!nav.schedule_redirect(pages::SIGN_IN, Duration::from_secs(1)));
        assert!(!nav.has_pending_redirect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_redirect_supersedes_older() {
        let nav = Navigator::new("/user/mybooking");
        nav.schedule_redirect(pages::SIGN_IN, Duration::from_secs(1));
        nav.schedule_redirect(pages::HOME, Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(nav.current(), "/user/mybooking");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(nav.current(), pages::HOME);
    }

    #[test]
    fn test_guards() {
        assert_eq!(require_user(false), Guard::Redirect(pages::SIGN_IN));
        assert_eq!(require_admin(true), Guard::Allow);
    }
}
