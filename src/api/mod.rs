pub mod admin;
pub mod auth;
pub mod customer;
pub mod drivers;
pub mod payment;

use crate::client::ApiClient;

pub use admin::AdminApi;
pub use auth::AuthApi;
pub use customer::CustomerApi;
pub use drivers::{DriverAssignment, DriversApi};
pub use payment::PaymentApi;

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn customer(&self) -> CustomerApi<'_> {
        CustomerApi::new(self)
    }

    pub fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(self)
    }

    pub fn drivers(&self) -> DriversApi<'_> {
        DriversApi::new(self)
    }

    pub fn payments(&self) -> PaymentApi<'_> {
        PaymentApi::new(self)
    }
}
