#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use car_rental_client::routes::Navigator;
use car_rental_client::session::store::{MemoryTokenStore, StoreKey, TokenStore};
use car_rental_client::{ApiClient, Config};
use mock_api::MockServer;

pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Navigator,
    pub client: ApiClient,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await.unwrap();
        let store = Arc::new(MemoryTokenStore::new());
        let navigator = Navigator::default();

        let mut config = Config::for_base_url(server.base_url());
        config.app_origin = "http://rental.test".to_string();
        let client = ApiClient::new(config, store.clone(), navigator.clone())
            .unwrap()
            .with_redirect_delay(Duration::from_millis(50));

        Self {
            server,
            store,
            navigator,
            client,
        }
    }

    pub fn sign_in_user(&self) -> String {
        let token = self.server.state.user_token("u1");
        self.store.set(StoreKey::UserToken, &token).unwrap();
        token
    }

    pub fn sign_in_admin(&self) -> String {
        let token = self.server.state.admin_token();
        self.store.set(StoreKey::AdminToken, &token).unwrap();
        token
    }

    pub fn bearer(token: &str) -> Option<String> {
        Some(format!("Bearer {}", token))
    }
}
