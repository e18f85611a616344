pub mod api;
pub mod booking;
pub mod client;
pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod payment;
pub mod routes;
pub mod session;
pub mod utils;

use std::sync::Arc;

pub use client::ApiClient;
pub use config::Config;
pub use error::{AppError, AppResult};

use routes::Navigator;
use session::store::{FileTokenStore, MemoryTokenStore, TokenStore};
use session::{AdminSession, UserSession};
use utils::images::ImageResolver;

/// Everything a front end needs, wired from one [`Config`].
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: ApiClient,
    pub user: UserSession,
    pub admin: AdminSession,
    pub images: ImageResolver,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let store: Arc<dyn TokenStore> = match &config.token_store_path {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Self::with_store(config, store, Navigator::default())
    }

    pub fn with_store(config: Config, store: Arc<dyn TokenStore>, navigator: Navigator) -> AppResult<Self> {
        let client = ApiClient::new(config.clone(), store, navigator)?;
        Ok(Self {
            images: ImageResolver::new(config.asset_base_url.clone()),
            user: UserSession::new(client.clone()),
            admin: AdminSession::new(client.clone()),
            client,
            config,
        })
    }
}
