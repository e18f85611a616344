use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub asset_base_url: String,
    /// Origin used to build the payment gateway return URL.
    pub app_origin: String,
    pub token_store_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub payment_timeout_secs: u64,
    pub session_revalidate_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000/api".to_string(),
            asset_base_url: "http://localhost:4000".to_string(),
            app_origin: "http://localhost:5173".to_string(),
            token_store_path: None,
            request_timeout_secs: 30,
            payment_timeout_secs: 15,
            session_revalidate_minutes: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let api_base_url = env::var("API_BASE_URL").unwrap_or(defaults.api_base_url);

        Ok(Self {
            asset_base_url: env::var("ASSET_BASE_URL")
                .unwrap_or_else(|_| asset_origin(&api_base_url)),
            api_base_url,
            app_origin: env::var("APP_ORIGIN").unwrap_or(defaults.app_origin),
            token_store_path: env::var("TOKEN_STORE_PATH").ok().map(PathBuf::from),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            payment_timeout_secs: parse_var("PAYMENT_TIMEOUT_SECS", defaults.payment_timeout_secs)?,
            session_revalidate_minutes: parse_var(
                "SESSION_REVALIDATE_MINUTES",
                defaults.session_revalidate_minutes,
            )?,
        })
    }

    /// Config pointing at an API base URL, everything else defaulted.
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into();
        Self {
            asset_base_url: asset_origin(&api_base_url),
            api_base_url,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    pub fn revalidate_interval(&self) -> Duration {
        Duration::from_secs(self.session_revalidate_minutes * 60)
    }
}

fn parse_var(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}

/// Strip a trailing `/api` segment so uploads resolve against the server root.
fn asset_origin(api_base_url: &str) -> String {
    let trimmed = api_base_url.trim_end_matches('/');
    trimmed
        .strip_suffix("/api")
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_origin_strips_api_segment() {
        assert_eq!(
            asset_origin("https://car-rental-backend.example.com/api"),
            "https://car-rental-backend.example.com"
        );
        assert_eq!(asset_origin("http://localhost:4000/api/"), "http://localhost:4000");
        assert_eq!(asset_origin("http://localhost:4000"), "http://localhost:4000");
    }

    #[test]
    fn test_for_base_url_defaults() {
        let config = Config::for_base_url("http://127.0.0.1:9000/api");
        assert_eq!(config.asset_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.revalidate_interval(), Duration::from_secs(15 * 60));
        assert_eq!(config.payment_timeout(), Duration::from_secs(15));
    }
}
