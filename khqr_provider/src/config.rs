use std::time::Duration;

use kpg_common::Secret;
use log::*;

pub const DEFAULT_CHECK_PATH: &str = "/v1/check_transaction_by_hash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Scheme and host of the verification API, without a trailing slash.
    pub base_url: String,
    pub token: Secret<String>,
    pub check_path: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new<S: Into<String>>(base_url: S, token: S) -> Self {
        Self {
            base_url: base_url.into(),
            token: Secret::new(token.into()),
            check_path: DEFAULT_CHECK_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_check_path<S: Into<String>>(mut self, path: S) -> Self {
        self.check_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("KPG_PROVIDER_URL").unwrap_or_else(|_| {
            warn!("KPG_PROVIDER_URL not set, using (probably useless) default");
            "http://localhost:9000".to_string()
        });
        let token = Secret::new(std::env::var("KPG_PROVIDER_TOKEN").unwrap_or_else(|_| {
            warn!("KPG_PROVIDER_TOKEN not set. Requests to the verification API will probably be rejected");
            String::default()
        }));
        let check_path = std::env::var("KPG_PROVIDER_CHECK_PATH").unwrap_or_else(|_| {
            info!("KPG_PROVIDER_CHECK_PATH not set, using {DEFAULT_CHECK_PATH}");
            DEFAULT_CHECK_PATH.to_string()
        });
        let timeout = std::env::var("KPG_PROVIDER_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for KPG_PROVIDER_TIMEOUT: {s}. {e}"))
                    .ok()
            })
            .unwrap_or_else(|| {
                info!("KPG_PROVIDER_TIMEOUT not set, using {DEFAULT_TIMEOUT_SECS}s");
                DEFAULT_TIMEOUT_SECS
            });
        Self { base_url: base_url.trim_end_matches('/').to_string(), token, check_path, timeout: Duration::from_secs(timeout) }
    }

    pub fn check_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.check_path)
    }
}
