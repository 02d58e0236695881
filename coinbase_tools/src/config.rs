use std::{env, time::Duration};

use ccg_common::Secret;
use log::*;

pub const DEFAULT_API_URL: &str = "https://api.commerce.coinbase.com";
pub const DEFAULT_API_VERSION: &str = "2018-03-22";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct CoinbaseConfig {
    pub api_url: String,
    pub api_version: String,
    pub api_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    /// Upper bound on any single request to the provider.
    pub timeout: Duration,
    pub redirect_url: Option<String>,
    pub cancel_url: Option<String>,
}

impl Default for CoinbaseConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key: Secret::default(),
            webhook_secret: Secret::default(),
            timeout: DEFAULT_TIMEOUT,
            redirect_url: None,
            cancel_url: None,
        }
    }
}

impl CoinbaseConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = env::var("CCG_COINBASE_API_URL").unwrap_or_else(|_| {
            debug!("🪛️ CCG_COINBASE_API_URL not set, using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        let api_version = env::var("CCG_COINBASE_API_VERSION").unwrap_or_else(|_| {
            debug!("🪛️ CCG_COINBASE_API_VERSION not set, using {DEFAULT_API_VERSION}");
            DEFAULT_API_VERSION.to_string()
        });
        let api_key = Secret::new(env::var("CCG_COINBASE_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ CCG_COINBASE_API_KEY not set. Crypto payments will be reported as unavailable.");
            String::default()
        }));
        let webhook_secret = Secret::new(env::var("CCG_COINBASE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ CCG_COINBASE_WEBHOOK_SECRET not set. Every webhook delivery will be rejected.");
            String::default()
        }));
        let timeout = env::var("CCG_COINBASE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for CCG_COINBASE_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let redirect_url = env::var("CCG_COINBASE_REDIRECT_URL").ok();
        let cancel_url = env::var("CCG_COINBASE_CANCEL_URL").ok();
        Self { api_url, api_version, api_key, webhook_secret, timeout, redirect_url, cancel_url }
    }

    pub fn with_api_url<S: Into<String>>(mut self, url: S) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Secret::new(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
