use std::{env, net::IpAddr};

use ccg_common::{parse_boolean_flag, Secret};
use ccg_engine::{DEFAULT_CLAIM_TIMEOUT_SECS, DEFAULT_SHOP_NAME};
use chrono::Duration;
use coinbase_tools::CoinbaseConfig;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::errors::ServerError;

const DEFAULT_CCG_HOST: &str = "127.0.0.1";
const DEFAULT_CCG_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/ccg_store.db";
const DEFAULT_CURRENCY: &str = "USD";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// If supplied, requests against /webhooks endpoints will be checked against this list of IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub webhook_whitelist: Option<Vec<IpAddr>>,
    pub coinbase: CoinbaseConfig,
    /// The currency that order totals are denominated in.
    pub currency: String,
    pub shop_name: String,
    /// Payment claims that never received a charge id are considered abandoned after this long.
    pub payment_claim_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CCG_HOST.to_string(),
            port: DEFAULT_CCG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook_whitelist: None,
            coinbase: CoinbaseConfig::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            shop_name: DEFAULT_SHOP_NAME.to_string(),
            payment_claim_timeout: Duration::seconds(DEFAULT_CLAIM_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("CCG_HOST").ok().unwrap_or_else(|| DEFAULT_CCG_HOST.into());
        let port = env::var("CCG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CCG_PORT. {e} Using the default, {DEFAULT_CCG_PORT}, instead."
                    );
                    DEFAULT_CCG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CCG_PORT);
        let database_url = env::var("CCG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CCG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("CCG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("CCG_USE_FORWARDED").ok(), false);
        let webhook_whitelist = configure_webhook_whitelist(env::var("CCG_WEBHOOK_IP_WHITELIST").ok());
        let coinbase = CoinbaseConfig::new_from_env_or_default();
        let currency = env::var("CCG_CURRENCY").ok().unwrap_or_else(|| {
            info!("🪛️ CCG_CURRENCY is not set. Order totals are in {DEFAULT_CURRENCY}");
            DEFAULT_CURRENCY.to_string()
        });
        let shop_name = env::var("CCG_SHOP_NAME").ok().unwrap_or_else(|| DEFAULT_SHOP_NAME.to_string());
        let payment_claim_timeout = env::var("CCG_PAYMENT_CLAIM_TIMEOUT_SECS")
            .map_err(|_| {
                info!(
                    "🪛️ CCG_PAYMENT_CLAIM_TIMEOUT_SECS is not set. Using the default value of \
                     {DEFAULT_CLAIM_TIMEOUT_SECS}s."
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(Duration::seconds)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for CCG_PAYMENT_CLAIM_TIMEOUT_SECS. {e}"))
            })
            .ok()
            .unwrap_or_else(|| Duration::seconds(DEFAULT_CLAIM_TIMEOUT_SECS));
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            webhook_whitelist,
            coinbase,
            currency,
            shop_name,
            payment_claim_timeout,
        }
    }

    /// Checks settings that are only wrong in combination.
    ///
    /// A payment claim must outlive the gateway call made under it. Otherwise a slow provider response could arrive
    /// after the claim has been replaced, and the order would end up with two charges.
    pub fn validate(&self) -> Result<(), ServerError> {
        let gateway_timeout = Duration::from_std(self.coinbase.timeout).map_err(|e| {
            ServerError::ConfigurationError(format!("CCG_COINBASE_TIMEOUT_SECS is out of range. {e}"))
        })?;
        if gateway_timeout >= self.payment_claim_timeout {
            return Err(ServerError::ConfigurationError(format!(
                "CCG_COINBASE_TIMEOUT_SECS ({}s) must be shorter than CCG_PAYMENT_CLAIM_TIMEOUT_SECS ({}s)",
                gateway_timeout.num_seconds(),
                self.payment_claim_timeout.num_seconds()
            )));
        }
        Ok(())
    }
}

fn configure_webhook_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let whitelist = value.and_then(|s| {
        if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
            info!(
                "🪛️ Webhook IP whitelist is disabled. If this is not what you want, set CCG_WEBHOOK_IP_WHITELIST to a \
                 comma-separated list of IP addresses to enable it."
            );
            return None;
        }
        let ip_addrs = s
            .split(',')
            .filter_map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in CCG_WEBHOOK_IP_WHITELIST: {e}"))
                    .ok()
            })
            .collect::<Vec<IpAddr>>();
        Some(ip_addrs)
    });
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The webhook IP whitelist was configured, but is empty.  The server will run, but won't authorise \
                 any incoming webhook requests."
            );
        },
        None => {
            info!("🪛️ No webhook IP whitelist is set. Only signature validation will be used.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Webhook IP whitelist: {addrs}");
        },
    }
    whitelist
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret shared with the service that issues buyer access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No externally \
             issued token will be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("CCG_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [CCG_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("CCG_JWT_SECRET is empty".to_string()));
        }
        Ok(Self::new(secret))
    }
}
