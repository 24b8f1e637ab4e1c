use std::{env, net::IpAddr, path::PathBuf, time::Duration as StdDuration};

use chrono::Duration;
use khqr_engine::{
    kpe_api::config::DEFAULT_PAYMENT_METHOD,
    sqlite_db::db_url,
    MerchantProfile,
    ReconciliationConfig,
};
use khqr_provider::ProviderConfig;
use kpg_common::{helpers::env_flag, Secret};
use log::*;

const DEFAULT_KPG_HOST: &str = "127.0.0.1";
const DEFAULT_KPG_PORT: u16 = 8360;
const DEFAULT_PROVIDER_ID: &str = "KHQR";
const DEFAULT_ORDER_MATCH_WINDOW: Duration = Duration::minutes(30);
const DEFAULT_PENDING_REQUEST_TTL: Duration = Duration::minutes(60);
const DEFAULT_JANITOR_INTERVAL: StdDuration = StdDuration::from_secs(60);
pub const WEBHOOK_HMAC_HEADER: &str = "X-KHQR-Signature";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The payee details carried in every generated payload.
    pub merchant: MerchantProfile,
    pub reconciliation: ReconciliationConfig,
    /// How often the janitor looks for stale payment requests.
    pub janitor_interval: StdDuration,
    /// Where rendered QR codes are written. No codes are rendered when this is `None`.
    pub qr_output_dir: Option<PathBuf>,
    /// If set, a summary of every paid order is POSTed to this URL.
    pub notify_url: Option<String>,
    pub webhook: WebhookConfig,
    pub provider: ProviderConfig,
}

#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
    /// If supplied, webhook calls are checked against this whitelist of provider IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KPG_HOST.to_string(),
            port: DEFAULT_KPG_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            merchant: default_merchant(),
            reconciliation: ReconciliationConfig::default(),
            janitor_interval: DEFAULT_JANITOR_INTERVAL,
            qr_output_dir: None,
            notify_url: None,
            webhook: WebhookConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

fn default_merchant() -> MerchantProfile {
    MerchantProfile {
        provider_id: DEFAULT_PROVIDER_ID.to_string(),
        payee_account: String::default(),
        payee_display_name: String::default(),
        merchant_city: String::default(),
        store_label: String::default(),
        terminal_label: String::default(),
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KPG_HOST").ok().unwrap_or_else(|| DEFAULT_KPG_HOST.into());
        let port = env::var("KPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for KPG_PORT. {e} Using the default, {DEFAULT_KPG_PORT}, instead."
                    );
                    DEFAULT_KPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_KPG_PORT);
        let database_url = db_url();
        let use_x_forwarded_for = env_flag("KPG_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("KPG_USE_FORWARDED", false);
        let merchant = merchant_from_env();
        let reconciliation = ReconciliationConfig {
            match_window: minutes_from_env("KPG_ORDER_MATCH_WINDOW", DEFAULT_ORDER_MATCH_WINDOW),
            pending_request_ttl: minutes_from_env("KPG_PENDING_REQUEST_TTL", DEFAULT_PENDING_REQUEST_TTL),
            payment_method: env::var("KPG_PAYMENT_METHOD").unwrap_or_else(|_| DEFAULT_PAYMENT_METHOD.to_string()),
            ..Default::default()
        };
        let janitor_interval = env::var("KPG_JANITOR_INTERVAL")
            .ok()
            .and_then(|s| parse_seconds("KPG_JANITOR_INTERVAL", &s))
            .unwrap_or(DEFAULT_JANITOR_INTERVAL);
        let qr_output_dir = env::var("KPG_QR_OUTPUT_DIR").ok().filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        if qr_output_dir.is_none() {
            info!("🪛️ KPG_QR_OUTPUT_DIR is not set. QR codes will not be rendered; clients get the raw payload only.");
        }
        let notify_url = env::var("KPG_NOTIFY_URL").ok().filter(|s| !s.trim().is_empty());
        let webhook = WebhookConfig::from_env_or_defaults();
        let provider = ProviderConfig::new_from_env_or_default();
        // The engine's bound on a verifier call is the same as the HTTP client's
        let reconciliation = ReconciliationConfig { verification_timeout: provider.timeout, ..reconciliation };
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            merchant,
            reconciliation,
            janitor_interval,
            qr_output_dir,
            notify_url,
            webhook,
            provider,
        }
    }
}

fn merchant_from_env() -> MerchantProfile {
    let required = |name: &str| {
        env::var(name).ok().unwrap_or_else(|| {
            error!("🪛️ {name} is not set. Payment requests cannot be generated until it is.");
            String::default()
        })
    };
    let optional = |name: &str, default: &str| {
        env::var(name).ok().unwrap_or_else(|| {
            info!("🪛️ {name} is not set. Using '{default}'.");
            default.to_string()
        })
    };
    MerchantProfile {
        provider_id: optional("KPG_PROVIDER_ID", DEFAULT_PROVIDER_ID),
        payee_account: required("KPG_MERCHANT_ACCOUNT"),
        payee_display_name: required("KPG_MERCHANT_NAME"),
        merchant_city: required("KPG_MERCHANT_CITY"),
        store_label: optional("KPG_STORE_LABEL", "Store"),
        terminal_label: optional("KPG_TERMINAL_LABEL", "Terminal"),
    }
}

fn minutes_from_env(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(s) => parse_minutes(name, &s).unwrap_or(default),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {} minutes.", default.num_minutes());
            default
        },
    }
}

/// A strictly positive number of minutes that fits in a [`Duration`]. Anything else is logged and rejected.
fn parse_minutes(name: &str, value: &str) -> Option<Duration> {
    let minutes = value
        .trim()
        .parse::<i64>()
        .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default."))
        .ok()?;
    if minutes <= 0 {
        warn!("🪛️ {name} must be a positive number of minutes, but is {minutes}. Using the default.");
        return None;
    }
    let duration = Duration::try_minutes(minutes);
    if duration.is_none() {
        warn!("🪛️ {name} is out of range ({minutes} minutes). Using the default.");
    }
    duration
}

/// A strictly positive number of seconds.
fn parse_seconds(name: &str, value: &str) -> Option<StdDuration> {
    let seconds = value
        .trim()
        .parse::<u64>()
        .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default."))
        .ok()?;
    if seconds == 0 {
        warn!("🪛️ {name} must be at least one second. Using the default.");
        return None;
    }
    Some(StdDuration::from_secs(seconds))
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = env::var("KPG_WEBHOOK_HMAC_SECRET").ok().unwrap_or_else(|| {
            warn!("🪛️ KPG_WEBHOOK_HMAC_SECRET is not set. Signed webhooks cannot be validated.");
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_checks = env_flag("KPG_WEBHOOK_HMAC_CHECKS", true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are disabled. Anyone who can reach the server can mark payments as paid.");
        }
        let whitelist = env::var("KPG_PROVIDER_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The provider IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming webhooks."
                );
            },
            None => {
                info!("🪛️ No provider IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Provider IP whitelist: {addrs}");
            },
        }
        Self { hmac_secret, hmac_checks, whitelist }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Provider IP whitelist is disabled. If this is not what you want, set KPG_PROVIDER_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in KPG_PROVIDER_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub whitelist: Option<Vec<IpAddr>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            whitelist: config.webhook.whitelist.clone(),
        }
    }
}
