use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use mdp_common::{
    helpers::{non_blank, parse_boolean_flag},
    Secret,
};
use medic_dispatch_engine::geo::DEFAULT_SEARCH_RADIUS_KM;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_MDP_HOST: &str = "127.0.0.1";
const DEFAULT_MDP_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/medic_dispatch.db";
const DEFAULT_ACCESS_TOKEN_TTL_HOURS: u64 = 24;
const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;
const DEFAULT_REALTIME_BUFFER_SIZE: usize = 64;
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_WEB_PUSH_TTL_SECS: u64 = 3_600;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The time allowed for a single notification send before it is abandoned.
    pub notification_timeout: Duration,
    /// The queue size for each event hook worker.
    pub event_buffer_size: usize,
    /// The outbound queue size for each websocket connection. Events for a connection with a full queue are dropped.
    pub realtime_buffer_size: usize,
    /// How far away (in km) medics can see open orders.
    pub provider_search_radius_km: f64,
    pub channels: ChannelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MDP_HOST.to_string(),
            port: DEFAULT_MDP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            notification_timeout: Duration::from_millis(DEFAULT_NOTIFICATION_TIMEOUT_MS),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            realtime_buffer_size: DEFAULT_REALTIME_BUFFER_SIZE,
            provider_search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            channels: ChannelConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = non_blank(env::var("MDP_HOST").ok()).unwrap_or_else(|| DEFAULT_MDP_HOST.into());
        let port = env_or("MDP_PORT", DEFAULT_MDP_PORT);
        let database_url = non_blank(env::var("MDP_DATABASE_URL").ok()).unwrap_or_else(|| {
            info!("🪛️ MDP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.into()
        });
        let auth = AuthConfig::from_env_or_default();
        let notification_timeout =
            Duration::from_millis(env_or("MDP_NOTIFICATION_TIMEOUT_MS", DEFAULT_NOTIFICATION_TIMEOUT_MS));
        let event_buffer_size = at_least_one("MDP_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let realtime_buffer_size = at_least_one("MDP_REALTIME_BUFFER_SIZE", DEFAULT_REALTIME_BUFFER_SIZE);
        let provider_search_radius_km = env_or("MDP_PROVIDER_SEARCH_RADIUS_KM", DEFAULT_SEARCH_RADIUS_KM);
        let provider_search_radius_km = if provider_search_radius_km.is_finite() && provider_search_radius_km > 0.0 {
            provider_search_radius_km
        } else {
            warn!("🪛️ MDP_PROVIDER_SEARCH_RADIUS_KM must be positive. Using {DEFAULT_SEARCH_RADIUS_KM} km instead.");
            DEFAULT_SEARCH_RADIUS_KM
        };
        let channels = ChannelConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            notification_timeout,
            event_buffer_size,
            realtime_buffer_size,
            provider_search_radius_km,
            channels,
        }
    }
}

/// Reads `name` from the environment, falling back to `default` (with a warning) if it cannot be parsed.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match non_blank(env::var(name).ok()) {
        None => default,
        Some(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn at_least_one(name: &str, default: usize) -> usize {
    match env_or(name, default) {
        0 => {
            warn!("🪛️ {name} cannot be zero. Using the default, {default}, instead.");
            default
        },
        n => n,
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC key used to sign and verify access tokens.
    pub secret: Secret<String>,
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The access token secret has not been set. I'm using a random value for this session. Tokens issued \
             now will not be valid after a restart. Set MDP_AUTH_SECRET in production. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { secret: Secret::new(secret), token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_HOURS * 3600) }
    }
}

impl AuthConfig {
    pub fn new(secret: &str, token_ttl: Duration) -> Self {
        Self { secret: Secret::new(secret.to_string()), token_ttl }
    }

    pub fn from_env_or_default() -> Self {
        let hours = env_or("MDP_ACCESS_TOKEN_TTL", DEFAULT_ACCESS_TOKEN_TTL_HOURS);
        match non_blank(env::var("MDP_AUTH_SECRET").ok()) {
            Some(secret) => Self::new(&secret, Duration::from_secs(hours * 3600)),
            None => Self { token_ttl: Duration::from_secs(hours * 3600), ..Self::default() },
        }
    }
}

//-------------------------------------------------  ChannelConfig  ----------------------------------------------------
/// Which notification channels are switched on. A channel without its required settings stays off.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub web_push_enabled: bool,
    pub web_push_ttl_secs: u64,
    pub telegram_bot_token: Option<Secret<String>>,
    pub telegram_api_url: String,
    pub mobile_push_url: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            web_push_enabled: true,
            web_push_ttl_secs: DEFAULT_WEB_PUSH_TTL_SECS,
            telegram_bot_token: None,
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            mobile_push_url: None,
        }
    }
}

impl ChannelConfig {
    pub fn from_env_or_default() -> Self {
        let web_push_enabled = parse_boolean_flag(env::var("MDP_WEB_PUSH_ENABLED").ok(), true);
        let web_push_ttl_secs = env_or("MDP_WEB_PUSH_TTL", DEFAULT_WEB_PUSH_TTL_SECS);
        let telegram_bot_token = non_blank(env::var("MDP_TELEGRAM_BOT_TOKEN").ok()).map(Secret::new);
        if telegram_bot_token.is_none() {
            info!("🪛️ MDP_TELEGRAM_BOT_TOKEN is not set. Telegram notifications are disabled.");
        }
        let telegram_api_url =
            non_blank(env::var("MDP_TELEGRAM_API_URL").ok()).unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.into());
        let mobile_push_url = non_blank(env::var("MDP_MOBILE_PUSH_URL").ok());
        if mobile_push_url.is_none() {
            info!("🪛️ MDP_MOBILE_PUSH_URL is not set. Mobile push notifications are disabled.");
        }
        Self { web_push_enabled, web_push_ttl_secs, telegram_bot_token, telegram_api_url, mobile_push_url }
    }
}
