use std::{env, fmt, ops::Deref, str::FromStr, sync::Arc, time::Duration};

use tracing::Level;

use crate::{
    dao::SubscriptionStore,
    error::Error,
    handler::DispatchCoordinator,
    provider::DeliveryClient,
    push::{NotificationDefaults, PayloadEncoder, PayloadEncryption, VapidKeyPair},
    types::Urgency,
};

/// Four weeks, the longest TTL push services keep a message.
pub const MAX_TTL: u32 = 2_419_200;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;
pub const MAX_CONCURRENCY: usize = 1024;
pub const MAX_RETENTION_DAYS: i64 = 36_500;
pub const MAX_CLEANUP_INTERVAL_MINUTES: u64 = 10_080;

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

pub struct State {
    pub config: Config,
    pub keys: Arc<VapidKeyPair>,
    pub store: Arc<dyn SubscriptionStore>,
    pub dispatcher: DispatchCoordinator,
}

impl State {
    /// Fails when the VAPID material is invalid; no dispatcher is built then.
    pub fn new(
        config: Config,
        store: Arc<dyn SubscriptionStore>,
    ) -> Result<State, Error> {
        let keys = Arc::new(VapidKeyPair::new(
            &config.vapid_subject,
            &config.vapid_public_key,
            &config.vapid_private_key,
        )?);

        let client = DeliveryClient::new(
            Duration::from_secs(config.connect_timeout),
            &config.user_agent,
        )?;

        let encoder = PayloadEncoder::new(
            NotificationDefaults {
                icon: config.icon.to_owned(),
                badge: config.badge.to_owned(),
                ttl: config.ttl,
                urgency: config.urgency,
            },
            config.encryption,
        );

        let dispatcher = DispatchCoordinator::new(
            store.clone(),
            keys.clone(),
            client,
            encoder,
            Duration::from_secs(config.timeout),
            config.max_concurrency,
        );

        Ok(State {
            config,
            keys,
            store,
            dispatcher,
        })
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub auth: String,
    pub vapid_subject: String,
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    pub ttl: u32,
    pub urgency: Urgency,
    pub timeout: u64,
    pub connect_timeout: u64,
    pub user_agent: String,
    pub icon: String,
    pub badge: String,
    pub encryption: PayloadEncryption,
    pub max_concurrency: usize,
    pub auto_cleanup: bool,
    pub expired_after_days: i64,
    pub unused_after_days: i64,
    pub cleanup_interval: u64,
    pub log_level: Level,
}

impl Config {
    /// Builds the configuration from a variable source. Missing optional
    /// variables fall back to their defaults.
    pub fn load<F>(source: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Result<Option<String>, Error>,
    {
        let required = |name: &str| -> Result<String, Error> {
            match source(name)? {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(Error::ConfigurationError(format!(
                    "{} is not set",
                    name
                ))),
            }
        };
        let optional = |name: &str, default: &str| -> Result<String, Error> {
            Ok(source(name)?.unwrap_or_else(|| default.to_owned()))
        };

        let database_url = required("DATABASE_URL")?;
        let database_max_connections = bounded(
            "DATABASE_MAX_CONNECTIONS",
            optional("DATABASE_MAX_CONNECTIONS", "10")?.parse::<u32>()?,
            1,
            1000,
        )?;
        let server_host = optional("SERVER_HOST", "127.0.0.1")?;
        let port: u16 = optional("PORT", "8080")?.parse()?;
        let allowed_origins = optional("ALLOWED_ORIGINS", "*")?
            .split(',')
            .map(|item| item.trim().to_owned())
            .filter(|item| !item.is_empty())
            .collect::<Vec<String>>();
        let auth = required("AUTH")?;

        let vapid_subject = required("WEBPUSH_VAPID_SUBJECT")?;
        let vapid_public_key = required("WEBPUSH_VAPID_PUBLIC_KEY")?;
        let vapid_private_key = required("WEBPUSH_VAPID_PRIVATE_KEY")?;

        let ttl = bounded(
            "WEBPUSH_TTL",
            optional("WEBPUSH_TTL", "86400")?.parse::<u32>()?,
            0,
            MAX_TTL,
        )?;
        let urgency = Urgency::from_str(&optional("WEBPUSH_URGENCY", "normal")?)?;
        let timeout = bounded(
            "WEBPUSH_TIMEOUT",
            optional("WEBPUSH_TIMEOUT", "30")?.parse::<u64>()?,
            1,
            MAX_TIMEOUT_SECONDS,
        )?;
        let connect_timeout = bounded(
            "WEBPUSH_CONNECT_TIMEOUT",
            optional("WEBPUSH_CONNECT_TIMEOUT", "10")?.parse::<u64>()?,
            1,
            MAX_TIMEOUT_SECONDS,
        )?;
        let user_agent = optional(
            "WEBPUSH_USER_AGENT",
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
        )?;
        let icon = optional("WEBPUSH_ICON", "/favicon.ico")?;
        let badge = optional("WEBPUSH_BADGE", "/badge.png")?;
        let encryption = PayloadEncryption::from_str(&optional(
            "WEBPUSH_ENCRYPTION",
            "aes128gcm",
        )?)?;
        let max_concurrency = bounded(
            "WEBPUSH_MAX_CONCURRENCY",
            optional("WEBPUSH_MAX_CONCURRENCY", "16")?.parse::<usize>()?,
            1,
            MAX_CONCURRENCY,
        )?;

        let auto_cleanup = optional("WEBPUSH_AUTO_CLEANUP", "false")?.parse()?;
        let expired_after_days = bounded(
            "WEBPUSH_EXPIRED_AFTER_DAYS",
            optional("WEBPUSH_EXPIRED_AFTER_DAYS", "30")?.parse::<i64>()?,
            1,
            MAX_RETENTION_DAYS,
        )?;
        let unused_after_days = bounded(
            "WEBPUSH_UNUSED_AFTER_DAYS",
            optional("WEBPUSH_UNUSED_AFTER_DAYS", "90")?.parse::<i64>()?,
            1,
            MAX_RETENTION_DAYS,
        )?;
        let cleanup_interval = bounded(
            "WEBPUSH_CLEANUP_INTERVAL_IN_MINUTES",
            optional("WEBPUSH_CLEANUP_INTERVAL_IN_MINUTES", "60")?
                .parse::<u64>()?,
            1,
            MAX_CLEANUP_INTERVAL_MINUTES,
        )?;

        let log_level = optional("WEBPUSH_LOG_LEVEL", "info")?;
        let log_level = Level::from_str(&log_level).map_err(|_| {
            Error::ConfigurationError(format!(
                "unknown log level {}",
                log_level
            ))
        })?;

        Ok(Config {
            database_url,
            database_max_connections,
            server_host,
            port,
            allowed_origins,
            auth,
            vapid_subject,
            vapid_public_key,
            vapid_private_key,
            ttl,
            urgency,
            timeout,
            connect_timeout,
            user_agent,
            icon,
            badge,
            encryption,
            max_concurrency,
            auto_cleanup,
            expired_after_days,
            unused_after_days,
            cleanup_interval,
            log_level,
        })
    }
}

fn bounded<T>(name: &str, value: T, min: T, max: T) -> Result<T, Error>
where
    T: PartialOrd + fmt::Display,
{
    if value < min || value > max {
        return Err(Error::ConfigurationError(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }

    Ok(value)
}

pub fn get_configuration() -> Result<Config, Error> {
    Config::load(|name| match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::VAR(e)),
    })
}

/// Seeds the process environment from `.env` when the file exists.
pub fn set_configuration() -> Result<(), Error> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Error::ConfigurationError(e.to_string())),
    }
}
