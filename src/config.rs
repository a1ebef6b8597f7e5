use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::schedule::pagination::{DEFAULT_PER_PAGE, MAX_PER_PAGE};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub session_store_path: String,

    // Schedule views
    pub default_per_page: u32,
    pub view_session_ttl: Duration,
    pub max_view_sessions: u64,

    // Upstream health polling
    pub health_poll_interval: Duration,
    pub health_log_capacity: usize,

    pub name_update_concurrency: usize,

    // Rate limiting
    pub rate_view_per_min: u32,
    pub rate_export_per_min: u32,

    pub api_prefix: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            upstream_url: required("UPSTREAM_URL")?,
            upstream_timeout: Duration::from_secs(or_default("UPSTREAM_TIMEOUT_SECS", 10)?),
            session_store_path: or_default("SESSION_STORE_PATH", "session.json".to_string())?,

            default_per_page: or_default("DEFAULT_PER_PAGE", DEFAULT_PER_PAGE)?,
            view_session_ttl: Duration::from_secs(or_default("VIEW_SESSION_TTL_SECS", 3600)?),
            max_view_sessions: or_default("MAX_VIEW_SESSIONS", 10_000)?,

            health_poll_interval: Duration::from_secs(or_default("HEALTH_POLL_SECS", 30)?),
            health_log_capacity: or_default("HEALTH_LOG_CAPACITY", 100)?,

            name_update_concurrency: or_default("NAME_UPDATE_CONCURRENCY", 8)?,

            rate_view_per_min: or_default("RATE_VIEW_PER_MIN", 600)?,
            rate_export_per_min: or_default("RATE_EXPORT_PER_MIN", 30)?,

            api_prefix: or_default("API_PREFIX", "/api".to_string())?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_PER_PAGE).contains(&self.default_per_page) {
            bail!("DEFAULT_PER_PAGE must be within 1..={MAX_PER_PAGE}");
        }
        if self.health_poll_interval.is_zero() {
            bail!("HEALTH_POLL_SECS must be positive");
        }
        if self.name_update_concurrency == 0 {
            bail!("NAME_UPDATE_CONCURRENCY must be positive");
        }
        if self.rate_view_per_min == 0 || self.rate_export_per_min == 0 {
            bail!("rate limits must be positive");
        }
        Ok(())
    }
}
