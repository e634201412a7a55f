//! Typed configuration from an optional TOML file and environment variables.
//!
//! Loads once at startup and fails fast on malformed values. Environment
//! variables win over the file; anything unset falls back to defaults.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{RelayConfig, SweepConfig, WaitConfig};
use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 30001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub sweep_interval: Duration,
    pub entry_ttl: Duration,
    pub channel_capacity: usize,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            sweep_interval: Duration::from_secs(30),
            entry_ttl: Duration::from_secs(120),
            channel_capacity: 64,
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

/// On-disk shape. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    sweep_interval_secs: Option<u64>,
    entry_ttl_secs: Option<u64>,
    channel_capacity: Option<usize>,
    otel_endpoint: Option<String>,
    log_level: Option<String>,
}

impl Config {
    /// Load configuration from environment variables only.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::layered(FileConfig::default(), &process_env)
    }

    /// Load the TOML file at `path`, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                parse_file(&raw)?
            }
            None => FileConfig::default(),
        };
        Self::layered(file, &process_env)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Self::layered(parse_file(raw)?, &no_env)
    }

    fn layered(file: FileConfig, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let timeout_secs = env_parse::<u64>(env, "RELAY_TIMEOUT_SECS")?.or(file.timeout_secs);
        // An explicit timeout without an explicit ttl keeps the ttl at twice the timeout
        let ttl_secs = env_parse::<u64>(env, "RELAY_ENTRY_TTL_SECS")?
            .or(file.entry_ttl_secs)
            .or(timeout_secs.map(|t| t.saturating_mul(2)));

        let log_level = env("LOG_LEVEL").or(file.log_level).unwrap_or_else(|| {
            if debug_enabled(env) {
                "debug".to_string()
            } else {
                defaults.log_level.clone()
            }
        });

        let config = Self {
            host: env("RELAY_HOST").or(file.host).unwrap_or(defaults.host),
            port: env_parse(env, "RELAY_PORT")?
                .or(file.port)
                .unwrap_or(defaults.port),
            request_timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            poll_interval: env_parse(env, "RELAY_POLL_INTERVAL_MS")?
                .or(file.poll_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            sweep_interval: env_parse(env, "RELAY_SWEEP_INTERVAL_SECS")?
                .or(file.sweep_interval_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            entry_ttl: ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.entry_ttl),
            channel_capacity: env_parse(env, "RELAY_CHANNEL_CAPACITY")?
                .or(file.channel_capacity)
                .unwrap_or(defaults.channel_capacity),
            otel_endpoint: env("OTEL_ENDPOINT").or(file.otel_endpoint),
            log_level,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be positive".to_string()));
        }
        if self.poll_interval.is_zero() || self.poll_interval > self.request_timeout {
            return Err(Error::Config(format!(
                "poll interval {:?} must be positive and no longer than the timeout {:?}",
                self.poll_interval, self.request_timeout
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::Config("sweep interval must be positive".to_string()));
        }
        // A result landing just before the deadline is only taken on the
        // next poll, so the entry must outlive timeout + one poll.
        let min_ttl = self.request_timeout.checked_add(self.poll_interval);
        if min_ttl.is_none_or(|min| self.entry_ttl < min) {
            return Err(Error::Config(format!(
                "entry ttl {:?} must cover the timeout {:?} plus one poll interval {:?}",
                self.entry_ttl, self.request_timeout, self.poll_interval
            )));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel capacity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address {}:{}: {e}", self.host, self.port)))
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            wait: WaitConfig {
                timeout: self.request_timeout,
                poll_interval: self.poll_interval,
            },
            sweep: SweepConfig {
                interval: self.sweep_interval,
                entry_ttl: self.entry_ttl,
            },
            channel_capacity: self.channel_capacity,
        }
    }
}

fn parse_file(raw: &str) -> Result<FileConfig> {
    toml::from_str(raw).map_err(|e| Error::Config(format!("invalid config file: {e}")))
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_parse<T>(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}"))),
        None => Ok(None),
    }
}

fn debug_enabled(env: &dyn Fn(&str) -> Option<String>) -> bool {
    env("DEBUG")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
