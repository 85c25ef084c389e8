use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::AppError;
use crate::model::instrument::{default_instruments, InstrumentSpec};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const DEFAULT_METRICS_HOST: &str = "stockzrs-metrics-service.stockzrs.com";
pub const DEFAULT_RELAY_WS_URL: &str = "wss://stockzrs-relay-service.stockzrs.com";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub instruments: Vec<InstrumentSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    #[default]
    Deployed,
}

impl Environment {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Local => "http",
            Self::Deployed => "https",
        }
    }

    fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("local") {
            Self::Local
        } else {
            Self::Deployed
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Host (optionally with port) of the metrics service, without scheme.
    #[serde(default = "default_metrics_host")]
    pub host: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            host: default_metrics_host(),
            environment: Environment::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl MetricsConfig {
    /// Base URL of the metrics service. Fails fast when no host is configured.
    pub fn base_url(&self) -> Result<Url, AppError> {
        let host = self.host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(AppError::Config(
                "metrics service URL is not configured".to_string(),
            ));
        }
        let raw = if host.contains("://") {
            host.to_string()
        } else {
            format!("{}://{}", self.environment.scheme(), host)
        };
        Ok(Url::parse(&format!("{}/", raw))?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ws_url: default_relay_ws_url(),
            channel_capacity: default_channel_capacity(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl RelayConfig {
    /// Validated relay URL. Only `ws` and `wss` are accepted.
    pub fn url(&self) -> Result<Url, AppError> {
        let raw = self.ws_url.trim();
        if raw.is_empty() {
            return Err(AppError::Config(
                "relay service WebSocket URL is not configured".to_string(),
            ));
        }
        let url = Url::parse(raw)?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(AppError::Config(format!(
                "relay URL must use ws or wss, got '{}'",
                other
            ))),
        }
    }
}

/// How the relay connection waits before reconnecting after a close.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Constant delay, retried forever.
    Fixed {
        #[serde(default = "default_reconnect_delay_ms")]
        delay_ms: u64,
    },
    /// Delay grows by `factor` up to `max_ms`; reset after a successful open.
    Exponential {
        initial_ms: u64,
        max_ms: u64,
        #[serde(default = "default_backoff_factor")]
        factor: f64,
        #[serde(default)]
        jitter: bool,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

fn default_metrics_host() -> String {
    DEFAULT_METRICS_HOST.to_string()
}

fn default_relay_ws_url() -> String {
    DEFAULT_RELAY_WS_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_channel_capacity() -> usize {
    256
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics: MetricsConfig::default(),
            relay: RelayConfig::default(),
            logging: LoggingConfig::default(),
            instruments: default_instruments(),
        }
    }
}

impl Config {
    /// Load `config/default.toml` (or `$TICKERBOARD_CONFIG`), then apply `.env` and
    /// environment overrides. A missing file falls back to built-in defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("TICKERBOARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_path(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(toml_str)?;
        if config.instruments.is_empty() {
            config.instruments = default_instruments();
        }
        Ok(config)
    }

    /// Apply `METRICS_SERVICE_URL`, `RELAY_SERVICE_WS_URL` and `ENVIRONMENT`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("METRICS_SERVICE_URL").filter(|v| !v.trim().is_empty()) {
            self.metrics.host = host;
        }
        if let Some(url) = lookup("RELAY_SERVICE_WS_URL").filter(|v| !v.trim().is_empty()) {
            self.relay.ws_url = url;
        }
        if let Some(env) = lookup("ENVIRONMENT") {
            self.metrics.environment = Environment::from_env_value(&env);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.relay.url().context("relay.ws_url is invalid")?;
        if self.relay.channel_capacity == 0 {
            anyhow::bail!("relay.channel_capacity must be > 0");
        }
        if let ReconnectPolicy::Exponential {
            initial_ms,
            max_ms,
            factor,
            ..
        } = &self.relay.reconnect
        {
            if *initial_ms == 0 || max_ms < initial_ms || *factor < 1.0 {
                anyhow::bail!(
                    "relay.reconnect: need 0 < initial_ms <= max_ms and factor >= 1.0"
                );
            }
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &self.instruments {
            if spec.symbol.trim().is_empty() {
                anyhow::bail!("instrument symbol must not be empty");
            }
            if !seen.insert(spec.symbol.as_str()) {
                anyhow::bail!("duplicate instrument symbol '{}'", spec.symbol);
            }
        }
        Ok(())
    }
}
