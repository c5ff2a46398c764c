use anyhow::{Context, Result};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    pub balance_api: BalanceApi,
    pub refresh: Refresh,
    pub pagination: Pagination,
    pub metadata: Metadata,
    #[serde(default)]
    pub roster: Roster,
    pub server: Server,
    pub observability: Observability,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceApi {
    pub base_url: String,
    /// Falls back to the refresh interval so a hung request never outlives a cycle.
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Refresh {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub page_size: NonZeroUsize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub path: String,
}

/// Fixed address roster. Empty means addresses are entered by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Observability {
    pub prometheus_port: u16,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.refresh.interval_ms > 0, "refresh.interval_ms must be > 0");
        anyhow::ensure!(
            self.balance_api.request_timeout_ms != Some(0),
            "balance_api.request_timeout_ms must be > 0"
        );
        let url = reqwest::Url::parse(&self.balance_api.base_url)
            .with_context(|| format!("balance_api.base_url is not a valid URL: {}", self.balance_api.base_url))?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "balance_api.base_url must be http or https"
        );
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        self.balance_api
            .request_timeout_ms
            .map_or_else(|| self.refresh_interval(), Duration::from_millis)
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.pagination.page_size
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
