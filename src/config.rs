use crate::error::ExporterError;
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub domoticz: DomoticzConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DomoticzConfig {
    /// `host:port` or a full `http://` URL of the Domoticz web server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: SecretString,
    /// Device `idx` values scraped on every request, in order
    ///
    /// Accepts a list or a comma separated string (environment overrides).
    #[serde(default, deserialize_with = "deserialize_device_ids")]
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    #[serde(default = "default_push_path")]
    pub push_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

/// What a scrape cycle does when a single device cannot be fetched or decoded
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop the cycle at the first failing device
    #[default]
    AbortOnFirstError,
    /// Log the failure and move on to the next device
    SkipAndContinue,
}

impl Default for DomoticzConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: String::new(),
            password: default_password(),
            device_ids: Vec::new(),
            request_timeout_seconds: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            metrics_path: default_metrics_path(),
            push_path: default_push_path(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

fn default_endpoint() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_password() -> SecretString {
    SecretString::from(String::new())
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9112
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_push_path() -> String {
    "/domoticz".to_string()
}

fn default_max_concurrent_fetches() -> usize {
    1
}

/// Served by the exporter itself, so it cannot be reused for metrics or push
pub const HEALTH_PATH: &str = "/health";

/// Splits a comma separated id list, keeping order and duplicates
pub fn parse_device_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_device_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DeviceIds {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match DeviceIds::deserialize(deserializer)? {
        DeviceIds::List(ids) => ids
            .iter()
            .flat_map(|id| parse_device_ids(id))
            .collect(),
        DeviceIds::Joined(ids) => parse_device_ids(&ids),
    })
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("DOMOTICZ_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Checks the settings the exporter cannot start without
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.domoticz.device_ids.is_empty() {
            return Err(ExporterError::Config(
                "Domoticz device ids cannot be empty".to_string(),
            ));
        }

        if self.scrape.max_concurrent_fetches == 0 {
            return Err(ExporterError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }

        for (name, path) in [
            ("metrics_path", &self.server.metrics_path),
            ("push_path", &self.server.push_path),
        ] {
            if !path.starts_with('/') || path.len() < 2 || path == HEALTH_PATH {
                return Err(ExporterError::Config(format!(
                    "{} must start with '/' and not be '/' or '{}', got {:?}",
                    name, HEALTH_PATH, path
                )));
            }
        }

        if self.server.metrics_path == self.server.push_path {
            return Err(ExporterError::Config(format!(
                "metrics_path and push_path must differ, both are {:?}",
                self.server.metrics_path
            )));
        }

        Ok(())
    }
}
