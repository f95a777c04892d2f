use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize, Debug)]
pub struct Config {
    pub ledfx: LedFxSettings,

    #[serde(default)]
    pub polling: PollSettings,

    #[serde(default)]
    pub logging: LogSettings,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct LedFxSettings {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl LedFxSettings {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct PollSettings {
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_interval")]
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: default_level(),
        }
    }
}

impl LogSettings {
    pub fn level_filter(&self) -> anyhow::Result<log::LevelFilter> {
        self.level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log level {:?}", self.level))
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_interval() -> Duration {
    DEFAULT_SCAN_INTERVAL
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Reject values that would stall requests or the polling loop.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ledfx.request_timeout.is_zero() {
            anyhow::bail!("ledfx.request_timeout must be at least one second");
        }
        if self.polling.interval.is_zero() {
            anyhow::bail!("polling.interval must be at least one second");
        }
        Ok(())
    }
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents).context("Unable to parse the config file")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Unable to open the config file {}", path.display()))?;
    parse_config(&contents)
}
