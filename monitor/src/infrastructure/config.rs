use anyhow::{bail, Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

use crate::application::live::ControllerSettings;

const ENV_PREFIX: &str = "MONITOR";

/// Runtime configuration, read from `MONITOR_*` environment variables
/// (optionally via a `.env` file)
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Base URL of the remote inference service
    pub base_url: String,
    pub poll_interval_ms: u64,
    /// Per-request timeout for every HTTP call
    pub request_timeout_ms: u64,
    pub start_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    pub failure_threshold: u32,
    /// Serve the status API when set
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

impl MonitorConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_environment(environment: Environment) -> Result<Self> {
        let config: MonitorConfig = Config::builder()
            .set_default("base_url", "http://localhost:8000")?
            .set_default("poll_interval_ms", 120_i64)?
            .set_default("request_timeout_ms", 5_000_i64)?
            .set_default("start_timeout_ms", 10_000_i64)?
            .set_default("stop_timeout_ms", 5_000_i64)?
            .set_default("failure_threshold", 25_i64)?
            .add_source(environment)
            .build()
            .context("Failed to read monitor configuration")?
            .try_deserialize()
            .context("Invalid monitor configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_ms == 0 || self.start_timeout_ms == 0 || self.stop_timeout_ms == 0 {
            bail!("timeouts must be greater than zero");
        }
        self.base_url()?;
        Ok(())
    }

    /// Parsed base URL, always ending in `/` so endpoint paths join beneath it
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.base_url))?;
        if url.cannot_be_a_base() {
            bail!("base_url cannot be used as a base: {}", self.base_url);
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            start_timeout: Duration::from_millis(self.start_timeout_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
            failure_threshold: self.failure_threshold,
        }
    }
}
