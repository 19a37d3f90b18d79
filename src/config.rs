use crate::domain::services::models::descriptor::{ServiceDescriptor, ServiceRegistry};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Docker socket path, bollard's local defaults when unset.
    #[serde(default)]
    pub docker_socket: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_log_tail")]
    pub log_tail: usize,
    /// Host to run network probes against. Each service's container name
    /// is used when unset, which resolves on the compose network.
    #[serde(default)]
    pub probe_host: Option<String>,
    /// Replaces the built-in service topology.
    #[serde(default)]
    pub services: Option<Vec<ServiceDescriptor>>,
}

fn default_port() -> u16 {
    4000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_log_tail() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            docker_socket: None,
            poll_interval_ms: default_poll_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            log_tail: default_log_tail(),
            probe_host: None,
            services: None,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn registry(&self) -> ServiceRegistry {
        match &self.services {
            Some(services) => ServiceRegistry::new(services.clone()),
            None => ServiceRegistry::default(),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid("probe_timeout_ms must be positive".into()));
        }
        if self.log_tail == 0 {
            return Err(ConfigError::Invalid("log_tail must be positive".into()));
        }
        if self.registry().is_empty() {
            return Err(ConfigError::Invalid("services must not be empty".into()));
        }
        Ok(self)
    }
}

/// Reads `config_path` (a missing file is fine) and then `DASHBOARD_*`
/// environment variables on top. Nested keys are separated by `__`.
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Toml::file(config_path))
        .merge(Env::prefixed("DASHBOARD_").split("__"))
        .extract()
        .map_err(Box::new)?;
    config.validate()
}
