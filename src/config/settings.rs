//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub polling: PollingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Accepted API keys; empty means the surface is open
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Artifact storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub base_path: String,
    /// Bound on one artifact download, independent of the poll budget
    #[serde(default = "default_download_timeout")]
    pub download_timeout_ms: u64,
}

fn default_storage_path() -> String {
    "./storage".to_string()
}

fn default_download_timeout() -> u64 {
    120_000
}

/// Poll loop configuration for in-flight generations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// Delay between status polls
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    /// Attempt budget before a generation is failed as timed out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_poll_interval() -> u64 {
    3000
}

fn default_max_attempts() -> u32 {
    120
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Per-provider connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    /// Bound on one provider HTTP call (create or status)
    #[serde(default = "default_provider_timeout")]
    pub timeout_ms: u64,
}

fn default_provider_timeout() -> u64 {
    60_000
}

/// All integrated providers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_kie")]
    pub kie: ProviderSettings,
    #[serde(default = "default_poyo")]
    pub poyo: ProviderSettings,
}

fn default_kie() -> ProviderSettings {
    ProviderSettings {
        enabled: false,
        api_key: String::new(),
        base_url: "https://api.kie.ai/api/v1".to_string(),
        timeout_ms: default_provider_timeout(),
    }
}

fn default_poyo() -> ProviderSettings {
    ProviderSettings {
        enabled: false,
        api_key: String::new(),
        base_url: "https://api.poyo.ai".to_string(),
        timeout_ms: default_provider_timeout(),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            kie: default_kie(),
            poyo: default_poyo(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("storage.base_path", "./storage")?
            .set_default("storage.download_timeout_ms", 120_000)?
            .set_default("polling.interval_ms", 3000)?
            .set_default("polling.max_attempts", 120)?
            // Load from configuration file
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false),
            )
            // Override with environment variables (prefixed with MEDIAGEN__)
            .add_source(
                Environment::with_prefix("MEDIAGEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        if self.polling.max_attempts == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "polling.max_attempts must be at least 1".to_string(),
            )));
        }

        for (name, provider) in [("kie", &self.providers.kie), ("poyo", &self.providers.poyo)] {
            if provider.enabled && provider.api_key.is_empty() {
                return Err(AppError::Config(config::ConfigError::Message(format!(
                    "Provider '{}' is enabled but has no API key",
                    name
                ))));
            }
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                api_keys: Vec::new(),
            },
            storage: StorageConfig {
                base_path: default_storage_path(),
                download_timeout_ms: default_download_timeout(),
            },
            polling: PollingConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}
