//! Configuration management

pub mod settings;

pub use settings::{
    PollingConfig, ProviderSettings, ProvidersConfig, ServerConfig, Settings, StorageConfig,
};
