//! Registry mapping provider keys to adapter instances
//!
//! Model configs bind to a provider by key; an unrecognized key is an error
//! rather than a fallback to some default adapter, so a misconfigured model
//! fails its generation instead of silently running on the wrong service.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::{AppError, Result};
use crate::provider::traits::GenerationProvider;

/// Explicit provider lookup, populated at startup
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn GenerationProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own name
    pub fn register(&self, provider: Arc<dyn GenerationProvider>) {
        let name = provider.name().to_string();
        info!(provider = %name, "Registered generation provider");
        self.providers.write().insert(name, provider);
    }

    /// Look up an adapter by key
    pub fn get(&self, key: &str) -> Result<Arc<dyn GenerationProvider>> {
        self.providers
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::ProviderNotFound(key.to_string()))
    }

    /// Registered provider keys
    pub fn names(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }
}
