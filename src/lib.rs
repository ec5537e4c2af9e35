//! Token-Metered Media Generation Orchestrator
//!
//! Users spend token credits to request AI-generated media from one of
//! several interchangeable external providers. The service prices the
//! request, reserves the tokens, dispatches the provider task, polls it to
//! resolution, stores the artifact, and refunds on failure.

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod pricing;
pub mod provider;
pub mod storage;
pub mod supervisor;

pub use error::{AppError, Result};

use std::sync::Arc;

use ledger::Ledger;
use orchestrator::GenerationService;
use storage::Store;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn Store>,
    pub ledger: Ledger,
    pub generations: Arc<GenerationService>,
}
