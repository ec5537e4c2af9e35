//! Provider gateway: one adapter per external generation service

pub mod kie;
pub mod poyo;
pub mod registry;
pub mod traits;

pub use registry::ProviderRegistry;
pub use traits::{GenerationProvider, TaskHandle, TaskRequest, TaskState};
