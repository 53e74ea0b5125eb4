//! Queue backend implementations.
//!
//! This module contains concrete implementations of the
//! [`QueueBackend`](crate::backend::QueueBackend) trait.

pub mod ironmq;
pub mod memory;

pub use ironmq::IronMqBackend;
pub use memory::InMemoryBackend;

use crate::backend::QueueBackend;
use crate::config::BackendConfig;
use crate::error::ConfigurationError;
use std::sync::Arc;

/// Create the backend described by `config`
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn QueueBackend>, ConfigurationError> {
    match config {
        BackendConfig::IronMq(iron) => Ok(Arc::new(IronMqBackend::new(iron)?)),
        BackendConfig::InMemory(memory) => Ok(Arc::new(InMemoryBackend::new(memory.clone()))),
    }
}
