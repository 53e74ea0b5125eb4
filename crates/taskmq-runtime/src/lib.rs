//! # TaskMQ Runtime
//!
//! Client for a priority-tiered, reservation-based task queue.
//!
//! Tasks carry one of three priority levels. Each level is served by its own
//! backend queue named `<base>_<tier index>`, and consumers always receive the
//! highest-priority visible task first. A reserved task stays invisible to
//! other consumers until it is deleted or its reservation times out.
//!
//! This library provides:
//! - The [`TaskBroker`] with push, reserve and delete operations
//! - A [`QueueBackend`] trait with IronMQ and in-memory implementations
//! - Layered configuration from files, environment variables and URLs
//!
//! ## Module Organization
//!
//! - [`task`] - Task model, identifiers and priority levels
//! - [`lease`] - Registry of reservations held by this client
//! - [`tier`] - Mapping from priority to backend queue
//! - [`broker`] - Push, reserve and delete across the tiers
//! - [`backend`] - Backend trait and its request/response types
//! - [`providers`] - Backend implementations
//! - [`config`] - Broker and backend configuration
//! - [`error`] - Error types for all broker operations

pub mod backend;
pub mod broker;
pub mod config;
pub mod error;
pub mod lease;
pub mod providers;
pub mod task;
pub mod tier;

// Re-export commonly used types at crate root for convenience
pub use backend::{
    BackendType, MessageId, PollRequest, PolledMessage, QueueBackend, QueueName, ReservationId,
};
pub use broker::TaskBroker;
pub use config::{BackendConfig, BrokerConfig, HttpScheme, InMemoryConfig, IronMqConfig};
pub use error::{BackendError, BrokerError, ConfigurationError, Operation, ValidationError};
pub use lease::{Lease, LeaseRegistry};
pub use providers::{create_backend, InMemoryBackend, IronMqBackend};
pub use task::{Priority, Task, TaskId};
pub use tier::{tier_queue_name, TierSet, DEFAULT_QUEUE_NAME};
