//! Error types for broker and backend operations.

use crate::task::Priority;
use std::fmt;
use thiserror::Error;

/// Error type returned by every [`TaskBroker`](crate::TaskBroker) operation
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Task '{task_id}' is not reserved by this client")]
    TaskNotReserved { task_id: String },

    #[error("{operation} on {tier} priority tier failed: {source}")]
    Backend {
        operation: Operation,
        tier: Priority,
        #[source]
        source: BackendError,
    },

    #[error("Task serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl BrokerError {
    /// Check if the caller may retry the failed operation as-is
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidInput(_) => false,
            Self::TaskNotReserved { .. } => false,
            Self::Backend { source, .. } => source.is_transient(),
            Self::Serialization(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Get the backend error behind this failure, if any
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Backend { source, .. } => Some(source),
            Self::Configuration(ConfigurationError::QueueVerification { source, .. }) => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Broker operation that issued a backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Push,
    Reserve,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Reserve => write!(f, "reserve"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors reported by a queue backend.
///
/// Adapters classify transport and service failures into these kinds so the
/// broker never inspects error text.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Reservation has expired for message {message_id}")]
    ReservationExpired { message_id: String },

    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Queue '{queue_name}' is full ({capacity} messages)")]
    QueueFull { queue_name: String, capacity: usize },

    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Backend unavailable (HTTP {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Message body is not valid UTF-8")]
    InvalidPayload,

    #[error("Invalid response from backend: {message}")]
    InvalidResponse { message: String },

    #[error("Provider error ({provider}): {code} - {message}")]
    ProviderError {
        provider: String,
        code: String,
        message: String,
    },
}

impl BackendError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false,
            Self::ReservationExpired { .. } => false,
            Self::MessageNotFound { .. } => false,
            Self::QueueFull { .. } => true,
            Self::Unauthorized { .. } => false,
            Self::ConnectionFailed { .. } => true,
            Self::Unavailable { .. } => true,
            Self::InvalidPayload => false,
            Self::InvalidResponse { .. } => false,
            Self::ProviderError { .. } => false,
        }
    }

    /// Check if error should be retried
    pub fn should_retry(&self) -> bool {
        self.is_transient()
    }
}

/// Validation errors for tasks and identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task is empty")]
    EmptyTask,

    #[error("Task '{task_id}' has no priority")]
    MissingPriority { task_id: String },

    #[error("Priority {priority} is outside the tier range 0..=2")]
    InvalidPriority { priority: i32 },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

/// Configuration and construction errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },

    #[error("Unsupported backend scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("Could not verify queue '{queue_name}': {source}")]
    QueueVerification {
        queue_name: String,
        #[source]
        source: BackendError,
    },
}

impl From<ValidationError> for ConfigurationError {
    fn from(err: ValidationError) -> Self {
        Self::Invalid {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
