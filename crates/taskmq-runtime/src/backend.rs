//! Backend port: the primitives a durable queue service must provide.
//!
//! The broker only talks to a backend through [`QueueBackend`]. Adapters in
//! [`crate::providers`] implement it for concrete services and classify their
//! failures into [`BackendError`] kinds.

use crate::error::{BackendError, ValidationError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Validated queue name with length and character restrictions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > 255 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-255 characters".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, underscores and dots allowed"
                    .to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Backend-issued message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate new random message ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-issued token proving a message is currently reserved by the holder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(String);

impl ReservationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Poll Types
// ============================================================================

/// Parameters of a single long-poll request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    /// Maximum number of messages to reserve
    pub max_messages: u32,
    /// How long to wait for a message before returning empty
    pub wait: Duration,
    /// How long returned messages stay reserved before redelivery
    pub reservation_timeout: Duration,
    /// Delete messages as they are returned instead of reserving them
    pub auto_delete: bool,
}

impl PollRequest {
    /// Reserve a single message, waiting up to `wait`
    pub fn single(wait: Duration, reservation_timeout: Duration) -> Self {
        Self {
            max_messages: 1,
            wait,
            reservation_timeout,
            auto_delete: false,
        }
    }

    /// Wait budget in whole seconds, as sent to the backend
    pub fn wait_seconds(&self) -> u32 {
        u32::try_from(self.wait.num_seconds().max(0)).unwrap_or(u32::MAX)
    }

    pub fn reservation_timeout_seconds(&self) -> u32 {
        u32::try_from(self.reservation_timeout.num_seconds().max(0)).unwrap_or(u32::MAX)
    }
}

/// A message reserved by a long-poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolledMessage {
    pub id: MessageId,
    pub reservation_id: ReservationId,
    pub body: Bytes,
    /// Number of times the message has been reserved, including this one
    pub reserved_count: u32,
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Kind of backend behind a [`QueueBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendType {
    IronMq,
    InMemory,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IronMq => write!(f, "IronMQ"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// Interface implemented by durable queue services
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Create the queue if it does not exist. Must be idempotent.
    async fn ensure_queue(&self, queue: &QueueName) -> Result<(), BackendError>;

    /// Append a message that becomes visible after `delay`
    async fn enqueue(
        &self,
        queue: &QueueName,
        body: Bytes,
        delay: Duration,
    ) -> Result<MessageId, BackendError>;

    /// Reserve up to `request.max_messages`, waiting up to `request.wait`.
    ///
    /// Returns [`BackendError::QueueNotFound`] if the queue was never created.
    async fn long_poll(
        &self,
        queue: &QueueName,
        request: &PollRequest,
    ) -> Result<Vec<PolledMessage>, BackendError>;

    /// Delete a reserved message.
    ///
    /// Returns [`BackendError::ReservationExpired`] if the reservation is no
    /// longer held.
    async fn delete(
        &self,
        queue: &QueueName,
        message_id: &MessageId,
        reservation_id: &ReservationId,
    ) -> Result<(), BackendError>;

    /// Get backend type
    fn backend_type(&self) -> BackendType;
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
