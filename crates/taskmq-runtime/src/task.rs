//! Task model: the serializable unit of work moved through the queue tiers.

use crate::error::ValidationError;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Producer-assigned, globally unique task identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create task ID from an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate new random task ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get task ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Priority level of a task. Each level is served by its own queue tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Priorities in the order tiers are polled by a reservation
    pub const POLLING_ORDER: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Tier index used on the wire and in queue names
    pub fn tier_index(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl TryFrom<i32> for Priority {
    type Error = ValidationError;

    fn try_from(priority: i32) -> Result<Self, Self::Error> {
        match priority {
            0 => Ok(Self::Low),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            _ => Err(ValidationError::InvalidPriority { priority }),
        }
    }
}

impl From<Priority> for i32 {
    fn from(priority: Priority) -> Self {
        i32::from(priority.tier_index())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => {
                let priority = other.parse::<i32>().map_err(|_| ValidationError::InvalidFormat {
                    field: "priority".to_string(),
                    message: format!("'{}' is not a priority name or tier index", s),
                })?;
                Self::try_from(priority)
            }
        }
    }
}

// ============================================================================
// Task
// ============================================================================

/// A unit of work queued for execution.
///
/// Only `id`, `priority` and `delay` are meaningful to the broker; the
/// remaining fields are carried opaquely between producer and consumer.
/// `priority` stays in its raw wire form so that tasks produced elsewhere can
/// be decoded and then rejected by [`Task::validate`] instead of failing
/// deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: TaskId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Seconds before the task becomes visible to consumers
    #[serde(default)]
    pub delay: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Execution timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env_vars: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payload: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create new task with identifier and priority
    pub fn new(id: impl Into<TaskId>, priority: Priority) -> Self {
        Self {
            id: id.into(),
            priority: Some(priority.into()),
            ..Self::default()
        }
    }

    /// Delay visibility of the task. Sub-second parts are truncated.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = u32::try_from(delay.num_seconds().max(0)).unwrap_or(u32::MAX);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Set the application and route the task was created for
    pub fn with_route(mut self, app_name: impl Into<String>, path: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self.path = Some(path.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Check the task can be routed to a tier and return that tier's priority.
    ///
    /// A task without an identifier is treated as empty.
    pub fn validate(&self) -> Result<Priority, ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyTask);
        }

        let priority = self.priority.ok_or_else(|| ValidationError::MissingPriority {
            task_id: self.id.to_string(),
        })?;

        Priority::try_from(priority)
    }

    /// Visibility delay as a duration
    pub fn delay(&self) -> Duration {
        Duration::seconds(i64::from(self.delay))
    }

    /// Encode the task into the message body stored on the backend
    pub fn to_wire(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    /// Decode a task from a backend message body
    pub fn from_wire(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
