//! Queue tier selection: one backend queue per priority level.

use crate::backend::{QueueBackend, QueueName};
use crate::error::{ConfigurationError, ValidationError};
use crate::task::Priority;
use tracing::debug;

/// Base queue name used when none is configured
pub const DEFAULT_QUEUE_NAME: &str = "titan";

/// Derive the queue name serving `priority` from a base name
pub fn tier_queue_name(base_name: &str, priority: Priority) -> String {
    format!("{}_{}", base_name, priority.tier_index())
}

/// The fixed set of queues backing the priority tiers.
///
/// Built once at broker construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSet {
    base_name: String,
    low: QueueName,
    medium: QueueName,
    high: QueueName,
}

impl TierSet {
    /// Derive the tier queues for `base_name`
    pub fn new(base_name: &str) -> Result<Self, ValidationError> {
        let queue = |priority| QueueName::new(tier_queue_name(base_name, priority));

        Ok(Self {
            base_name: base_name.to_string(),
            low: queue(Priority::Low)?,
            medium: queue(Priority::Medium)?,
            high: queue(Priority::High)?,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Queue serving `priority`
    pub fn queue_for(&self, priority: Priority) -> &QueueName {
        match priority {
            Priority::Low => &self.low,
            Priority::Medium => &self.medium,
            Priority::High => &self.high,
        }
    }

    /// Tiers in reservation order, highest priority first
    pub fn polling_order(&self) -> impl Iterator<Item = (Priority, &QueueName)> + '_ {
        Priority::POLLING_ORDER
            .into_iter()
            .map(move |priority| (priority, self.queue_for(priority)))
    }

    /// Check the backend is reachable by creating the lowest tier's queue.
    ///
    /// The other tiers are created lazily by the backend on first push.
    pub async fn verify(&self, backend: &dyn QueueBackend) -> Result<(), ConfigurationError> {
        let queue = self.queue_for(Priority::Low);
        debug!(queue = %queue, backend = %backend.backend_type(), "Verifying queue backend");

        backend
            .ensure_queue(queue)
            .await
            .map_err(|source| ConfigurationError::QueueVerification {
                queue_name: queue.to_string(),
                source,
            })
    }
}

#[cfg(test)]
#[path = "tier_tests.rs"]
mod tests;
