//! Lease registry: which reserved tasks this client may delete.

use crate::backend::{MessageId, ReservationId};
use crate::task::TaskId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Backend handles that authorize deleting one reserved message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    message_id: MessageId,
    reservation_id: ReservationId,
}

impl Lease {
    pub fn new(message_id: MessageId, reservation_id: ReservationId) -> Self {
        Self {
            message_id,
            reservation_id,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn reservation_id(&self) -> &ReservationId {
        &self.reservation_id
    }
}

/// Concurrency-safe map from task ID to its live lease.
///
/// `record` and `consume` are the only mutations. The lock is held for the map
/// operation only and is never held across an await point.
#[derive(Debug, Default)]
pub struct LeaseRegistry {
    leases: Mutex<HashMap<TaskId, Lease>>,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the lease for a task, returning any lease it replaced
    pub fn record(&self, task_id: TaskId, lease: Lease) -> Option<Lease> {
        self.lock().insert(task_id, lease)
    }

    /// Remove and return the lease for a task
    pub fn consume(&self, task_id: &TaskId) -> Option<Lease> {
        self.lock().remove(task_id)
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.lock().contains_key(task_id)
    }

    /// Number of live leases
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Lease>> {
        self.leases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
