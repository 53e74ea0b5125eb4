//! In-memory queue backend for testing and development.
//!
//! This backend provides a fully functional in-process queue that:
//! - Creates queues lazily on first enqueue
//! - Honours visibility delays and reservation timeouts
//! - Redelivers messages whose reservation expired
//! - Supports long-polling with a bounded wait
//!
//! It is intended for unit tests of broker consumers and as a reference for
//! the error contract remote adapters must follow.

use crate::backend::{
    BackendType, MessageId, PollRequest, PolledMessage, QueueBackend, QueueName, ReservationId,
};
use crate::config::InMemoryConfig;
use crate::error::BackendError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::time::Instant;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A message stored in a queue with its delivery state
struct StoredMessage {
    id: MessageId,
    body: Bytes,
    available_at: Instant,
    reserved_count: u32,
    reservation: Option<Reservation>,
}

struct Reservation {
    id: ReservationId,
    expires_at: Instant,
}

impl StoredMessage {
    fn is_visible(&self, now: Instant) -> bool {
        if now < self.available_at {
            return false;
        }
        match &self.reservation {
            Some(reservation) => now >= reservation.expires_at,
            None => true,
        }
    }

    /// Instant at which the message next becomes visible
    fn visible_at(&self) -> Instant {
        match &self.reservation {
            Some(reservation) => reservation.expires_at.max(self.available_at),
            None => self.available_at,
        }
    }
}

#[derive(Default)]
struct InMemoryQueue {
    messages: VecDeque<StoredMessage>,
}

impl InMemoryQueue {
    /// Reserve up to `max` visible messages in FIFO order
    fn reserve(&mut self, request: &PollRequest, now: Instant) -> Vec<PolledMessage> {
        let expires_at = now + to_std(request.reservation_timeout);
        let mut reserved = Vec::new();
        let mut index = 0;

        while index < self.messages.len() && reserved.len() < request.max_messages as usize {
            if !self.messages[index].is_visible(now) {
                index += 1;
                continue;
            }

            if request.auto_delete {
                if let Some(mut message) = self.messages.remove(index) {
                    message.reserved_count += 1;
                    reserved.push(PolledMessage {
                        id: message.id,
                        reservation_id: ReservationId::generate(),
                        body: message.body,
                        reserved_count: message.reserved_count,
                    });
                }
                continue;
            }

            let message = &mut self.messages[index];
            let reservation_id = ReservationId::generate();
            message.reserved_count += 1;
            message.reservation = Some(Reservation {
                id: reservation_id.clone(),
                expires_at,
            });
            reserved.push(PolledMessage {
                id: message.id.clone(),
                reservation_id,
                body: message.body.clone(),
                reserved_count: message.reserved_count,
            });
            index += 1;
        }

        reserved
    }

    fn next_visible_at(&self) -> Option<Instant> {
        self.messages.iter().map(StoredMessage::visible_at).min()
    }
}

fn to_std(duration: Duration) -> std::time::Duration {
    duration.to_std().unwrap_or_default()
}

// ============================================================================
// InMemoryBackend
// ============================================================================

/// In-memory queue backend implementation
pub struct InMemoryBackend {
    queues: Mutex<HashMap<QueueName, InMemoryQueue>>,
    changed: Notify,
    config: InMemoryConfig,
}

impl InMemoryBackend {
    /// Create new in-memory backend with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            changed: Notify::new(),
            config,
        }
    }

    /// Number of messages held in a queue, reserved or not
    pub fn queue_len(&self, queue: &QueueName) -> usize {
        self.lock()
            .get(queue)
            .map(|q| q.messages.len())
            .unwrap_or(0)
    }

    /// Check whether a queue has been created
    pub fn has_queue(&self, queue: &QueueName) -> bool {
        self.lock().contains_key(queue)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueueName, InMemoryQueue>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueBackend for InMemoryBackend {
    async fn ensure_queue(&self, queue: &QueueName) -> Result<(), BackendError> {
        self.lock().entry(queue.clone()).or_default();
        Ok(())
    }

    async fn enqueue(
        &self,
        queue: &QueueName,
        body: Bytes,
        delay: Duration,
    ) -> Result<MessageId, BackendError> {
        let id = MessageId::generate();
        {
            let mut queues = self.lock();
            let stored = queues.entry(queue.clone()).or_default();
            if stored.messages.len() >= self.config.max_queue_size {
                return Err(BackendError::QueueFull {
                    queue_name: queue.to_string(),
                    capacity: self.config.max_queue_size,
                });
            }

            stored.messages.push_back(StoredMessage {
                id: id.clone(),
                body,
                available_at: Instant::now() + to_std(delay),
                reserved_count: 0,
                reservation: None,
            });
        }

        self.changed.notify_waiters();
        Ok(id)
    }

    async fn long_poll(
        &self,
        queue: &QueueName,
        request: &PollRequest,
    ) -> Result<Vec<PolledMessage>, BackendError> {
        let deadline = Instant::now() + to_std(request.wait);
        if request.max_messages == 0 {
            return Ok(Vec::new());
        }

        loop {
            // Register interest before inspecting the queue so an enqueue
            // between the check and the wait is not missed.
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            let wake_at = {
                let now = Instant::now();
                let mut queues = self.lock();
                let stored =
                    queues
                        .get_mut(queue)
                        .ok_or_else(|| BackendError::QueueNotFound {
                            queue_name: queue.to_string(),
                        })?;

                let reserved = stored.reserve(request, now);
                if !reserved.is_empty() || now >= deadline {
                    return Ok(reserved);
                }

                stored
                    .next_visible_at()
                    .map_or(deadline, |at| at.min(deadline))
            };

            tokio::select! {
                _ = &mut changed => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(
        &self,
        queue: &QueueName,
        message_id: &MessageId,
        reservation_id: &ReservationId,
    ) -> Result<(), BackendError> {
        let now = Instant::now();
        let mut queues = self.lock();
        let stored = queues
            .get_mut(queue)
            .ok_or_else(|| BackendError::QueueNotFound {
                queue_name: queue.to_string(),
            })?;

        let index = stored
            .messages
            .iter()
            .position(|m| &m.id == message_id)
            .ok_or_else(|| BackendError::MessageNotFound {
                message_id: message_id.to_string(),
            })?;

        let held = match &stored.messages[index].reservation {
            Some(reservation) => &reservation.id == reservation_id && now < reservation.expires_at,
            None => false,
        };
        if !held {
            return Err(BackendError::ReservationExpired {
                message_id: message_id.to_string(),
            });
        }

        stored.messages.remove(index);
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::InMemory
    }
}
