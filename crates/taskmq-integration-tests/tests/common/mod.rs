//! Common test utilities for taskmq integration tests
//!
//! This module provides:
//! - Brokers over a shared in-memory backend
//! - Helpers for draining tiers and building task fixtures

use chrono::Duration;
use std::sync::Arc;
use taskmq_runtime::{BrokerConfig, InMemoryBackend, Priority, Task, TaskBroker};

/// Configuration that never waits on an empty tier
#[allow(dead_code)]
pub fn fast_config() -> BrokerConfig {
    BrokerConfig::in_memory().with_reserve_wait(Duration::zero())
}

/// Create a broker over `backend`, so several brokers can share one queue
#[allow(dead_code)]
pub async fn broker_on(backend: &Arc<InMemoryBackend>, config: &BrokerConfig) -> TaskBroker {
    TaskBroker::new(backend.clone(), config)
        .await
        .expect("Setup: broker construction should succeed")
}

/// Create a broker over its own in-memory backend
#[allow(dead_code)]
pub async fn standalone_broker() -> TaskBroker {
    TaskBroker::from_config(&fast_config())
        .await
        .expect("Setup: broker construction should succeed")
}

/// Reserve and delete tasks until none are left, returning them in order
#[allow(dead_code)]
pub async fn drain(broker: &TaskBroker) -> Vec<Task> {
    let mut drained = Vec::new();
    while let Some(task) = broker.reserve().await.expect("reserve should succeed") {
        broker.delete(&task).await.expect("delete should succeed");
        drained.push(task);
    }
    drained
}

/// Task fixture named after its priority and sequence number
#[allow(dead_code)]
pub fn numbered_task(priority: Priority, n: usize) -> Task {
    Task::new(format!("{}-{}", priority, n), priority).with_payload(format!("payload {}", n))
}
