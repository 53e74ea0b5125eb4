//! Integration tests for the broker over the IronMQ HTTP backend
//!
//! A `wiremock` server stands in for IronMQ. These tests verify:
//! - Construction verifies the lowest tier's queue
//! - Push, reserve and delete map onto the REST endpoints
//! - Missing tier queues are skipped during a reservation
//! - Expired reservations and rejected credentials surface as broker errors

use serde_json::json;
use taskmq_runtime::{
    BackendError, BrokerConfig, BrokerError, ConfigurationError, Operation, Priority, Task,
    TaskBroker,
};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "proj123";

fn queue_path(queue: &str) -> String {
    format!("/3/projects/{}/queues/{}", PROJECT, queue)
}

fn broker_url(server: &MockServer) -> String {
    format!(
        "ironmq+http://{}:secret-token@{}/jobs",
        PROJECT,
        server.address()
    )
}

async fn mount_queue_creation(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path(queue_path("jobs_0")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queue": {"name": "jobs_0", "project_id": PROJECT}
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> TaskBroker {
    let config = BrokerConfig::from_url(&broker_url(server))
        .unwrap()
        .with_reserve_wait(chrono::Duration::zero());
    TaskBroker::from_config(&config).await.unwrap()
}

async fn mount_missing_queue(server: &MockServer, queue: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{}/reservations", queue_path(queue))))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"msg": "Queue not found"})))
        .mount(server)
        .await;
}

async fn mount_reservation(server: &MockServer, queue: &str, task: &Task) {
    Mock::given(method("POST"))
        .and(path(format!("{}/reservations", queue_path(queue))))
        .and(body_json(json!({"n": 1, "timeout": 60, "wait": 0, "delete": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{
                "id": "msg-7",
                "body": serde_json::to_string(task).unwrap(),
                "reservation_id": "res-7",
                "reserved_count": 1
            }]
        })))
        .mount(server)
        .await;
}

/// Verify the full push, reserve, delete flow against the REST API
#[tokio::test]
async fn test_lifecycle_over_ironmq() {
    let server = MockServer::start().await;
    mount_queue_creation(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/messages", queue_path("jobs_1"))))
        .and(body_partial_json(json!({"messages": [{"delay": 5}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ids": ["msg-7"],
            "msg": "Messages put on queue."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let broker = connect(&server).await;
    let pushed = broker
        .push(
            Task::new("t1", Priority::Medium)
                .with_delay(chrono::Duration::seconds(5))
                .with_payload("work"),
        )
        .await
        .unwrap();

    mount_missing_queue(&server, "jobs_2").await;
    mount_reservation(&server, "jobs_1", &pushed).await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/messages/msg-7", queue_path("jobs_1"))))
        .and(body_json(json!({"reservation_id": "res-7"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "Deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let reserved = broker.reserve().await.unwrap().expect("task should be reserved");
    assert_eq!(reserved, pushed);

    broker.delete(&reserved).await.unwrap();
    assert_eq!(broker.outstanding_leases(), 0);
}

/// Verify an expired reservation reported by IronMQ becomes TaskNotReserved
#[tokio::test]
async fn test_expired_reservation_over_ironmq() {
    let server = MockServer::start().await;
    mount_queue_creation(&server).await;
    let broker = connect(&server).await;

    let task = Task::new("t1", Priority::High);
    mount_reservation(&server, "jobs_2", &task).await;
    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"msg": "Reservation has timed out"})),
        )
        .mount(&server)
        .await;

    let reserved = broker.reserve().await.unwrap().unwrap();
    let result = broker.delete(&reserved).await;

    assert!(matches!(result, Err(BrokerError::TaskNotReserved { .. })));
}

/// Verify a server failure during reservation aborts with tier context
#[tokio::test]
async fn test_server_failure_during_reserve() {
    let server = MockServer::start().await;
    mount_queue_creation(&server).await;
    let broker = connect(&server).await;

    mount_missing_queue(&server, "jobs_2").await;
    Mock::given(method("POST"))
        .and(path(format!("{}/reservations", queue_path("jobs_1"))))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"msg": "internal error"})))
        .mount(&server)
        .await;

    let err = broker.reserve().await.unwrap_err();

    assert!(err.is_transient());
    assert!(matches!(
        err,
        BrokerError::Backend {
            operation: Operation::Reserve,
            tier: Priority::Medium,
            source: BackendError::Unavailable { status: 500, .. },
        }
    ));
}

/// Verify rejected credentials fail construction
#[tokio::test]
async fn test_rejected_credentials_fail_connect() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"msg": "Invalid project/token combination"})),
        )
        .mount(&server)
        .await;

    let result = TaskBroker::connect(&broker_url(&server)).await;

    assert!(matches!(
        result,
        Err(BrokerError::Configuration(
            ConfigurationError::QueueVerification {
                source: BackendError::Unauthorized { .. },
                ..
            }
        ))
    ));
}
