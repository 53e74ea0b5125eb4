//! Tests for error types.

use super::*;

#[test]
fn test_backend_error_transience() {
    assert!(!BackendError::QueueNotFound {
        queue_name: "titan_0".to_string(),
    }
    .is_transient());

    assert!(!BackendError::ReservationExpired {
        message_id: "msg-1".to_string(),
    }
    .is_transient());

    assert!(BackendError::ConnectionFailed {
        message: "connection refused".to_string(),
    }
    .is_transient());

    assert!(BackendError::Unavailable {
        status: 503,
        message: "service unavailable".to_string(),
    }
    .should_retry());

    assert!(!BackendError::Unauthorized {
        message: "bad token".to_string(),
    }
    .should_retry());
}

#[test]
fn test_broker_error_transience_follows_backend() {
    let transient = BrokerError::Backend {
        operation: Operation::Reserve,
        tier: Priority::High,
        source: BackendError::ConnectionFailed {
            message: "timeout".to_string(),
        },
    };
    assert!(transient.is_transient());

    let not_reserved = BrokerError::TaskNotReserved {
        task_id: "task-1".to_string(),
    };
    assert!(!not_reserved.is_transient());

    let invalid = BrokerError::from(ValidationError::EmptyTask);
    assert!(!invalid.is_transient());
}

#[test]
fn test_backend_error_context_in_message() {
    let err = BrokerError::Backend {
        operation: Operation::Delete,
        tier: Priority::Medium,
        source: BackendError::Unavailable {
            status: 502,
            message: "bad gateway".to_string(),
        },
    };

    let text = err.to_string();
    assert!(text.contains("delete"), "missing operation: {}", text);
    assert!(text.contains("medium"), "missing tier: {}", text);
    assert!(matches!(
        err.backend_error(),
        Some(BackendError::Unavailable { status: 502, .. })
    ));
}

#[test]
fn test_validation_error_converts_to_configuration_error() {
    let err = ConfigurationError::from(ValidationError::InvalidFormat {
        field: "queue_name".to_string(),
        message: "only ASCII alphanumeric".to_string(),
    });

    match err {
        ConfigurationError::Invalid { message } => assert!(message.contains("queue_name")),
        other => panic!("Expected Invalid, got: {:?}", other),
    }
}
