//! IronMQ v3 backend using the HTTP REST API.
//!
//! ## Endpoints
//!
//! All paths are relative to `{scheme}://{host}:{port}/3/projects/{project_id}`:
//!
//! - `PUT /queues/{queue}` creates (or updates) a queue
//! - `POST /queues/{queue}/messages` enqueues messages with a visibility delay
//! - `POST /queues/{queue}/reservations` long-polls and reserves messages
//! - `DELETE /queues/{queue}/messages/{id}` deletes a reserved message
//!
//! Requests authenticate with an `Authorization: OAuth {token}` header.
//!
//! ## Error classification
//!
//! IronMQ reports failures as an HTTP status plus a JSON body `{"msg": ...}`.
//! They are mapped to [`BackendError`] kinds here so callers never match on
//! response text:
//!
//! | Status | Body                        | Kind                    |
//! |--------|-----------------------------|-------------------------|
//! | 401    | any                         | `Unauthorized`          |
//! | 403    | mentions a reservation      | `ReservationExpired`    |
//! | 403    | other                       | `Unauthorized`          |
//! | 404    | mentions the queue          | `QueueNotFound`         |
//! | 404    | other                       | `MessageNotFound`       |
//! | 408, 429, 5xx | any                  | `Unavailable`           |
//! | other  | any                         | `ProviderError`         |

use crate::backend::{
    BackendType, MessageId, PollRequest, PolledMessage, QueueBackend, QueueName, ReservationId,
};
use crate::config::IronMqConfig;
use crate::error::{BackendError, ConfigurationError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

#[cfg(test)]
#[path = "ironmq_tests.rs"]
mod tests;

/// Request timeout on top of the long-poll wait
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct CreateQueueRequest {
    queue: QueueSettings,
}

#[derive(Serialize, Default)]
struct QueueSettings {}

#[derive(Serialize)]
struct EnqueueRequest<'a> {
    messages: [OutgoingMessage<'a>; 1],
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    body: &'a str,
    delay: u32,
}

#[derive(Deserialize)]
struct EnqueueResponse {
    ids: Vec<String>,
}

#[derive(Serialize)]
struct ReservationRequest {
    n: u32,
    timeout: u32,
    wait: u32,
    delete: bool,
}

#[derive(Deserialize)]
struct ReservationResponse {
    #[serde(default)]
    messages: Vec<ReservedMessage>,
}

#[derive(Deserialize)]
struct ReservedMessage {
    id: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    reservation_id: String,
    #[serde(default)]
    reserved_count: u32,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    reservation_id: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    msg: String,
}

// ============================================================================
// IronMQ Backend
// ============================================================================

/// IronMQ queue backend implementation.
///
/// The backend is stateless apart from its HTTP connection pool and can be
/// shared across tasks behind an `Arc`.
pub struct IronMqBackend {
    http_client: HttpClient,
    project_url: String,
    token: String,
}

impl IronMqBackend {
    /// Create new IronMQ backend
    pub fn new(config: &IronMqConfig) -> Result<Self, ConfigurationError> {
        if config.project_id.is_empty() || config.token.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "IronMQ project_id and token".to_string(),
            });
        }

        let http_client = HttpClient::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            project_url: config.project_url(),
            token: config.token.clone(),
        })
    }

    fn queue_url(&self, queue: &QueueName) -> String {
        format!(
            "{}/queues/{}",
            self.project_url,
            urlencoding::encode(queue.as_str())
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {}", self.token))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
    }

    /// Send a request and return the body of a successful response
    async fn execute(
        &self,
        request: RequestBuilder,
        queue: &QueueName,
        message_id: Option<&MessageId>,
    ) -> Result<String, BackendError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::ConnectionFailed {
                    message: format!("Request timeout: {}", e),
                }
            } else if e.is_connect() {
                BackendError::ConnectionFailed {
                    message: format!("Connection failed: {}", e),
                }
            } else {
                BackendError::ConnectionFailed {
                    message: format!("HTTP request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::ConnectionFailed {
                message: format!("Failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            return Err(classify_error(status, &body, queue, message_id));
        }

        trace!(status = status.as_u16(), queue = %queue, "IronMQ request succeeded");
        Ok(body)
    }
}

impl fmt::Debug for IronMqBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IronMqBackend")
            .field("project_url", &self.project_url)
            .finish()
    }
}

/// Map an unsuccessful IronMQ response to a backend error kind
fn classify_error(
    status: StatusCode,
    body: &str,
    queue: &QueueName,
    message_id: Option<&MessageId>,
) -> BackendError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.msg)
        .unwrap_or_else(|_| body.trim().to_string());
    let lowered = message.to_ascii_lowercase();
    let message_id = || message_id.map(|id| id.to_string()).unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized { message },
        StatusCode::FORBIDDEN if lowered.contains("reservation") => {
            BackendError::ReservationExpired {
                message_id: message_id(),
            }
        }
        StatusCode::FORBIDDEN => BackendError::Unauthorized { message },
        StatusCode::NOT_FOUND if lowered.contains("queue") => BackendError::QueueNotFound {
            queue_name: queue.to_string(),
        },
        StatusCode::NOT_FOUND => BackendError::MessageNotFound {
            message_id: message_id(),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            BackendError::Unavailable {
                status: status.as_u16(),
                message,
            }
        }
        s if s.is_server_error() => BackendError::Unavailable {
            status: s.as_u16(),
            message,
        },
        s => BackendError::ProviderError {
            provider: BackendType::IronMq.to_string(),
            code: s.as_u16().to_string(),
            message,
        },
    }
}

fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::InvalidResponse {
        message: e.to_string(),
    })
}

fn to_seconds(duration: Duration) -> u32 {
    u32::try_from(duration.num_seconds().max(0)).unwrap_or(u32::MAX)
}

#[async_trait]
impl QueueBackend for IronMqBackend {
    async fn ensure_queue(&self, queue: &QueueName) -> Result<(), BackendError> {
        let request = self.request(Method::PUT, self.queue_url(queue)).json(&CreateQueueRequest {
            queue: QueueSettings::default(),
        });

        self.execute(request, queue, None).await?;
        debug!(queue = %queue, "IronMQ queue ensured");
        Ok(())
    }

    async fn enqueue(
        &self,
        queue: &QueueName,
        body: Bytes,
        delay: Duration,
    ) -> Result<MessageId, BackendError> {
        let body = std::str::from_utf8(&body).map_err(|_| BackendError::InvalidPayload)?;
        let payload = EnqueueRequest {
            messages: [OutgoingMessage {
                body,
                delay: to_seconds(delay),
            }],
        };

        let url = format!("{}/messages", self.queue_url(queue));
        let request = self.request(Method::POST, url).json(&payload);
        let response: EnqueueResponse = parse(&self.execute(request, queue, None).await?)?;

        response
            .ids
            .into_iter()
            .next()
            .map(MessageId::new)
            .ok_or_else(|| BackendError::InvalidResponse {
                message: "enqueue response contained no message id".to_string(),
            })
    }

    async fn long_poll(
        &self,
        queue: &QueueName,
        request: &PollRequest,
    ) -> Result<Vec<PolledMessage>, BackendError> {
        let payload = ReservationRequest {
            n: request.max_messages,
            timeout: request.reservation_timeout_seconds(),
            wait: request.wait_seconds(),
            delete: request.auto_delete,
        };

        let url = format!("{}/reservations", self.queue_url(queue));
        let http_request = self
            .request(Method::POST, url)
            .timeout(std::time::Duration::from_secs(
                u64::from(payload.wait) + REQUEST_TIMEOUT_SECONDS,
            ))
            .json(&payload);

        let response: ReservationResponse =
            parse(&self.execute(http_request, queue, None).await?)?;

        Ok(response
            .messages
            .into_iter()
            .map(|m| PolledMessage {
                id: MessageId::new(m.id),
                reservation_id: ReservationId::new(m.reservation_id),
                body: Bytes::from(m.body),
                reserved_count: m.reserved_count,
            })
            .collect())
    }

    async fn delete(
        &self,
        queue: &QueueName,
        message_id: &MessageId,
        reservation_id: &ReservationId,
    ) -> Result<(), BackendError> {
        let url = format!(
            "{}/messages/{}",
            self.queue_url(queue),
            urlencoding::encode(message_id.as_str())
        );
        let request = self.request(Method::DELETE, url).json(&DeleteRequest {
            reservation_id: reservation_id.as_str(),
        });

        self.execute(request, queue, Some(message_id)).await?;
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::IronMq
    }
}
