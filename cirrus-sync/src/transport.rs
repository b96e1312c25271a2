//! Transport layer abstraction.
//!
//! The orchestrators only need one call: send a JSON request to an API path
//! and get back a status code and a JSON body. Retries, timeouts and signing
//! belong to the implementation; the core sees one logical outcome per call.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// HTTP method of a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Status and decoded body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// `Null` when the response had no body.
    pub body: JsonValue,
}

impl TransportResponse {
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body of a 2xx response, or the error it describes.
    ///
    /// Error bodies look like `{"code": "E404001", "error": "No data available."}`.
    pub fn into_result(self) -> SyncResult<JsonValue> {
        if self.is_success() {
            return Ok(self.body);
        }
        let code = self
            .body
            .get("code")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        let message = self
            .body
            .get("error")
            .and_then(JsonValue::as_str)
            .unwrap_or("no error message")
            .to_string();

        Err(match self.status {
            404 => SyncError::NotFound(message),
            409 => SyncError::Conflict(format!("{code}: {message}")),
            status => SyncError::Server {
                status,
                code,
                message,
            },
        })
    }
}

/// Sends requests to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request against an API path relative to the versioned root.
    async fn perform_request(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
    ) -> SyncResult<TransportResponse>;
}

/// A scripted transport for testing.
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::{Notify, Semaphore};

    /// A request as seen by the mock.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub method: Method,
        pub path: String,
        pub body: Option<JsonValue>,
    }

    /// Records requests and answers them from a queue of scripted outcomes.
    ///
    /// A held mock parks every request after recording it until
    /// [`MockTransport::release`] is called, which lets tests observe a
    /// round trip while it is in flight.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        outcomes: Mutex<VecDeque<SyncResult<TransportResponse>>>,
        requests: Mutex<Vec<RecordedRequest>>,
        recorded: Notify,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockTransport {
        /// Creates a mock that answers immediately.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a mock that parks requests until released.
        pub fn held() -> Self {
            Self {
                gate: Some(Arc::new(Semaphore::new(0))),
                ..Self::default()
            }
        }

        /// Queues a response.
        pub fn push_response(&self, status: u16, body: JsonValue) {
            self.outcomes
                .lock()
                .push_back(Ok(TransportResponse::new(status, body)));
        }

        /// Queues a transport failure.
        pub fn push_error(&self, error: SyncError) {
            self.outcomes.lock().push_back(Err(error));
        }

        /// Lets `n` parked (or future) requests proceed.
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        /// Requests recorded so far.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        /// Waits until at least `n` requests have been recorded.
        pub async fn wait_for_requests(&self, n: usize) {
            loop {
                let notified = self.recorded.notified();
                if self.request_count() >= n {
                    return;
                }
                notified.await;
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn perform_request(
            &self,
            method: Method,
            path: &str,
            body: Option<JsonValue>,
        ) -> SyncResult<TransportResponse> {
            self.requests.lock().push(RecordedRequest {
                method,
                path: path.to_string(),
                body,
            });
            self.recorded.notify_waiters();

            if let Some(gate) = &self.gate {
                gate.acquire()
                    .await
                    .map_err(|_| SyncError::Transport("mock gate closed".into()))?
                    .forget();
            }

            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(SyncError::Transport("no scripted response".into())))
        }
    }

    /// Lets tests share one mock between a backend and assertions.
    #[async_trait]
    impl Transport for Arc<MockTransport> {
        async fn perform_request(
            &self,
            method: Method,
            path: &str,
            body: Option<JsonValue>,
        ) -> SyncResult<TransportResponse> {
            self.as_ref().perform_request(method, path, body).await
        }
    }
}
