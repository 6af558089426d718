//! Transport seam for the batch endpoint.
//!
//! [`HttpTransport`] is the reqwest implementation. Tests and embedders supply their
//! own [`BatchTransport`] to script server responses.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::batch::BatchSaveRequest;
use super::error::{SaveError, SaveResult};
use crate::config::ApiConfig;

/// Raw reply of one batch call: HTTP status plus the decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        TransportResponse { status, body }
    }

    pub fn ok(body: Value) -> Self {
        TransportResponse { status: 200, body }
    }

    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Both a non-2xx status and `success: false` count as failure.
    pub fn is_success(&self) -> bool {
        self.is_success_status()
            && self
                .body
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}

#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// URL reported in diagnostics.
    fn endpoint(&self) -> String;

    /// Submit one batch request. Only network-level failures are errors here; a
    /// delivered failure envelope comes back as a normal response.
    async fn post_batch(&self, request: &BatchSaveRequest) -> SaveResult<TransportResponse>;
}

/// JSON POST to `{base_url}{batch_path}`.
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> SaveResult<Self> {
        let mut builder = Client::builder();
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.request_timeout_ms));
        }
        let client = builder.build()?;
        Ok(HttpTransport {
            client,
            url: config.batch_url(),
        })
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn post_batch(&self, request: &BatchSaveRequest) -> SaveResult<TransportResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| SaveError::Transport {
                message: format!("Failed to reach {}: {e}", self.url),
            })?;

        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(TransportResponse::new(status.as_u16(), body)),
            Err(e) if status.is_success() => Err(SaveError::Serialization {
                message: format!("Malformed batch response: {e}"),
            }),
            Err(_) => Err(SaveError::Transport {
                message: format!("Server returned {status}: {}", truncate(&text, 200)),
            }),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
