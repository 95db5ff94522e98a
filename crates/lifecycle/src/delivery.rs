//! Completion response delivery.
//!
//! [`ResponseDelivery`] PUTs a JSON-encoded [`CompletionResponse`] to the
//! lifecycle's pre-signed response URL.  A failed attempt is retried after
//! each delay in the retry schedule (1 s, 2 s, 4 s by default); the error
//! of the last attempt is returned once the schedule runs out.

use std::time::Duration;

use crate::error::LifecycleError;
use crate::response::CompletionResponse;

/// Pauses between attempts.  One attempt more than there are delays.
const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers completion responses to the invoking lifecycle.
pub struct ResponseDelivery {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl ResponseDelivery {
    pub fn new() -> Result<Self, LifecycleError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        })
    }

    /// Replace the pauses between attempts.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver `response` to `url`, retrying failed attempts.
    pub async fn deliver(&self, url: &str, response: &CompletionResponse) -> Result<(), LifecycleError> {
        let body = serde_json::to_string(response)?;
        let mut pauses = self.retry_delays.iter();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.try_send(url, &body).await {
                Ok(()) => {
                    tracing::info!(attempt, status = ?response.status, "Completion response delivered");
                    return Ok(());
                }
                Err(e) => e,
            };

            let Some(pause) = pauses.next() else {
                tracing::error!(attempt, error = %err, "Giving up on completion response delivery");
                return Err(err);
            };
            tracing::warn!(
                attempt,
                retry_in_ms = pause.as_millis() as u64,
                error = %err,
                "Completion response delivery failed",
            );
            tokio::time::sleep(*pause).await;
        }
    }

    /// Single PUT.  Pre-signed URLs are signed without a content type, so
    /// the header is sent empty.
    async fn try_send(&self, url: &str, body: &str) -> Result<(), LifecycleError> {
        let response = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .body(body.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LifecycleError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}
