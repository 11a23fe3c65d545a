use crate::errors::{DeliveryError, TransportError};
use crate::snapshot::Snapshot;
use crate::wire;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Moves one encoded body to the collector. A returned `Ok` means the
/// transport completed; the collector's reply is not interpreted.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, body: &str) -> Result<(), TransportError>;
}

/// HTTP POST transport with connect and overall timeouts.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, body: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.to_owned())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "collector answered with non-success status");
        }
        Ok(())
    }
}

/// Fixed-count, fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

pub struct Reporter {
    transport: Box<dyn Transport>,
    policy: RetryPolicy,
}

impl Reporter {
    pub fn new(transport: Box<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Encode and deliver a snapshot, retrying transport failures up to the
    /// policy's attempt budget with a fixed pause in between.
    pub async fn send(&self, snapshot: &Snapshot) -> Result<(), DeliveryError> {
        let body = wire::encode(snapshot)?;
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            tracing::info!(attempt, max_attempts, "delivering snapshot");
            match self.transport.deliver(&body).await {
                Ok(()) => {
                    tracing::info!(attempt, "snapshot delivered");
                    return Ok(());
                }
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        error = %e,
                        "delivery failed, retrying {}/{} in {:?}",
                        attempt,
                        max_attempts,
                        self.policy.delay
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempts = attempt, "delivery attempts exhausted");
                    return Err(DeliveryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
            }
        }
    }
}
