use anyhow::Result;
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;

/// Trait for JetStream publisher operations
/// Abstracts the raw publish-and-ack round trip so the hub transport can be
/// exercised without a NATS server
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JetStreamPublisher: Send + Sync {
    /// Publish a message with headers and await the JetStream acknowledgment
    async fn publish_with_headers(
        &self,
        subject: String,
        headers: HeaderMap,
        payload: Bytes,
    ) -> Result<()>;

    /// Flush buffered protocol data to the server
    async fn flush(&self) -> Result<()>;
}
