use crate::domain::{EventBatch, HubTransport, TransportError};
use crate::nats::traits::JetStreamPublisher;
use async_nats::HeaderMap;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Capacity held back in every batch for the `traceparent` and `tracestate`
/// headers injected at send time
pub const TRACE_CONTEXT_RESERVE_BYTES: usize = 128;

/// Message hub transport backed by a NATS JetStream stream.
///
/// Events are published on `<hub_name>.<topic>`; properties become message
/// headers. A batch is sent by publishing its events in order and awaiting
/// each acknowledgment, stopping at the first failure.
pub struct JetStreamHubTransport {
    publisher: Arc<dyn JetStreamPublisher>,
    hub_name: String,
    max_batch_bytes: usize,
    closed: AtomicBool,
}

impl JetStreamHubTransport {
    pub fn new(
        publisher: Arc<dyn JetStreamPublisher>,
        hub_name: impl Into<String>,
        max_batch_bytes: usize,
    ) -> Self {
        let hub_name = hub_name.into();
        info!(
            hub = %hub_name,
            max_batch_bytes,
            "Created JetStream hub transport"
        );
        Self {
            publisher,
            hub_name,
            max_batch_bytes,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn subject_for(&self, topic: &str) -> String {
        format!("{}.{}", self.hub_name, subject_token(topic))
    }
}

/// Reduce a topic to a single NATS subject token
pub(crate) fn subject_token(topic: &str) -> String {
    topic
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl HubTransport for JetStreamHubTransport {
    fn hub_name(&self) -> String {
        self.hub_name.clone()
    }

    async fn new_batch(&self) -> Result<EventBatch, TransportError> {
        self.ensure_open()?;
        Ok(EventBatch::with_max_bytes(self.max_batch_bytes)
            .with_reserved_bytes(TRACE_CONTEXT_RESERVE_BYTES))
    }

    async fn send_batch(&self, batch: EventBatch) -> Result<(), TransportError> {
        self.ensure_open()?;

        let event_count = batch.len();
        for event in batch.into_events() {
            let subject = self.subject_for(&event.topic);

            let mut headers = HeaderMap::new();
            for (key, value) in &event.properties {
                headers.insert(key.as_str(), value.as_str());
            }

            debug!(
                subject = %subject,
                size_bytes = event.body.len(),
                "Sending hub event"
            );

            self.publisher
                .publish_with_headers(subject, headers, event.body)
                .await
                .map_err(TransportError::Send)?;
        }

        debug!(hub = %self.hub_name, event_count, "Batch accepted by hub");
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(TransportError::Closed);
        }

        info!(hub = %self.hub_name, "Closing hub transport");
        self.publisher.flush().await.map_err(TransportError::Send)
    }
}
