use crate::nats::hub_transport::JetStreamHubTransport;
use crate::nats::trace_context::inject_trace_context;
use crate::nats::traits::JetStreamPublisher;
use anyhow::{Context, Result};
use async_nats::jetstream::{self, stream::Config as StreamConfig};
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!(timeout_ms = timeout.as_millis(), "Connecting to NATS");

        // Configure connection timeout for establishing the TCP connection
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        info!("Successfully connected to NATS");
        Ok(Self { client, jetstream })
    }

    /// Make sure the hub stream exists, capturing every `<hub>.<topic>` subject
    pub async fn ensure_stream(&self, hub_name: &str) -> Result<()> {
        info!(stream = %hub_name, "Ensuring hub stream exists");

        let stream_config = StreamConfig {
            name: hub_name.to_string(),
            subjects: vec![format!("{}.*", hub_name)],
            description: Some("Order events emitted by the producer".to_string()),
            ..Default::default()
        };

        match self.jetstream.get_stream(hub_name).await {
            Ok(_) => {
                info!(stream = %hub_name, "Hub stream already exists");
            }
            Err(_) => {
                self.jetstream
                    .create_stream(stream_config)
                    .await
                    .context("Failed to create hub stream")?;
                info!(stream = %hub_name, "Created hub stream");
            }
        }

        Ok(())
    }

    /// Largest payload the connected server accepts
    pub fn max_payload(&self) -> usize {
        self.client.server_info().max_payload
    }

    /// Create a JetStreamPublisher trait object from this client
    pub fn create_publisher_client(&self) -> Arc<dyn JetStreamPublisher> {
        Arc::new(NatsJetStreamPublisher::new(
            self.client.clone(),
            self.jetstream.clone(),
        ))
    }

    /// Build the hub transport for `hub_name`.
    ///
    /// The batch ceiling is the server's `max_payload`, lowered to
    /// `max_batch_bytes` when a positive override is given.
    pub fn create_hub_transport(
        &self,
        hub_name: &str,
        max_batch_bytes: Option<usize>,
    ) -> JetStreamHubTransport {
        let server_limit = self.max_payload();
        let ceiling = match max_batch_bytes {
            Some(limit) if limit > 0 => limit.min(server_limit),
            _ => server_limit,
        };

        JetStreamHubTransport::new(self.create_publisher_client(), hub_name, ceiling)
    }

    pub async fn close(&self) -> Result<()> {
        info!("Closing NATS connection");
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;
        Ok(())
    }
}

/// Concrete implementation of JetStreamPublisher using async-nats
pub struct NatsJetStreamPublisher {
    client: async_nats::Client,
    context: jetstream::Context,
}

impl NatsJetStreamPublisher {
    pub fn new(client: async_nats::Client, context: jetstream::Context) -> Self {
        Self { client, context }
    }
}

#[async_trait]
impl JetStreamPublisher for NatsJetStreamPublisher {
    #[instrument(skip(self, headers, payload), fields(subject = %subject, payload_size = payload.len()))]
    async fn publish_with_headers(
        &self,
        subject: String,
        mut headers: HeaderMap,
        payload: Bytes,
    ) -> Result<()> {
        // Inject trace context into headers for distributed tracing
        inject_trace_context(&mut headers);

        let ack = self
            .context
            .publish_with_headers(subject, headers, payload)
            .await
            .context("Failed to publish message to JetStream")?;

        ack.await
            .context("Failed to receive JetStream acknowledgment")?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;
        Ok(())
    }
}
