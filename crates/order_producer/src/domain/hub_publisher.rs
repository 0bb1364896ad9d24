use async_trait::async_trait;
use chrono::Utc;
use common::domain::{
    DependencyRecord, EventPublisher, HubEvent, HubTransport, MessageEnvelope, OperationContext,
    Properties, PublishError, Severity, TransportError,
};
use common::nats::OPERATION_ID_HEADER;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub const STATUS_PROPERTY: &str = "Status";
pub const COMMAND_PROPERTY: &str = "Command";
pub const CAUSATION_ID_PROPERTY: &str = "Causation-Id";

const DEPENDENCY_NAME: &str = "Publish hub message";
const DEPENDENCY_TYPE: &str = "NATS";

/// [`EventPublisher`] that sends every envelope as a single-event batch.
///
/// Shared by the producer loop and the control API. The transport handle is
/// set once at construction and only read afterwards.
pub struct HubPublisher {
    transport: Option<Arc<dyn HubTransport>>,
    hub_name: String,
    closed: AtomicBool,
}

impl HubPublisher {
    pub fn new(ctx: &OperationContext, transport: Arc<dyn HubTransport>) -> Self {
        let hub_name = transport.hub_name();
        let properties = Properties::from([("Hub".to_string(), hub_name.clone())]);
        ctx.trace_with("hub publisher initialized", Severity::Information, &properties);
        info!(hub = %hub_name, "Hub publisher initialized");

        Self {
            transport: Some(transport),
            hub_name,
            closed: AtomicBool::new(false),
        }
    }

    /// Publisher without a transport; every call fails with
    /// [`PublishError::NotInitialized`]
    pub fn uninitialized() -> Self {
        Self {
            transport: None,
            hub_name: String::new(),
            closed: AtomicBool::new(false),
        }
    }

    async fn try_publish(&self, envelope: &MessageEnvelope) -> Result<(), PublishError> {
        let transport = self.transport.as_ref().ok_or(PublishError::NotInitialized)?;
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed.into());
        }

        let bytes = envelope.to_wire_bytes()?;
        let mut event = HubEvent::new(envelope.command_type(), bytes)
            .with_property(OPERATION_ID_HEADER, envelope.operation_id())
            .with_property(STATUS_PROPERTY, envelope.status())
            .with_property(COMMAND_PROPERTY, envelope.command_type());
        if let Some(causation_id) = envelope.causation_id() {
            event = event.with_property(CAUSATION_ID_PROPERTY, causation_id);
        }

        let mut batch = transport.new_batch().await?;
        batch.try_add(event).map_err(|e| match e {
            TransportError::EventTooLarge { size, max, .. } => {
                PublishError::EnvelopeTooLarge { size, max }
            }
            other => PublishError::Transport(other),
        })?;

        debug!(
            operation_id = %envelope.operation_id(),
            size_bytes = batch.size_bytes(),
            "Sending batch to hub"
        );
        transport.send_batch(batch).await?;
        Ok(())
    }
}

fn envelope_properties(envelope: &MessageEnvelope) -> Properties {
    let mut properties = Properties::from([
        (
            OPERATION_ID_HEADER.to_string(),
            envelope.operation_id().to_string(),
        ),
        (STATUS_PROPERTY.to_string(), envelope.status().to_string()),
        (
            COMMAND_PROPERTY.to_string(),
            envelope.command_type().to_string(),
        ),
    ]);
    if let Some(causation_id) = envelope.causation_id() {
        properties.insert(CAUSATION_ID_PROPERTY.to_string(), causation_id.to_string());
    }
    properties
}

#[async_trait]
impl EventPublisher for HubPublisher {
    async fn publish(
        &self,
        ctx: &OperationContext,
        envelope: MessageEnvelope,
    ) -> Result<(), PublishError> {
        let properties = envelope_properties(&envelope);

        let started_at = Utc::now();
        let result = self.try_publish(&envelope).await;
        let finished_at = Utc::now();

        ctx.dependency(&DependencyRecord {
            name: DEPENDENCY_NAME.to_string(),
            dependency_type: DEPENDENCY_TYPE.to_string(),
            target: self.hub_name.clone(),
            success: result.is_ok(),
            started_at,
            finished_at,
            properties,
        });

        if let Err(e) = &result {
            let message = match e {
                PublishError::EnvelopeTooLarge { .. } => "envelope too large for hub batch",
                PublishError::NotInitialized => "hub publisher is not initialized",
                PublishError::Serialization(_) => "failed to serialize envelope",
                PublishError::Transport(_) => "failed to send hub message",
            };
            ctx.exception(message, e, Severity::Error);
        }

        result
    }

    async fn close(&self, ctx: &OperationContext) -> Result<(), PublishError> {
        let transport = self.transport.as_ref().ok_or(PublishError::NotInitialized)?;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(TransportError::Closed.into());
        }

        ctx.trace("closing hub publisher", Severity::Information);
        info!(hub = %self.hub_name, "Closing hub publisher");

        transport.close().await.map_err(|e| {
            ctx.exception("failed to close hub publisher", &e, Severity::Error);
            PublishError::from(e)
        })
    }
}
