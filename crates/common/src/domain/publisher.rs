use crate::domain::hub_transport::TransportError;
use crate::domain::message::MessageEnvelope;
use crate::domain::operation_context::OperationContext;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("hub publisher is not initialized")]
    NotInitialized,

    #[error("failed to serialize envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("envelope of {size} bytes exceeds the hub batch ceiling of {max} bytes")]
    EnvelopeTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PublishError {
    /// Whether resending the same envelope could ever succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::Transport(TransportError::Send(_)))
    }
}

/// Publishes envelopes to the message hub.
///
/// Implementations must tolerate concurrent `publish` calls from the
/// scheduler and the control API. `close` is called once during shutdown.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        ctx: &OperationContext,
        envelope: MessageEnvelope,
    ) -> Result<(), PublishError>;

    async fn close(&self, ctx: &OperationContext) -> Result<(), PublishError>;
}
