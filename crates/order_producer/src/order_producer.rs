use crate::domain::new_sample_order;
use common::domain::{
    EnvelopeBuildError, EventPublisher, MessageEnvelope, OperationContext, PublishError, Severity,
    TelemetrySink,
};
use common::settings::{IntervalSource, DEFAULT_TICK_INTERVAL};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// Lifecycle of the producer loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Running,
    Draining,
    Terminal,
}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeBuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl EmitError {
    /// Whether the next tick could succeed with an identical order
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmitError::Publish(e) if e.is_retryable())
    }
}

/// Emits one synthesized order per tick until cancelled.
///
/// The tick interval is read from the [`IntervalSource`] at the start of every
/// cycle, so refreshed settings apply from the next cycle on. Emissions are
/// strictly sequential: the next wait starts only after the previous publish
/// has returned.
pub struct OrderProducer {
    publisher: Arc<dyn EventPublisher>,
    intervals: Arc<dyn IntervalSource>,
    telemetry: Arc<dyn TelemetrySink>,
    state: watch::Sender<ProducerState>,
}

impl OrderProducer {
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        intervals: Arc<dyn IntervalSource>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let (state, _) = watch::channel(ProducerState::Running);
        Self {
            publisher,
            intervals,
            telemetry,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<ProducerState> {
        self.state.subscribe()
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| Box::pin(async move { self.run(ctx).await })
    }

    pub async fn run(&self, ctx: CancellationToken) -> anyhow::Result<()> {
        info!("Order producer started");

        loop {
            let interval = self.next_interval();

            tokio::select! {
                biased;

                _ = ctx.cancelled() => {
                    self.state.send_replace(ProducerState::Draining);
                    OperationContext::new(self.telemetry.clone())
                        .trace("shutdown requested, producer loop stopping", Severity::Information);
                    info!("Received shutdown signal, stopping order producer");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.emit_once().await {
                        error!(
                            error = %e,
                            retryable = e.is_retryable(),
                            "Failed to emit order"
                        );
                    }
                }
            }
        }

        self.state.send_replace(ProducerState::Terminal);
        info!("Order producer stopped gracefully");
        Ok(())
    }

    /// Build one order, wrap it and publish it. Returns the operation id.
    pub async fn emit_once(&self) -> Result<String, EmitError> {
        let ctx = OperationContext::new(self.telemetry.clone());
        let span = info_span!(
            "emit_order",
            operation_id = %ctx.operation_id(),
            origin = "scheduler"
        );

        async {
            let order = new_sample_order();
            let envelope = MessageEnvelope::for_order(ctx.operation_id(), &order).map_err(|e| {
                ctx.exception("failed to build order envelope", &e, Severity::Error);
                e
            })?;

            ctx.trace_with("publishing order", Severity::Information, &order.to_map());
            self.publisher.publish(&ctx, envelope).await?;

            ctx.trace("order published", Severity::Information);
            info!(order_id = %order.id, "Published order");
            Ok(ctx.operation_id().to_string())
        }
        .instrument(span)
        .await
    }

    fn next_interval(&self) -> Duration {
        match self.intervals.tick_interval() {
            Ok(interval) if !interval.is_zero() => interval,
            Ok(_) => DEFAULT_TICK_INTERVAL,
            Err(e) => {
                warn!(
                    error = %e,
                    default_secs = DEFAULT_TICK_INTERVAL.as_secs(),
                    "Tick interval unavailable, using default"
                );
                DEFAULT_TICK_INTERVAL
            }
        }
    }
}
