mod config;

use common::domain::{EventPublisher, OperationContext, Severity, TelemetrySink};
use common::nats::NatsClient;
use common::settings::{ConfigRefresher, ConfigSnapshot, FileSettingsStore};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryProviders, TracingTelemetry};
use crate::config::ServiceConfig;
use control_api::ControlApi;
use order_producer::{HubPublisher, OrderProducer};
use producer_runner::Runner;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Role name attached to every telemetry record emitted by this process
const CLOUD_ROLE: &str = "Producer";

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry (tracing + OpenTelemetry for traces and logs)
    let telemetry_providers: Option<TelemetryProviders> =
        match init_telemetry(&config.telemetry_config()) {
            Ok(provider) => provider,
            Err(e) => {
                eprintln!("Failed to initialize telemetry: {}", e);
                std::process::exit(1);
            }
        };

    info!(
        otel_enabled = config.otel_enabled,
        config_source = %config.config_source,
        "Starting order producer service"
    );
    debug!("Configuration: {:?}", config);

    let telemetry: Arc<dyn TelemetrySink> = Arc::new(TracingTelemetry::new(CLOUD_ROLE));
    let init_ctx = OperationContext::new(telemetry.clone());

    // Runtime settings must be readable before anything connects
    let refresher = Arc::new(ConfigRefresher::new(Arc::new(FileSettingsStore::new(
        &config.config_source,
    ))));
    let snapshot = match refresher.refresh().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            init_ctx.exception("failed to load runtime settings", &e, Severity::Critical);
            error!(error = %e, "Failed to load runtime settings");
            std::process::exit(1);
        }
    };

    let (nats_client, publisher) = match initialize_publisher(&config, &snapshot, &init_ctx).await
    {
        Ok(deps) => deps,
        Err(e) => {
            init_ctx.exception("failed to initialize hub publisher", &*e, Severity::Critical);
            error!("Failed to initialize hub publisher: {:#}", e);
            std::process::exit(1);
        }
    };

    let order_producer = OrderProducer::new(publisher.clone(), refresher.clone(), telemetry.clone());
    let control_api = ControlApi::new(
        config.control_server_config(),
        publisher.clone(),
        refresher,
        telemetry.clone(),
    );

    // Build runner with all processes
    let runner = Runner::new()
        .with_named_process("order_producer", order_producer.into_runner_process())
        .with_named_process("control_api", control_api.into_runner_process());

    // Closers run in order: publisher, hub connection, telemetry flush
    let runner = runner
        .with_closer({
            let publisher = publisher.clone();
            let telemetry = telemetry.clone();
            move || {
                Box::pin(async move {
                    info!("Running cleanup tasks...");
                    let ctx = OperationContext::new(telemetry);
                    if let Err(e) = publisher.close(&ctx).await {
                        error!(error = %e, "Failed to close hub publisher");
                    }
                    nats_client.close().await
                })
            }
        })
        .with_closer(move || {
            Box::pin(async move {
                // Shutdown telemetry and flush pending traces and logs
                shutdown_telemetry(telemetry_providers);
                info!("Cleanup complete");
                Ok(())
            })
        })
        .with_shutdown_timeout(config.shutdown_timeout())
        .with_closer_timeout(config.closer_timeout());

    // Run the service
    runner.run().await;
}

async fn initialize_publisher(
    config: &ServiceConfig,
    snapshot: &ConfigSnapshot,
    ctx: &OperationContext,
) -> anyhow::Result<(Arc<NatsClient>, Arc<dyn EventPublisher>)> {
    info!(hub = %snapshot.hub_name, "Initializing NATS...");
    let nats_client = Arc::new(
        NatsClient::connect(&snapshot.hub_connection, config.nats_connect_timeout()).await?,
    );
    nats_client.ensure_stream(&snapshot.hub_name).await?;

    let transport = nats_client
        .create_hub_transport(&snapshot.hub_name, config.max_batch_bytes_override());
    let publisher: Arc<dyn EventPublisher> = Arc::new(HubPublisher::new(ctx, Arc::new(transport)));

    Ok((nats_client, publisher))
}
