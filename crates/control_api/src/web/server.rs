use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Address the control API listens on
#[derive(Clone, Debug)]
pub struct ControlServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ControlServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Bind the configured address and serve `router` until `cancellation_token`
/// is cancelled
pub async fn run_control_server(
    config: ControlServerConfig,
    router: Router,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind control API on {addr}"))?;

    serve_with_shutdown(listener, router, cancellation_token).await
}

/// Serve on an already bound listener.
///
/// On cancellation the server stops accepting connections and waits for
/// in-flight requests to complete before returning.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    router: Router,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let local_addr = listener
        .local_addr()
        .context("Failed to read control API address")?;
    info!(address = %local_addr, "Starting control API server");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            debug!("Control API shutdown signal received");
        })
        .await
        .context("Control API server error")?;

    info!("Control API server stopped gracefully");
    Ok(())
}
