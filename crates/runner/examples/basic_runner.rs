//! Minimal runner usage: two named processes, a slow in-flight task that is
//! allowed to finish during shutdown, and ordered closers.
//!
//! Run with: cargo run -p producer_runner --example basic_runner

use producer_runner::Runner;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let runner = Runner::new()
        .with_named_process("ticker", |ctx| async move {
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::info!(ticks, "Ticker stopping");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        ticks += 1;
                        tracing::info!(ticks, "Tick");
                    }
                }
            }
            Ok(())
        })
        .with_named_process("slow_worker", |ctx| async move {
            ctx.cancelled().await;
            tracing::info!("Finishing in-flight work before exit");
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(())
        })
        .with_closer(|| async move {
            tracing::info!("Closing hub connection");
            Ok(())
        })
        .with_closer(|| async move {
            tracing::info!("Flushing telemetry");
            Ok(())
        })
        .with_shutdown_timeout(Duration::from_secs(5))
        .with_closer_timeout(Duration::from_secs(5));

    tracing::info!("Press Ctrl+C to trigger graceful shutdown");
    runner.run().await;
}
