//! A concurrent process runner with signal-driven graceful shutdown.
//!
//! The runner owns a fixed set of long-running processes that share one
//! [`CancellationToken`]:
//! - processes run concurrently until a shutdown signal arrives or one fails
//! - after cancellation, processes get `shutdown_timeout` to finish in-flight work
//! - closers then run in registration order under `closer_timeout`
//!
//! # Example
//!
//! ```no_run
//! use producer_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Runner::new()
//!         .with_named_process("ticker", |ctx| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => break,
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                         tracing::info!("tick");
//!                     }
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("Cleaning up resources");
//!             Ok(())
//!         })
//!         .with_shutdown_timeout(Duration::from_secs(30));
//!
//!     runner.run().await;
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

/// Boxed app process: receives the shared cancellation token and runs until it
/// is cancelled or fails.
pub type AppProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send,
>;

/// Boxed cleanup function run once after every process has stopped
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send>;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CLOSER_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a completed [`Runner::execute`]
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// First error returned by a process before shutdown began
    pub first_error: Option<anyhow::Error>,
    /// Names of processes aborted because they outlived the shutdown deadline
    pub aborted: Vec<String>,
    pub closers_timed_out: bool,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        if self.first_error.is_some() {
            1
        } else {
            0
        }
    }
}

pub struct Runner {
    app_processes: Vec<(String, AppProcess)>,
    closers: Vec<Closer>,
    shutdown_timeout: Duration,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Creates a runner with a 30s shutdown deadline and a 10s closer timeout
    pub fn new() -> Self {
        Self {
            app_processes: Vec::new(),
            closers: Vec::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            closer_timeout: DEFAULT_CLOSER_TIMEOUT,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Adds an unnamed app process
    pub fn with_app_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = format!("process_{}", self.app_processes.len());
        self.with_named_process(name, process)
    }

    /// Adds an app process whose name appears in every lifecycle log line.
    ///
    /// If any process returns an error before shutdown, the shared token is
    /// cancelled and the runner exits with code 1.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.app_processes
            .push((name.into(), Box::new(|token| Box::pin(process(token)))));
        self
    }

    /// Adds a closer.
    ///
    /// Closers run sequentially in the order they were added, after every
    /// process has stopped. A failing closer does not prevent the next one.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    /// How long cancelled processes may keep running before they are aborted
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Upper bound for running all closers
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Use an externally owned token, e.g. to trigger shutdown from a test
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs to completion and exits the process with the outcome's exit code
    pub async fn run(self) {
        spawn_signal_listeners(self.cancellation_token.clone());

        let outcome = self.execute().await;
        match &outcome.first_error {
            Some(err) => tracing::error!("Application exiting with error: {:#}", err),
            None => tracing::info!("Application exiting normally"),
        }
        std::process::exit(outcome.exit_code());
    }

    /// Runs all processes and closers and reports what happened.
    ///
    /// Does not install signal handlers; cancel the token passed to
    /// [`with_cancellation_token`](Self::with_cancellation_token) to stop.
    pub async fn execute(self) -> RunOutcome {
        let token = self.cancellation_token;
        let mut outcome = RunOutcome::default();
        let mut join_set = JoinSet::new();
        let mut running = HashMap::with_capacity(self.app_processes.len());

        for (name, process) in self.app_processes {
            let process_token = token.clone();
            let task_name = name.clone();
            let handle = join_set.spawn(async move {
                tracing::info!(process = %task_name, "App process started");
                process(process_token).await
            });
            running.insert(handle.id(), name);
        }

        // Wait until a process fails or shutdown is requested
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                joined = join_set.join_next_with_id() => match joined {
                    Some(Ok((id, Ok(())))) => {
                        let name = take_name(&mut running, id);
                        tracing::info!(process = %name, "App process completed");
                    }
                    Some(Ok((id, Err(err)))) => {
                        let name = take_name(&mut running, id);
                        tracing::error!(process = %name, "App process error: {:#}", err);
                        outcome.first_error = Some(err);
                        token.cancel();
                        break;
                    }
                    Some(Err(err)) => {
                        let name = take_name(&mut running, err.id());
                        tracing::error!(process = %name, "App process panicked: {}", err);
                        outcome.first_error =
                            Some(anyhow::anyhow!("app process {name} panicked: {err}"));
                        token.cancel();
                        break;
                    }
                    None => break,
                },
            }
        }

        if !join_set.is_empty() {
            tracing::info!(
                remaining = join_set.len(),
                timeout_ms = self.shutdown_timeout.as_millis() as u64,
                "Waiting for app processes to finish in-flight work"
            );
            let drained = tokio::time::timeout(
                self.shutdown_timeout,
                drain(&mut join_set, &mut running),
            )
            .await;

            if drained.is_err() {
                join_set.abort_all();
                while let Some(result) = join_set.join_next_with_id().await {
                    // Tasks that finished on their own before the abort landed
                    match result {
                        Ok((id, _)) => {
                            take_name(&mut running, id);
                        }
                        Err(err) if err.is_panic() => {
                            take_name(&mut running, err.id());
                        }
                        Err(_) => {}
                    }
                }
                let mut aborted: Vec<String> = running.into_values().collect();
                aborted.sort();
                for name in &aborted {
                    tracing::warn!(process = %name, "App process aborted after shutdown deadline");
                }
                outcome.aborted = aborted;
            }
        }

        if !self.closers.is_empty() {
            tracing::info!("Running closers with timeout of {:?}", self.closer_timeout);
            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => tracing::info!("All closers completed"),
                Err(_) => {
                    tracing::error!("Closers timed out after {:?}", self.closer_timeout);
                    outcome.closers_timed_out = true;
                }
            }
        }

        outcome
    }
}

async fn drain(join_set: &mut JoinSet<anyhow::Result<()>>, running: &mut HashMap<Id, String>) {
    while let Some(result) = join_set.join_next_with_id().await {
        match result {
            Ok((id, Ok(()))) => {
                let name = take_name(running, id);
                tracing::info!(process = %name, "App process stopped");
            }
            Ok((id, Err(err))) => {
                let name = take_name(running, id);
                tracing::warn!(process = %name, "App process stopped with error: {:#}", err);
            }
            Err(err) => {
                let name = take_name(running, err.id());
                tracing::error!(process = %name, "App process panicked: {}", err);
            }
        }
    }
}

/// Forget a finished task and return its process name
fn take_name(running: &mut HashMap<Id, String>, id: Id) -> String {
    running
        .remove(&id)
        .unwrap_or_else(|| format!("task_{id}"))
}

async fn run_closers(closers: Vec<Closer>) {
    for closer in closers {
        if let Err(err) = closer().await {
            tracing::error!("Closer error: {:#}", err);
        }
    }
}

fn spawn_signal_listeners(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => {
                tracing::error!("Error setting up signal handler: {}", err);
            }
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => {
                tracing::error!("Error setting up SIGTERM handler: {}", err);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn wait_for_cancel(ctx: CancellationToken) -> impl Future<Output = anyhow::Result<()>> {
        async move {
            ctx.cancelled().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_processes_and_runs_closers() {
        // Arrange
        let closer_called = Arc::new(AtomicBool::new(false));
        let flag = closer_called.clone();
        let token = CancellationToken::new();

        let runner = Runner::new()
            .with_named_process("first", wait_for_cancel)
            .with_named_process("second", wait_for_cancel)
            .with_closer(move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_cancellation_token(token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        // Act
        let outcome = runner.execute().await;

        // Assert
        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.aborted.is_empty());
        assert!(closer_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failing_process_cancels_others_and_exits_with_error() {
        let other_stopped = Arc::new(AtomicBool::new(false));
        let flag = other_stopped.clone();

        let outcome = Runner::new()
            .with_named_process("failing", |_ctx| async move {
                Err(anyhow::anyhow!("hub connection lost"))
            })
            .with_named_process("waiting", move |ctx| async move {
                ctx.cancelled().await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .execute()
            .await;

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(
            outcome.first_error.unwrap().to_string(),
            "hub connection lost"
        );
        assert!(other_stopped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_work_finishes_within_shutdown_deadline() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Runner::new()
            .with_named_process("slow", move |ctx| async move {
                ctx.cancelled().await;
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_shutdown_timeout(Duration::from_secs(30))
            .with_cancellation_token(token)
            .execute()
            .await;

        assert!(finished.load(Ordering::SeqCst));
        assert!(outcome.aborted.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_outliving_deadline_is_aborted() {
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Runner::new()
            .with_named_process("stuck", |_ctx| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .with_named_process("polite", wait_for_cancel)
            .with_shutdown_timeout(Duration::from_secs(1))
            .with_cancellation_token(token)
            .execute()
            .await;

        assert_eq!(outcome.aborted, vec!["stuck".to_string()]);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicked_process_is_not_reported_as_aborted() {
        let outcome = Runner::new()
            .with_named_process("crashing", |_ctx| async move {
                let connection: Option<()> = None;
                connection.expect("connection lost");
                Ok(())
            })
            .with_named_process("stuck", |_ctx| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .with_shutdown_timeout(Duration::from_secs(1))
            .execute()
            .await;

        assert_eq!(outcome.exit_code(), 1);
        assert!(outcome
            .first_error
            .as_ref()
            .unwrap()
            .to_string()
            .contains("crashing"));
        assert_eq!(outcome.aborted, vec!["stuck".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_while_draining_is_not_reported_as_aborted() {
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Runner::new()
            .with_named_process("crashing", |ctx: CancellationToken| async move {
                ctx.cancelled().await;
                let flushed: Option<()> = None;
                flushed.expect("failed to flush");
                Ok(())
            })
            .with_named_process("stuck", |_ctx| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .with_shutdown_timeout(Duration::from_secs(1))
            .with_cancellation_token(token)
            .execute()
            .await;

        assert_eq!(outcome.aborted, vec!["stuck".to_string()]);
    }

    #[tokio::test]
    async fn test_closers_run_in_order_even_after_failure() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Runner::new()
            .with_closer(move || async move {
                first.lock().unwrap().push("publisher");
                Err(anyhow::anyhow!("already closed"))
            })
            .with_closer(move || async move {
                second.lock().unwrap().push("telemetry");
                Ok(())
            })
            .with_cancellation_token(token)
            .execute()
            .await;

        assert!(!outcome.closers_timed_out);
        assert_eq!(*order.lock().unwrap(), vec!["publisher", "telemetry"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closer_timeout_is_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Runner::new()
            .with_closer(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .with_closer_timeout(Duration::from_secs(1))
            .with_cancellation_token(token)
            .execute()
            .await;

        assert!(outcome.closers_timed_out);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
