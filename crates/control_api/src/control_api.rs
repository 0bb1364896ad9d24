use crate::web::{router, run_control_server, AppState, ControlServerConfig};
use common::domain::{EventPublisher, TelemetrySink};
use common::settings::ConfigRefresher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP control surface: health probe, settings refresh and manual publish.
///
/// Shares the publisher and refresher with the producer loop; stops with the
/// runner's cancellation token.
pub struct ControlApi {
    config: ControlServerConfig,
    state: AppState,
}

impl ControlApi {
    pub fn new(
        config: ControlServerConfig,
        publisher: Arc<dyn EventPublisher>,
        refresher: Arc<ConfigRefresher>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        debug!("Initializing control API module");
        Self {
            config,
            state: AppState {
                publisher,
                refresher,
                telemetry,
            },
        }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move { run_control_server(self.config, router(self.state), ctx).await })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::serve_with_shutdown;
    use common::domain::{MessageEnvelope, NoopTelemetry, PublishError, TransportError};
    use common::settings::{ConfigError, SettingsStore};
    use common::{MockEventPublisher, MockSettingsStore};
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct TestServer {
        base: String,
        token: CancellationToken,
        handle: JoinHandle<anyhow::Result<()>>,
    }

    fn settings_store() -> Arc<dyn SettingsStore> {
        let mut store = MockSettingsStore::new();
        store.expect_get_setting().returning(|key| match key {
            "TICK_INTERVAL" => Ok("2s".to_string()),
            "HUB_CONNECTION_STRING" => Ok("nats://localhost:4222".to_string()),
            "HUB_NAME" => Ok("orders".to_string()),
            other => Err(ConfigError::MissingSetting(other.to_string())),
        });
        Arc::new(store)
    }

    fn failing_settings_store() -> Arc<dyn SettingsStore> {
        let mut store = MockSettingsStore::new();
        store
            .expect_get_setting()
            .returning(|key| Err(ConfigError::MissingSetting(key.to_string())));
        Arc::new(store)
    }

    async fn start_server(
        publisher: MockEventPublisher,
        settings: Arc<dyn SettingsStore>,
    ) -> TestServer {
        let state = AppState {
            publisher: Arc::new(publisher),
            refresher: Arc::new(ConfigRefresher::new(settings)),
            telemetry: Arc::new(NoopTelemetry),
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(serve_with_shutdown(listener, router(state), token.clone()));

        TestServer {
            base: format!("http://{addr}"),
            token,
            handle,
        }
    }

    async fn stop(server: TestServer) {
        server.token.cancel();
        server.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_health_answers_get_and_post() {
        let server = start_server(MockEventPublisher::new(), settings_store()).await;
        let client = reqwest::Client::new();

        let get = client
            .get(format!("{}/health", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(get.status(), 200);
        assert_eq!(get.text().await.unwrap(), "OK");

        let post = client
            .post(format!("{}/health", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(post.status(), 200);
        assert_eq!(post.text().await.unwrap(), "OK");

        stop(server).await;
    }

    #[tokio::test]
    async fn test_publish_returns_operation_id() {
        // Arrange
        let seen = Arc::new(Mutex::new(Vec::<MessageEnvelope>::new()));
        let sink = seen.clone();
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|_, envelope: &MessageEnvelope| {
                envelope.status() == "Pending"
                    && envelope.command_type() == "create_order"
                    && envelope.body() == br#"{"id":"x"}"#
            })
            .times(1)
            .returning(move |_, envelope| {
                sink.lock().unwrap().push(envelope);
                Ok(())
            });
        let server = start_server(publisher, settings_store()).await;

        // Act
        let response = reqwest::Client::new()
            .post(format!("{}/publish", server.base))
            .header("Status", "Pending")
            .header("Command", "create_order")
            .body(r#"{"id":"x"}"#)
            .send()
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), 200);
        let text = response.text().await.unwrap();
        let operation_id = text
            .strip_prefix("Event published successfully::OperationID=")
            .unwrap();
        assert!(!operation_id.is_empty());
        assert_eq!(seen.lock().unwrap()[0].operation_id(), operation_id);

        stop(server).await;
    }

    #[tokio::test]
    async fn test_missing_status_is_rejected_without_publishing() {
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let server = start_server(publisher, settings_store()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/publish", server.base))
            .header("Command", "create_order")
            .body("payload")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(
            response.text().await.unwrap(),
            "status not found in the request header"
        );

        stop(server).await;
    }

    #[tokio::test]
    async fn test_missing_command_is_rejected_without_publishing() {
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let server = start_server(publisher, settings_store()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/publish", server.base))
            .header("Status", "Pending")
            .body("payload")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(
            response.text().await.unwrap(),
            "command not found in the request header"
        );

        stop(server).await;
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected_first() {
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let server = start_server(publisher, settings_store()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/publish", server.base))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(response.text().await.unwrap(), "failed to read body");

        stop(server).await;
    }

    #[tokio::test]
    async fn test_publish_failure_returns_500() {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_, _| Err(PublishError::Transport(TransportError::Closed)));
        let server = start_server(publisher, settings_store()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/publish", server.base))
            .header("Status", "Pending")
            .header("Command", "create_order")
            .body("payload")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        assert_eq!(response.text().await.unwrap(), "failed to publish event");

        stop(server).await;
    }

    #[tokio::test]
    async fn test_causation_id_header_is_carried() {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|_, envelope: &MessageEnvelope| envelope.causation_id() == Some("cause-1"))
            .times(1)
            .returning(|_, _| Ok(()));
        let server = start_server(publisher, settings_store()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/publish", server.base))
            .header("Status", "Pending")
            .header("Command", "create_order")
            .header("Causation-Id", "cause-1")
            .body("payload")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        stop(server).await;
    }

    #[tokio::test]
    async fn test_refresh_config_success_and_failure() {
        let ok_server = start_server(MockEventPublisher::new(), settings_store()).await;
        let response = reqwest::Client::new()
            .post(format!("{}/refresh-config", ok_server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.text().await.unwrap(),
            "Configuration refreshed successfully"
        );
        stop(ok_server).await;

        let failing_server =
            start_server(MockEventPublisher::new(), failing_settings_store()).await;
        let response = reqwest::Client::new()
            .post(format!("{}/refresh-config", failing_server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        assert!(response
            .text()
            .await
            .unwrap()
            .starts_with("Failed to refresh configuration"));
        stop(failing_server).await;
    }

    #[tokio::test]
    async fn test_into_runner_process_stops_on_cancel() {
        let api = ControlApi::new(
            ControlServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            Arc::new(MockEventPublisher::new()),
            Arc::new(ConfigRefresher::new(settings_store())),
            Arc::new(NoopTelemetry),
        );
        let token = CancellationToken::new();
        let handle = tokio::spawn(api.into_runner_process()(token.clone()));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        token.cancel();

        assert!(handle.await.unwrap().is_ok());
    }
}
