use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use common::domain::{
    EnvelopeError, EventPublisher, MessageEnvelope, OperationContext, Severity, TelemetrySink,
};
use common::settings::ConfigRefresher;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

use super::logging::HttpLoggingLayer;

pub const STATUS_HEADER: &str = "Status";
pub const COMMAND_HEADER: &str = "Command";
pub const CAUSATION_ID_HEADER: &str = "Causation-Id";

pub const PUBLISH_SUCCESS_PREFIX: &str = "Event published successfully::OperationID=";

/// Shared handles the control endpoints work with
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn EventPublisher>,
    pub refresher: Arc<ConfigRefresher>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health).post(health))
        .route("/refresh-config", post(refresh_config))
        .route("/publish", post(publish))
        .layer(HttpLoggingLayer::default())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn refresh_config(State(state): State<AppState>) -> Response {
    let ctx = OperationContext::new(state.telemetry.clone());

    match state.refresher.refresh().await {
        Ok(snapshot) => {
            ctx.trace("configuration refreshed successfully", Severity::Information);
            info!(
                operation_id = %ctx.operation_id(),
                tick_interval_ms = snapshot.tick_interval.as_millis() as u64,
                "Configuration refreshed via control API"
            );
            (StatusCode::OK, "Configuration refreshed successfully").into_response()
        }
        Err(e) => {
            ctx.exception("failed to refresh configuration", &e, Severity::Error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to refresh configuration: {e}"),
            )
                .into_response()
        }
    }
}

async fn publish(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = OperationContext::new(state.telemetry.clone());
    let span = info_span!(
        "control_publish",
        operation_id = %ctx.operation_id(),
        origin = "control_api"
    );

    async move {
        let envelope = match MessageEnvelope::from_request(
            ctx.operation_id(),
            header_value(&headers, STATUS_HEADER),
            header_value(&headers, COMMAND_HEADER),
            body.to_vec(),
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                let message = rejection_message(&e);
                ctx.trace(&format!("publish request rejected: {message}"), Severity::Warning);
                warn!(error = %e, "Rejected publish request");
                return (StatusCode::BAD_REQUEST, message).into_response();
            }
        };

        let envelope = match header_value(&headers, CAUSATION_ID_HEADER) {
            Some(causation_id) => envelope.with_causation_id(causation_id),
            None => envelope,
        };

        match state.publisher.publish(&ctx, envelope).await {
            Ok(()) => {
                ctx.trace("event published", Severity::Information);
                (
                    StatusCode::OK,
                    format!("{PUBLISH_SUCCESS_PREFIX}{}", ctx.operation_id()),
                )
                    .into_response()
            }
            Err(e) => {
                error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to publish event from control API"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to publish event").into_response()
            }
        }
    }
    .instrument(span)
    .await
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn rejection_message(error: &EnvelopeError) -> String {
    match error {
        EnvelopeError::MissingField("body") => "failed to read body".to_string(),
        EnvelopeError::MissingField(field) => format!("{field} not found in the request header"),
        other => other.to_string(),
    }
}
