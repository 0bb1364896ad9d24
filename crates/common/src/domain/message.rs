use crate::domain::order::Order;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command type stamped on orders synthesized by the scheduler
pub const CREATE_ORDER_COMMAND: &str = "create_order";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("{0} not found in the request")]
    MissingField(&'static str),

    #[error("operation id must not be empty")]
    EmptyOperationId,
}

/// Routing and correlation metadata wrapped around one payload.
///
/// An envelope is built once per emission and handed to exactly one
/// `EventPublisher::publish` call. The body is either a serialized [`Order`]
/// or opaque bytes received from the control API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    operation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    causation_id: Option<String>,
    status: String,
    command_type: String,
    #[serde(with = "body_serde")]
    body: Vec<u8>,
}

mod body_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(body).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}

impl MessageEnvelope {
    /// Wrap an order produced by the scheduler.
    ///
    /// The status defaults to the order's own status and the command type is
    /// always [`CREATE_ORDER_COMMAND`].
    pub fn for_order(
        operation_id: impl Into<String>,
        order: &Order,
    ) -> Result<Self, EnvelopeBuildError> {
        let operation_id = non_empty_operation_id(operation_id.into())?;
        let body = order.to_json()?;

        Ok(Self {
            operation_id,
            causation_id: None,
            status: order.status.to_string(),
            command_type: CREATE_ORDER_COMMAND.to_string(),
            body,
        })
    }

    /// Build an envelope from externally supplied request metadata.
    ///
    /// `status`, `command_type` and a non-empty body are all required; nothing
    /// is defaulted for external input.
    pub fn from_request(
        operation_id: impl Into<String>,
        status: Option<&str>,
        command_type: Option<&str>,
        body: impl Into<Vec<u8>>,
    ) -> Result<Self, EnvelopeError> {
        let body = body.into();
        if body.is_empty() {
            return Err(EnvelopeError::MissingField("body"));
        }
        let status = required(status, "status")?;
        let command_type = required(command_type, "command")?;
        let operation_id = non_empty_operation_id(operation_id.into())?;

        Ok(Self {
            operation_id,
            causation_id: None,
            status,
            command_type,
            body,
        })
    }

    pub fn with_causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serialize to the bytes placed on the hub
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Failure while wrapping a self-generated order
#[derive(Error, Debug)]
pub enum EnvelopeBuildError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("failed to serialize order: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, EnvelopeError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(EnvelopeError::MissingField(field)),
    }
}

fn non_empty_operation_id(operation_id: String) -> Result<String, EnvelopeError> {
    if operation_id.trim().is_empty() {
        return Err(EnvelopeError::EmptyOperationId);
    }
    Ok(operation_id)
}
