use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use thiserror::Error;

/// Header block framing: `NATS/1.0\r\n` plus the closing `\r\n`
const HEADER_FRAMING_BYTES: usize = 12;

/// Separator and terminator around each header: `: ` and `\r\n`
const HEADER_LINE_OVERHEAD_BYTES: usize = 4;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("event of {size} bytes does not fit in batch ({remaining} of {max} bytes free)")]
    EventTooLarge {
        size: usize,
        remaining: usize,
        max: usize,
    },

    #[error("invalid hub event: {0}")]
    InvalidEvent(String),

    #[error("hub transport is closed")]
    Closed,

    #[error("failed to send batch to hub: {0:#}")]
    Send(#[source] anyhow::Error),
}

/// One message as handed to the hub: a topic token, string properties and an
/// opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEvent {
    pub topic: String,
    pub properties: BTreeMap<String, String>,
    pub body: Bytes,
}

impl HubEvent {
    pub fn new(topic: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            properties: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Bytes the hub counts against its payload limit: the header block
    /// built from the properties plus the body. The topic travels in the
    /// subject and is not counted.
    pub fn encoded_len(&self) -> usize {
        HEADER_FRAMING_BYTES
            + self
                .properties
                .iter()
                .map(|(k, v)| k.len() + v.len() + HEADER_LINE_OVERHEAD_BYTES)
                .sum::<usize>()
            + self.body.len()
    }
}

/// Size-bounded accumulation of events, created by the transport and local to
/// a single publish attempt.
#[derive(Debug, Clone)]
pub struct EventBatch {
    max_bytes: usize,
    reserved_bytes: usize,
    size_bytes: usize,
    events: Vec<HubEvent>,
}

impl EventBatch {
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            reserved_bytes: 0,
            size_bytes: 0,
            events: Vec::new(),
        }
    }

    /// Hold back capacity for bytes the transport adds after sizing, such as
    /// propagated trace headers
    pub fn with_reserved_bytes(mut self, reserved_bytes: usize) -> Self {
        self.reserved_bytes = reserved_bytes.min(self.max_bytes);
        self
    }

    /// Append an event, failing with [`TransportError::EventTooLarge`] when the
    /// remaining capacity is insufficient. A failed append leaves the batch
    /// unchanged.
    pub fn try_add(&mut self, event: HubEvent) -> Result<(), TransportError> {
        if event.topic.is_empty() {
            return Err(TransportError::InvalidEvent(
                "event topic must not be empty".to_string(),
            ));
        }

        let size = event.encoded_len();
        let remaining = self.remaining_bytes();
        if size > remaining {
            return Err(TransportError::EventTooLarge {
                size,
                remaining,
                max: self.max_bytes,
            });
        }

        self.size_bytes += size;
        self.events.push(event);
        Ok(())
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn reserved_bytes(&self) -> usize {
        self.reserved_bytes
    }

    pub fn remaining_bytes(&self) -> usize {
        self.max_bytes - self.reserved_bytes - self.size_bytes
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[HubEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<HubEvent> {
        self.events
    }
}

/// Capability set of the message hub client
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// Hub (stream) the transport publishes to
    fn hub_name(&self) -> String;

    /// Create an empty batch sized to the hub's payload ceiling
    async fn new_batch(&self) -> Result<EventBatch, TransportError>;

    /// Send every event of the batch and wait for the hub to accept them.
    /// Timeouts and retries are the client's concern.
    async fn send_batch(&self, batch: EventBatch) -> Result<(), TransportError>;

    /// Release the underlying connection; a second call fails with `Closed`
    async fn close(&self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_add_accounts_size() {
        let mut batch = EventBatch::with_max_bytes(1024);
        let event = HubEvent::new("create_order", vec![0u8; 100]).with_property("k", "v");
        let expected = event.encoded_len();

        batch.try_add(event).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.size_bytes(), expected);
        // NATS/1.0\r\n + "k: v\r\n" + \r\n + body
        assert_eq!(expected, 12 + 6 + 100);
    }

    #[test]
    fn test_encoded_len_ignores_topic() {
        let short = HubEvent::new("x", vec![0u8; 10]).with_property("Command", "x");
        let long = HubEvent::new("create_order", vec![0u8; 10]).with_property("Command", "x");

        assert_eq!(short.encoded_len(), long.encoded_len());
        assert_eq!(short.encoded_len(), 12 + ("Command".len() + 1 + 4) + 10);
    }

    #[test]
    fn test_event_larger_than_empty_batch_is_rejected() {
        let mut batch = EventBatch::with_max_bytes(64);
        let result = batch.try_add(HubEvent::new("t", vec![0u8; 128]));

        assert!(matches!(
            result,
            Err(TransportError::EventTooLarge {
                size: 140,
                remaining: 64,
                max: 64
            })
        ));
        assert!(batch.is_empty());
        assert_eq!(batch.size_bytes(), 0);
    }

    #[test]
    fn test_event_that_exactly_fills_batch_is_accepted() {
        let mut batch = EventBatch::with_max_bytes(21);
        batch.try_add(HubEvent::new("t", vec![0u8; 9])).unwrap();

        assert_eq!(batch.remaining_bytes(), 0);
        assert!(matches!(
            batch.try_add(HubEvent::new("t", Vec::<u8>::new())),
            Err(TransportError::EventTooLarge { .. })
        ));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_reserved_bytes_shrink_capacity_at_the_boundary() {
        // 12 framing + "Operation-Id: op-1\r\n" (20) + 400 body = 432
        let event = || {
            HubEvent::new("x", vec![0u8; 400]).with_property("Operation-Id", "op-1")
        };
        assert_eq!(event().encoded_len(), 432);

        let mut fits = EventBatch::with_max_bytes(512).with_reserved_bytes(80);
        assert!(fits.try_add(event()).is_ok());
        assert_eq!(fits.remaining_bytes(), 0);

        let mut too_small = EventBatch::with_max_bytes(512).with_reserved_bytes(81);
        assert!(matches!(
            too_small.try_add(event()),
            Err(TransportError::EventTooLarge {
                size: 432,
                remaining: 431,
                max: 512
            })
        ));
        assert!(too_small.is_empty());
    }

    #[test]
    fn test_reserve_never_exceeds_ceiling() {
        let batch = EventBatch::with_max_bytes(64).with_reserved_bytes(128);

        assert_eq!(batch.reserved_bytes(), 64);
        assert_eq!(batch.remaining_bytes(), 0);
    }

    #[test]
    fn test_empty_topic_is_invalid() {
        let mut batch = EventBatch::with_max_bytes(64);
        let result = batch.try_add(HubEvent::new("", b"x".to_vec()));
        assert!(matches!(result, Err(TransportError::InvalidEvent(_))));
    }
}
