pub mod domain;
pub mod nats;
pub mod settings;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockEventPublisher;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockHubTransport;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamPublisher;
#[cfg(any(test, feature = "testing"))]
pub use settings::MockIntervalSource;
#[cfg(any(test, feature = "testing"))]
pub use settings::MockSettingsStore;
