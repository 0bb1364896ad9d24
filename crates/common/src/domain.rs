mod hub_transport;
mod message;
mod operation_context;
mod order;
mod publisher;
mod telemetry_sink;

pub use hub_transport::*;
pub use message::*;
pub use operation_context::*;
pub use order::*;
pub use publisher::*;
pub use telemetry_sink::*;
