mod client;
mod hub_transport;
mod trace_context;
mod traits;

pub use client::*;
pub use hub_transport::*;
pub use trace_context::*;
pub use traits::*;
