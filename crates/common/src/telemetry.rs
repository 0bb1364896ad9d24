mod config;
mod init;
#[cfg(any(test, feature = "testing"))]
mod recording;
mod tracing_sink;

pub use config::*;
pub use init::*;
#[cfg(any(test, feature = "testing"))]
pub use recording::*;
pub use tracing_sink::*;
