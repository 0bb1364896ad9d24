mod handlers;
mod logging;
mod server;

pub use handlers::*;
pub use logging::*;
pub use server::*;
