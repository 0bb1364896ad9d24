mod duration;
mod error;
mod file_store;
mod refresher;
mod store;

pub use duration::*;
pub use error::*;
pub use file_store::*;
pub use refresher::*;
pub use store::*;
