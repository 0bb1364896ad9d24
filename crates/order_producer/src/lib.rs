pub mod domain;
pub mod order_producer;

pub use domain::*;
pub use order_producer::*;
