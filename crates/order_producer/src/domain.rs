mod hub_publisher;
mod order_factory;

pub use hub_publisher::*;
pub use order_factory::*;
