pub mod control_api;
pub mod web;

pub use control_api::*;
pub use web::*;
