use common::domain::{Order, OrderStatus};

pub const SAMPLE_PRODUCT_CATEGORY: &str = "Electronics";
pub const SAMPLE_PRODUCT_REF: &str = "ABC";
pub const SAMPLE_CUSTOMER_REF: &str = "1234";

/// Build the pending order emitted on every tick, with a fresh unique id
pub fn new_sample_order() -> Order {
    Order {
        id: xid::new().to_string(),
        category: SAMPLE_PRODUCT_CATEGORY.to_string(),
        product_ref: SAMPLE_PRODUCT_REF.to_string(),
        customer_ref: SAMPLE_CUSTOMER_REF.to_string(),
        status: OrderStatus::Pending,
    }
}
