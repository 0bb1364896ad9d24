use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle status carried by an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The business fact emitted on every tick.
///
/// Field names on the wire keep the casing downstream consumers already
/// decode: `id`, `ProductCategory`, `productId`, `customerId`, `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(rename = "ProductCategory")]
    pub category: String,
    #[serde(rename = "productId")]
    pub product_ref: String,
    #[serde(rename = "customerId")]
    pub customer_ref: String,
    pub status: OrderStatus,
}

impl Order {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Flat string view used as telemetry properties
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Id".to_string(), self.id.clone()),
            ("ProductCategory".to_string(), self.category.clone()),
            ("ProductID".to_string(), self.product_ref.clone()),
            ("CustomerID".to_string(), self.customer_ref.clone()),
            ("Status".to_string(), self.status.to_string()),
        ])
    }
}
