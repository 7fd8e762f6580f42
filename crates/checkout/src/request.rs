use serde::{Deserialize, Serialize};

use souq_core::Money;
use souq_orders::{OrderStatus, ShippingInfo};

/// One requested cart line, as the shopper describes it. Resolution to a
/// variant and a price happens against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
}

/// An order placement request.
///
/// The client computes and sends `delivery_fee` and `total_price`; the
/// service recomputes both and rejects the request on any mismatch rather
/// than trusting client arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<LineRequest>,
    pub shipping_info: ShippingInfo,
    pub delivery_fee: Money,
    pub coupon_code: Option<String>,
    pub total_price: Money,
}

/// A partial order update: a new status, a full replacement item set, or
/// both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub items: Option<Vec<LineRequest>>,
}
