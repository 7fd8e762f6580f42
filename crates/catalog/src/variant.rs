use serde::{Deserialize, Serialize};

use souq_core::{AggregateId, Money};

/// Product variant identifier. Doubles as the inventory stream id for the
/// variant's stock aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub AggregateId);

impl VariantId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VariantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Resolved variant with the price snapshot checkout copies onto order lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub variant_id: VariantId,
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub sale_price: Money,
    pub purchase_price: Money,
}
