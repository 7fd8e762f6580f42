mod coupon_directory;
mod orders;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("envelope aggregate_id does not match event: {0}")]
    AggregateMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

pub use coupon_directory::{CouponDirectoryProjection, CouponReadModel};
pub use orders::{OrderReadModel, OrdersProjection};
