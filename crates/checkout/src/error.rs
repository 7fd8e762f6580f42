use thiserror::Error;

use souq_auth::AuthzError;
use souq_catalog::CatalogError;
use souq_infra::DispatchError;

/// Checkout-level error: everything a caller of the service can get back.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not enough stock for '{product}': only {available} available")]
    OutOfStock { product: String, available: i64 },

    #[error("invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Dispatch(DispatchError),
}

impl CheckoutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_coupon(msg: impl Into<String>) -> Self {
        Self::InvalidCoupon(msg.into())
    }
}

impl From<DispatchError> for CheckoutError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Validation(msg) => CheckoutError::Validation(msg),
            DispatchError::NotFound => CheckoutError::NotFound,
            other => CheckoutError::Dispatch(other),
        }
    }
}

impl From<souq_infra::EventStoreError> for CheckoutError {
    fn from(value: souq_infra::EventStoreError) -> Self {
        CheckoutError::from(DispatchError::from(value))
    }
}
