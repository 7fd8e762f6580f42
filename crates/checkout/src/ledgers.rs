//! Ledger facades over the dispatcher: inventory reservations and coupon
//! validation/consumption.

use std::sync::Arc;

use chrono::Utc;

use souq_catalog::VariantId;
use souq_core::{AggregateId, Money, UserId};
use souq_coupons::{ConsumeCoupon, Coupon, CouponCommand, CouponId, IssueCoupon};
use souq_infra::{CouponReadModel, DispatchError, EventStore, StoredEvent, rehydrate};
use souq_inventory::{ReceiveStock, Release, Reserve, StockCommand, VariantStock};

use crate::app::{AppCouponDirectory, AppDispatcher, COUPON_AGGREGATE, MAX_ATTEMPTS, STOCK_AGGREGATE};
use crate::error::CheckoutError;

/// Inventory Ledger: atomic reserve/release against per-variant streams.
///
/// Contended writes are retried transparently (bounded); the out-of-stock
/// error is left raw so callers can attach the product name the shopper used.
pub(crate) struct InventoryLedger {
    dispatcher: Arc<AppDispatcher>,
}

impl InventoryLedger {
    pub(crate) fn new(dispatcher: Arc<AppDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub(crate) fn on_hand(&self, variant_id: VariantId) -> Result<i64, CheckoutError> {
        let history = self.dispatcher.store().load_stream(variant_id.0)?;
        let mut stock = VariantStock::empty(variant_id);
        rehydrate(&mut stock, &history)?;
        Ok(stock.on_hand())
    }

    pub(crate) fn receive(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Vec<StoredEvent>, CheckoutError> {
        Ok(self.dispatcher.dispatch_with_retry(
            variant_id.0,
            STOCK_AGGREGATE,
            StockCommand::ReceiveStock(ReceiveStock {
                variant_id,
                quantity,
                occurred_at: Utc::now(),
            }),
            |id| VariantStock::empty(VariantId::new(id)),
            MAX_ATTEMPTS,
        )?)
    }

    pub(crate) fn reserve(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch_with_retry(
            variant_id.0,
            STOCK_AGGREGATE,
            StockCommand::Reserve(Reserve {
                variant_id,
                quantity,
                occurred_at: Utc::now(),
            }),
            |id| VariantStock::empty(VariantId::new(id)),
            MAX_ATTEMPTS,
        )
    }

    pub(crate) fn release(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Vec<StoredEvent>, CheckoutError> {
        Ok(self.dispatcher.dispatch_with_retry(
            variant_id.0,
            STOCK_AGGREGATE,
            StockCommand::Release(Release {
                variant_id,
                quantity,
                occurred_at: Utc::now(),
            }),
            |id| VariantStock::empty(VariantId::new(id)),
            MAX_ATTEMPTS,
        )?)
    }

    /// Compensation path: undo reservations after a later step failed. A
    /// release that fails here is logged, not propagated, because the caller
    /// is already unwinding.
    pub(crate) fn release_best_effort(&self, reserved: &[(VariantId, u32)]) {
        for &(variant_id, quantity) in reserved {
            if let Err(error) = self.release(variant_id, quantity) {
                tracing::warn!(
                    %variant_id,
                    quantity,
                    %error,
                    "failed to release reserved stock during rollback"
                );
            }
        }
    }
}

/// Coupon Ledger: code-based validation against the directory read model and
/// at-most-once consumption against the coupon stream.
pub(crate) struct CouponLedger {
    dispatcher: Arc<AppDispatcher>,
    directory: Arc<AppCouponDirectory>,
}

impl CouponLedger {
    pub(crate) fn new(dispatcher: Arc<AppDispatcher>, directory: Arc<AppCouponDirectory>) -> Self {
        Self {
            dispatcher,
            directory,
        }
    }

    /// Validate a coupon for use by `owner`: it must exist, belong to them,
    /// and be unused. Each failure gets its own shopper-facing message.
    pub(crate) fn validate(
        &self,
        code: &str,
        owner: UserId,
    ) -> Result<CouponReadModel, CheckoutError> {
        let coupon = self
            .directory
            .get(code)
            .ok_or_else(|| CheckoutError::invalid_coupon(format!("no coupon with code '{code}'")))?;

        if coupon.owner != owner {
            return Err(CheckoutError::invalid_coupon(
                "coupon does not belong to this customer",
            ));
        }
        if coupon.is_used {
            return Err(CheckoutError::invalid_coupon("coupon already used"));
        }

        Ok(coupon)
    }

    /// Consume a coupon after the order using it committed.
    ///
    /// Best-effort: the order already exists, so a consumption failure (raced
    /// consume, directory lag) is logged and swallowed rather than unwinding
    /// the order. Worst case the coupon stays reusable until an operator
    /// intervenes, which the log line is for.
    pub(crate) fn consume(&self, code: &str) -> Vec<StoredEvent> {
        let Some(coupon) = self.directory.get(code) else {
            tracing::warn!(code, "coupon disappeared before consumption");
            return vec![];
        };

        match self.dispatcher.dispatch_with_retry(
            coupon.coupon_id.0,
            COUPON_AGGREGATE,
            CouponCommand::ConsumeCoupon(ConsumeCoupon {
                coupon_id: coupon.coupon_id,
                occurred_at: Utc::now(),
            }),
            |id| Coupon::empty(CouponId::new(id)),
            MAX_ATTEMPTS,
        ) {
            Ok(committed) => committed,
            Err(error) => {
                tracing::warn!(code, %error, "coupon consumption failed after order commit");
                vec![]
            }
        }
    }

    pub(crate) fn issue(
        &self,
        owner: UserId,
        code: String,
        value: Money,
    ) -> Result<Vec<StoredEvent>, CheckoutError> {
        self.issue_with_id(CouponId::new(AggregateId::new()), owner, code, value)
    }

    pub(crate) fn issue_with_id(
        &self,
        coupon_id: CouponId,
        owner: UserId,
        code: String,
        value: Money,
    ) -> Result<Vec<StoredEvent>, CheckoutError> {
        Ok(self.dispatcher.dispatch_with_retry(
            coupon_id.0,
            COUPON_AGGREGATE,
            CouponCommand::IssueCoupon(IssueCoupon {
                coupon_id,
                owner,
                code,
                value,
                occurred_at: Utc::now(),
            }),
            |id| Coupon::empty(CouponId::new(id)),
            MAX_ATTEMPTS,
        )?)
    }
}
