//! Order mutation: status transitions with loyalty reconciliation, and full
//! item-set replacement with release/re-reserve semantics.

use chrono::Utc;

use souq_auth::{Principal, require_owner_or_staff};
use souq_core::Money;
use souq_infra::DispatchError;
use souq_loyalty::{LoyaltyAccount, LoyaltyCommand, LoyaltyEvent, RecordTransition};
use souq_orders::{
    ChangeStatus, Order, OrderCommand, OrderId, OrderStatus, ReplaceItems,
};

use crate::app::{CheckoutApp, LOYALTY_AGGREGATE, MAX_ATTEMPTS, ORDER_AGGREGATE};
use crate::builder::ResolvedLine;
use crate::error::CheckoutError;
use crate::request::OrderUpdate;

impl CheckoutApp {
    /// Apply an update to an existing order: replacement item set, status
    /// change, or both (items first, so a delivery confirmation sees the
    /// final item set).
    pub fn update_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
        update: &OrderUpdate,
    ) -> Result<(), CheckoutError> {
        let order = self.load_order(order_id)?;
        require_owner_or_staff(principal, order.owner())?;

        if let Some(items) = &update.items {
            self.replace_items(&order, items)?;
        }

        if let Some(status) = update.status {
            // Reload: an item replacement above bumped the stream version.
            let order = self.load_order(order_id)?;
            self.change_status(&order, status)?;
        }

        Ok(())
    }

    /// Swap the order's item set wholesale.
    ///
    /// Old reservations are released first, so the shopper's own stock flows
    /// back into what the new set may take. If reserving the new set fails
    /// midway, the new reservations are undone and the old ones re-taken.
    fn replace_items(
        &self,
        order: &Order,
        items: &[crate::request::LineRequest],
    ) -> Result<(), CheckoutError> {
        let resolved = self.resolve_lines(items)?;

        let old_lines: Vec<_> = order
            .lines()
            .iter()
            .map(|line| (line.variant_id, line.quantity))
            .collect();

        // Release the old set; its quantities are now part of the budget the
        // new set reserves against.
        for &(variant_id, quantity) in &old_lines {
            let committed = self.inventory().release(variant_id, quantity)?;
            self.project(&committed);
        }

        let mut reserved: Vec<_> = Vec::with_capacity(resolved.len());
        for line in &resolved {
            match self.inventory().reserve(line.variant.variant_id, line.quantity) {
                Ok(committed) => {
                    self.project(&committed);
                    reserved.push((line.variant.variant_id, line.quantity));
                }
                Err(err) => {
                    // Unwind: drop the new reservations, then put the old
                    // ones back.
                    self.inventory().release_best_effort(&reserved);
                    self.re_reserve_best_effort(&old_lines);
                    return Err(match err {
                        DispatchError::OutOfStock { available } => CheckoutError::OutOfStock {
                            product: line.variant.product_name.clone(),
                            available,
                        },
                        other => other.into(),
                    });
                }
            }
        }

        let cart_total: Money = resolved
            .iter()
            .map(|line| line.variant.sale_price.times(line.quantity))
            .sum();
        let total = cart_total + order.delivery_fee();

        let command = OrderCommand::ReplaceItems(ReplaceItems {
            order_id: order.id_typed(),
            lines: resolved.iter().map(ResolvedLine::to_order_line).collect(),
            cart_total,
            total,
            occurred_at: Utc::now(),
        });

        match self.dispatcher().dispatch_with_retry(
            order.id_typed().0,
            ORDER_AGGREGATE,
            command,
            |id| Order::empty(OrderId::new(id)),
            MAX_ATTEMPTS,
        ) {
            Ok(committed) => {
                self.project(&committed);
                tracing::info!(order_id = %order.id_typed(), lines = resolved.len(), "order items replaced");
                Ok(())
            }
            Err(err) => {
                self.inventory().release_best_effort(&reserved);
                self.re_reserve_best_effort(&old_lines);
                Err(err.into())
            }
        }
    }

    /// Change the order's status and reconcile loyalty points.
    fn change_status(&self, order: &Order, status: OrderStatus) -> Result<(), CheckoutError> {
        let from = order.status();
        let committed = self.dispatcher().dispatch_with_retry(
            order.id_typed().0,
            ORDER_AGGREGATE,
            OrderCommand::ChangeStatus(ChangeStatus {
                order_id: order.id_typed(),
                status,
                occurred_at: Utc::now(),
            }),
            |id| Order::empty(OrderId::new(id)),
            MAX_ATTEMPTS,
        )?;

        // Same-status updates commit nothing and carry no side effects.
        if committed.is_empty() {
            return Ok(());
        }
        self.project(&committed);

        let owner = order.owner();
        let loyalty_committed = self.dispatcher().dispatch_with_retry(
            LoyaltyAccount::stream_id(owner),
            LOYALTY_AGGREGATE,
            LoyaltyCommand::RecordTransition(RecordTransition {
                user_id: owner,
                old_status: from,
                new_status: status,
                has_coupon: order.has_coupon(),
                occurred_at: Utc::now(),
            }),
            |_| LoyaltyAccount::empty(owner),
            MAX_ATTEMPTS,
        )?;
        self.project(&loyalty_committed);

        // Materialize any earned coupon. The loyalty stream is the source of
        // truth for the threshold crossing; issuing the coupon aggregate is
        // an at-least-once follow-through keyed by the earned coupon id.
        for stored in &loyalty_committed {
            let event: LoyaltyEvent = serde_json::from_value(stored.payload.clone())
                .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
            if let LoyaltyEvent::CouponEarned(earned) = event {
                let committed = self.coupons().issue_with_id(
                    earned.coupon_id,
                    earned.user_id,
                    earned.code.clone(),
                    earned.value,
                )?;
                self.project(&committed);
                tracing::info!(
                    user_id = %earned.user_id,
                    code = earned.code,
                    value = %earned.value,
                    "loyalty coupon issued"
                );
            }
        }

        tracing::info!(
            order_id = %order.id_typed(),
            from = %from,
            to = %status,
            "order status changed"
        );

        Ok(())
    }

    fn re_reserve_best_effort(&self, lines: &[(souq_catalog::VariantId, u32)]) {
        for &(variant_id, quantity) in lines {
            match self.inventory().reserve(variant_id, quantity) {
                Ok(committed) => self.project(&committed),
                Err(error) => {
                    tracing::warn!(
                        %variant_id,
                        quantity,
                        %error,
                        "failed to re-reserve original items during rollback"
                    );
                }
            }
        }
    }
}
