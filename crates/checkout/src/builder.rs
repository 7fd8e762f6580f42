//! Order placement: the resolve → validate → reserve → persist pipeline.

use chrono::Utc;

use souq_auth::{Principal, require_owner_or_staff};
use souq_catalog::{Catalog, VariantRecord};
use souq_core::{Money, UserId};
use souq_coupons::capped_discount;
use souq_infra::DispatchError;
use souq_orders::{CreateOrder, Order, OrderCommand, OrderId, OrderLine, delivery_fee_for};

use crate::app::{CheckoutApp, ORDER_AGGREGATE};
use crate::error::CheckoutError;
use crate::request::{LineRequest, OrderRequest};

/// A cart line resolved against the catalog.
pub(crate) struct ResolvedLine {
    pub(crate) variant: VariantRecord,
    pub(crate) quantity: u32,
}

impl ResolvedLine {
    pub(crate) fn to_order_line(&self) -> OrderLine {
        OrderLine {
            variant_id: self.variant.variant_id,
            product_name: self.variant.product_name.clone(),
            color: self.variant.color.clone(),
            size: self.variant.size.clone(),
            quantity: self.quantity,
            sale_price: self.variant.sale_price,
            purchase_price: self.variant.purchase_price,
        }
    }
}

impl CheckoutApp {
    /// Place an order for `owner`.
    ///
    /// Validation happens before any write; reservation is all-or-nothing
    /// (a failed line releases everything reserved so far); coupon
    /// consumption after the order commits is best-effort.
    pub fn place_order(
        &self,
        principal: &Principal,
        owner: UserId,
        request: &OrderRequest,
    ) -> Result<OrderId, CheckoutError> {
        require_owner_or_staff(principal, owner)?;

        // 1) Resolve every requested line against the catalog.
        let resolved = self.resolve_lines(&request.items)?;

        // 2) Early stock check, before taking anything. The reservation step
        //    re-checks authoritatively; this keeps obviously doomed orders
        //    from reserving and rolling back.
        for line in &resolved {
            let available = self.inventory().on_hand(line.variant.variant_id)?;
            if i64::from(line.quantity) > available {
                return Err(CheckoutError::OutOfStock {
                    product: line.variant.product_name.clone(),
                    available,
                });
            }
        }

        // 3) Shipping and the fee schedule.
        request.shipping_info.validate().map_err(DispatchError::from)?;
        let expected_fee = delivery_fee_for(&request.shipping_info.governorate);
        if request.delivery_fee != expected_fee {
            return Err(CheckoutError::validation(format!(
                "delivery fee for '{}' must be {expected_fee}",
                request.shipping_info.governorate
            )));
        }

        // 4) Coupon, if presented.
        let coupon = match &request.coupon_code {
            Some(code) => Some(self.coupons().validate(code, owner)?),
            None => None,
        };

        // 5) Totals. The discount is capped at one unit of the first line and
        //    can never push the cart total below zero.
        let mut cart_total: Money = resolved
            .iter()
            .map(|line| line.variant.sale_price.times(line.quantity))
            .sum();
        if let Some(coupon) = &coupon {
            let first_unit_price = resolved[0].variant.sale_price;
            cart_total = cart_total.minus_to_zero(capped_discount(coupon.value, first_unit_price));
        }

        let expected_total = cart_total + request.delivery_fee;
        if request.total_price != expected_total {
            return Err(CheckoutError::validation(format!(
                "total_price mismatch: expected {expected_total}, got {}",
                request.total_price
            )));
        }

        // 6) Reserve stock, all or nothing.
        let mut reserved: Vec<_> = Vec::with_capacity(resolved.len());
        for line in &resolved {
            match self.inventory().reserve(line.variant.variant_id, line.quantity) {
                Ok(committed) => {
                    self.project(&committed);
                    reserved.push((line.variant.variant_id, line.quantity));
                }
                Err(err) => {
                    self.inventory().release_best_effort(&reserved);
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

        // 7) Persist the order. A fresh stream cannot conflict, so any
        //    failure here is terminal: compensate by releasing the
        //    reservations.
        let order_id = OrderId::new(souq_core::AggregateId::new());
        let command = OrderCommand::CreateOrder(CreateOrder {
            order_id,
            owner,
            lines: resolved.iter().map(ResolvedLine::to_order_line).collect(),
            shipping: request.shipping_info.clone(),
            cart_total,
            delivery_fee: request.delivery_fee,
            total: request.total_price,
            coupon_code: request.coupon_code.clone(),
            occurred_at: Utc::now(),
        });

        let committed = match self.dispatcher().dispatch(
            order_id.0,
            ORDER_AGGREGATE,
            command,
            |id| Order::empty(OrderId::new(id)),
        ) {
            Ok(committed) => committed,
            Err(err) => {
                self.inventory().release_best_effort(&reserved);
                return Err(err.into());
            }
        };
        self.project(&committed);

        // 8) The order exists; consuming the coupon is best-effort from here.
        if let Some(code) = &request.coupon_code {
            let consumed = self.coupons().consume(code);
            self.project(&consumed);
        }

        tracing::info!(
            %order_id,
            %owner,
            total = %request.total_price,
            coupon = request.coupon_code.as_deref().unwrap_or(""),
            "order placed"
        );

        Ok(order_id)
    }

    pub(crate) fn resolve_lines(
        &self,
        items: &[LineRequest],
    ) -> Result<Vec<ResolvedLine>, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::validation(
                "order must contain at least one item",
            ));
        }

        items
            .iter()
            .map(|item| {
                if item.quantity == 0 {
                    return Err(CheckoutError::validation("quantity must be positive"));
                }
                let variant =
                    self.catalog()
                        .resolve(&item.product_name, &item.color, &item.size)?;
                Ok(ResolvedLine {
                    variant,
                    quantity: item.quantity,
                })
            })
            .collect()
    }
}
