use souq_core::Money;
use souq_orders::OrderStatus;

/// Points granted for a delivered order.
pub const DELIVERY_POINTS: i64 = 70;

/// Balance at which points convert into a coupon.
pub const COUPON_THRESHOLD: i64 = 500;

/// Value of the coupon minted at the threshold.
pub const COUPON_VALUE: Money = Money::from_minor(500);

/// What a status transition is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualDecision {
    /// Signed point change. Debits are already clamped so the balance cannot
    /// go below zero.
    pub point_delta: i64,
    /// Set when the credited balance crosses [`COUPON_THRESHOLD`]: mint a
    /// coupon of this value and reset the balance.
    pub coupon_value: Option<Money>,
}

impl AccrualDecision {
    pub const NONE: AccrualDecision = AccrualDecision {
        point_delta: 0,
        coupon_value: None,
    };
}

/// Decide the loyalty effect of moving an order from `old` to `new`.
///
/// - Entering `delivered` credits [`DELIVERY_POINTS`], unless the order was
///   paid for with a coupon (coupon orders never earn points).
/// - Leaving `delivered` takes the credit back, coupon or not, clamped at a
///   zero balance.
/// - Anything else is worth nothing.
///
/// Pure function of its inputs; the caller supplies the current balance.
pub fn accrual(
    old: OrderStatus,
    new: OrderStatus,
    has_coupon: bool,
    points: i64,
) -> AccrualDecision {
    let was_delivered = old == OrderStatus::Delivered;
    let is_delivered = new == OrderStatus::Delivered;

    if !was_delivered && is_delivered {
        if has_coupon {
            return AccrualDecision::NONE;
        }
        let balance = points + DELIVERY_POINTS;
        AccrualDecision {
            point_delta: DELIVERY_POINTS,
            coupon_value: (balance >= COUPON_THRESHOLD).then_some(COUPON_VALUE),
        }
    } else if was_delivered && !is_delivered {
        AccrualDecision {
            point_delta: -points.min(DELIVERY_POINTS),
            coupon_value: None,
        }
    } else {
        AccrualDecision::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entering_delivered_credits_points() {
        let d = accrual(OrderStatus::Pending, OrderStatus::Delivered, false, 0);
        assert_eq!(d.point_delta, 70);
        assert_eq!(d.coupon_value, None);
    }

    #[test]
    fn coupon_orders_earn_nothing() {
        let d = accrual(OrderStatus::Pending, OrderStatus::Delivered, true, 430);
        assert_eq!(d, AccrualDecision::NONE);
    }

    #[test]
    fn crossing_the_threshold_mints_a_coupon() {
        // 430 + 70 = 500: exactly at the threshold.
        let d = accrual(OrderStatus::Pending, OrderStatus::Delivered, false, 430);
        assert_eq!(d.point_delta, 70);
        assert_eq!(d.coupon_value, Some(Money::from_minor(500)));
    }

    #[test]
    fn below_threshold_no_coupon() {
        let d = accrual(OrderStatus::Cancelled, OrderStatus::Delivered, false, 350);
        assert_eq!(d.point_delta, 70);
        assert_eq!(d.coupon_value, None);
    }

    #[test]
    fn leaving_delivered_debits_clamped() {
        let d = accrual(OrderStatus::Delivered, OrderStatus::Pending, false, 70);
        assert_eq!(d.point_delta, -70);

        // Balance smaller than the credit (e.g. an admin adjustment in
        // between): never debit below zero.
        let d = accrual(OrderStatus::Delivered, OrderStatus::Cancelled, false, 30);
        assert_eq!(d.point_delta, -30);

        let d = accrual(OrderStatus::Delivered, OrderStatus::Pending, false, 0);
        assert_eq!(d.point_delta, 0);
    }

    #[test]
    fn leaving_delivered_debits_even_for_coupon_orders() {
        // Asymmetric on purpose: a coupon order earns nothing on delivery,
        // but un-delivering one still debits. The clamp keeps the debit from
        // touching more than one delivery's worth of balance.
        let d = accrual(OrderStatus::Delivered, OrderStatus::Pending, true, 100);
        assert_eq!(d.point_delta, -70);
        assert_eq!(d.coupon_value, None);
    }

    #[test]
    fn lateral_transitions_are_worth_nothing() {
        let d = accrual(OrderStatus::Pending, OrderStatus::Cancelled, false, 100);
        assert_eq!(d, AccrualDecision::NONE);
        let d = accrual(OrderStatus::Cancelled, OrderStatus::Pending, false, 100);
        assert_eq!(d, AccrualDecision::NONE);
    }
}
