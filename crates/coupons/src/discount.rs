use souq_core::Money;

/// Discount applied by a coupon: the coupon's value, capped at the unit sale
/// price of the first line in the cart.
///
/// The cap is against one unit of the first item, not the cart total; callers
/// floor the discounted cart total at zero.
pub fn capped_discount(coupon_value: Money, first_unit_price: Money) -> Money {
    coupon_value.min(first_unit_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_is_capped_by_first_unit_price() {
        assert_eq!(
            capped_discount(Money::from_minor(500), Money::from_minor(300)),
            Money::from_minor(300)
        );
        assert_eq!(
            capped_discount(Money::from_minor(50), Money::from_minor(300)),
            Money::from_minor(50)
        );
    }
}
