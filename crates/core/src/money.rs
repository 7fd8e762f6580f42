//! Monetary amounts.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Monetary amount in the smallest currency unit.
///
/// Amounts produced by domain operations are always non-negative; subtraction
/// floors at zero instead of going negative.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Wrap a raw amount. Callers at trust boundaries should prefer
    /// [`Money::checked`].
    pub const fn from_minor(amount: i64) -> Self {
        Self(amount)
    }

    /// Validate a caller-supplied amount (non-negative).
    pub fn checked(amount: i64) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self(amount))
    }

    pub const fn amount(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Line extension: unit price times quantity.
    pub fn times(self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }

    /// Subtraction floored at zero (discounts never drive a total negative).
    pub fn minus_to_zero(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }
}

impl ValueObject for Money {}

impl core::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
