//! `souq-loyalty`: delivery reward points.
//!
//! A pure accrual rule decides what an order status transition is worth; the
//! `LoyaltyAccount` aggregate applies the decision, crossing the reward
//! threshold and resetting the balance in the same event batch so the
//! "points become a coupon" step can never half-happen.

pub mod account;
pub mod accrual;

pub use account::{
    AdjustPoints, CouponEarned, LoyaltyAccount, LoyaltyCommand, LoyaltyEvent, PointsCredited,
    PointsDebited, PointsSet, RecordTransition,
};
pub use accrual::{
    AccrualDecision, COUPON_THRESHOLD, COUPON_VALUE, DELIVERY_POINTS, accrual,
};
