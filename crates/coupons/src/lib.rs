//! `souq-coupons`: single-use discount coupons.
//!
//! A coupon belongs to one user, carries a fixed value, and can be consumed
//! at most once. Consumption happens after an order commits; checkout treats
//! it as best-effort and a failed consume never unwinds the order.

pub mod code;
pub mod coupon;
pub mod discount;

pub use code::generate_code;
pub use coupon::{
    ConsumeCoupon, Coupon, CouponCommand, CouponConsumed, CouponEvent, CouponId, CouponIssued,
    IssueCoupon,
};
pub use discount::capped_discount;
