//! `souq-orders`: the order aggregate.
//!
//! Orders carry priced line snapshots (never live catalog references), a
//! validated shipping record, and a status that may move freely between
//! pending, delivered, and cancelled. All cross-aggregate orchestration
//! (stock reservation, coupon consumption, loyalty points) lives in the
//! checkout service; this crate only enforces what a single order can verify
//! about itself.

pub mod order;
pub mod shipping;

pub use order::{
    ChangeStatus, CreateOrder, ItemsReplaced, Order, OrderCommand, OrderCreated, OrderEvent,
    OrderId, OrderLine, OrderStatus, ReplaceItems, StatusChanged,
};
pub use shipping::{ShippingInfo, delivery_fee_for};
