//! `souq-checkout`: the application service in front of the ledgers.
//!
//! This crate owns the orchestration the aggregates cannot do alone: placing
//! an order is resolve → pre-check → validate → reserve-all-or-nothing →
//! persist → best-effort coupon consume, and mutating one is authorize →
//! status/item changes → loyalty reconciliation. Every operation takes the
//! caller's [`souq_auth::Principal`] explicitly.

pub mod app;
pub mod builder;
pub mod error;
pub mod ledgers;
pub mod mutator;
pub mod request;


pub use app::CheckoutApp;
pub use error::CheckoutError;
pub use request::{LineRequest, OrderRequest, OrderUpdate};
