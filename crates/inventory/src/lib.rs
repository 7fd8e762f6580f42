//! `souq-inventory`: per-variant stock ledger.
//!
//! One `VariantStock` aggregate per product variant, stream-keyed by the
//! catalog's `VariantId`. Reservations and releases are events, so on-hand
//! history is auditable and the never-negative invariant is checked at the
//! single writer (the command handler) rather than in every caller.

pub mod stock;

pub use stock::{
    ReceiveStock, Release, Reserve, StockCommand, StockEvent, StockReceived, StockReleased,
    StockReserved, VariantStock,
};
