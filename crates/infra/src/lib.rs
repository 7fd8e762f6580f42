//! `souq-infra`: event store, command dispatch, and read models.
//!
//! Everything here is domain-agnostic plumbing: an append-only event store
//! with optimistic concurrency, the dispatcher that runs the
//! load → rehydrate → handle → append → publish pipeline (with a bounded
//! retry for write contention), and cursor-idempotent projections over the
//! published envelopes.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;

#[cfg(test)]
mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, DispatchError, rehydrate};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use projections::{
    CouponDirectoryProjection, CouponReadModel, OrderReadModel, OrdersProjection, ProjectionError,
};
pub use read_model::{InMemoryKeyValueStore, KeyValueStore};
