//! Process-wide logging setup shared by every souq binary and test harness.
//!
//! Domain crates only ever emit through the `tracing` macros; how those events
//! are filtered and rendered is decided here, once per process.

pub mod tracing;

pub use crate::tracing::{init, init_for_tests};
