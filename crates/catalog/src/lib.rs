//! `souq-catalog`: read-only product/variant lookup.
//!
//! Checkout never stores catalog data; it asks the catalog to resolve a
//! shopper-supplied `(product name, color, size)` triple to a priced variant
//! and snapshots the result onto the order. Stock quantities are NOT here;
//! they live in the inventory ledger, keyed by the `VariantId` this crate
//! hands out.

pub mod provider;
pub mod variant;

pub use provider::{Catalog, CatalogError, InMemoryCatalog, ProductRecord, VariantEntry};
pub use variant::{VariantId, VariantRecord};
