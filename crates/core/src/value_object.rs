//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable domain objects compared by their attribute
/// values; identity does not matter. `Money { amount: 100 }` is a value object,
/// an order with an id is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
