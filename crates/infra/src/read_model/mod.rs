mod store;

pub use store::{InMemoryKeyValueStore, KeyValueStore};
