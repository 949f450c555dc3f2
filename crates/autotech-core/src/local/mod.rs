pub mod kv;
pub mod seed;
pub mod store;

pub use kv::{InMemoryKeyValueStore, KeyValueStore};
pub use seed::{seed_catalog, SEED_JSON};
pub use store::{parse_catalog, LocalCatalogStore, ModelInfo, DEFAULT_STORAGE_KEY};
