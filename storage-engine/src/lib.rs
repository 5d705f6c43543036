pub mod memory_storage;
pub mod moka_cache;

pub use memory_storage::MemoryCacheStorage;
pub use moka_cache::MokaCacheStore;
