use crate::http_network::HttpNetwork;
use shared::config::{Config, StorageBackend};
use shared::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use storage_engine::MemoryCacheStorage;
use tracing::info;
use url::Url;
use worker::OfflineCacheWorker;
use worker::persistence::SledCacheStorage;
use worker::ports::CacheStorage;

const SLED_FILE: &str = "caches.sled";

/// Open the cache storage selected by the config
pub fn open_storage(config: &Config) -> Result<Arc<dyn CacheStorage>> {
    match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory cache storage");
            Ok(Arc::new(MemoryCacheStorage::new()))
        }
        StorageBackend::Sled => {
            let path = Path::new(&config.data_dir).join(SLED_FILE);
            info!("Using sled cache storage at {}", path.display());
            Ok(Arc::new(SledCacheStorage::new(path)?))
        }
    }
}

/// Wire storage and the live network into a worker for `config.script_url`
pub fn build_worker(config: &Config) -> Result<OfflineCacheWorker> {
    let script_url = Url::parse(&config.script_url).map_err(|e| {
        Error::InvalidRequest(format!("Bad script URL '{}': {}", config.script_url, e))
    })?;
    let storage = open_storage(config)?;
    let network = Arc::new(HttpNetwork::new()?);
    OfflineCacheWorker::new(script_url, storage, network)
}
