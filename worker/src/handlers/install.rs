use crate::cache_operations::add_all;
use crate::dispatcher::EventListener;
use crate::domain::Request;
use crate::events::{Deferred, WorkerEvent};
use crate::ports::{CacheStorage, Network};
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Populates the named cache with the asset list when the worker installs
pub struct InstallHandler {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    cache_name: String,
    assets: Vec<Request>,
}

impl InstallHandler {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        cache_name: impl Into<String>,
        assets: Vec<Request>,
    ) -> Self {
        Self {
            storage,
            network,
            cache_name: cache_name.into(),
            assets,
        }
    }

    pub fn assets(&self) -> &[Request] {
        &self.assets
    }

    fn populate(&self) -> Deferred<()> {
        let storage = Arc::clone(&self.storage);
        let network = Arc::clone(&self.network);
        let cache_name = self.cache_name.clone();
        let assets = self.assets.clone();

        Box::pin(async move {
            let cache = storage
                .open(&cache_name)
                .await
                .map_err(|e| Error::install_failure(cache_name.as_str(), e))?;
            match add_all(cache.as_ref(), network.as_ref(), assets).await {
                Ok(stored) => {
                    info!("Pre-cached {} asset(s) into '{}'", stored, cache_name);
                    Ok(())
                }
                Err(e) => {
                    warn!("Populating '{}' failed: {}", cache_name, e);
                    Err(e)
                }
            }
        })
    }
}

impl EventListener for InstallHandler {
    fn handle_event(&self, event: WorkerEvent<'_>) -> Result<()> {
        match event {
            WorkerEvent::Install(install) => install.wait_until(self.populate()),
            _ => Ok(()),
        }
    }
}
