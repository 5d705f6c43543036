use crate::dispatcher::EventListener;
use crate::domain::{Request, Response};
use crate::events::{Deferred, WorkerEvent};
use crate::ports::{CacheStorage, Network};
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Answers intercepted requests from cache, falling back to the network.
/// Network responses are never written back.
pub struct FetchHandler {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl FetchHandler {
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self { storage, network }
    }

    fn respond(&self, request: Request) -> Deferred<Response> {
        let storage = Arc::clone(&self.storage);
        let network = Arc::clone(&self.network);

        Box::pin(async move {
            let cached = storage
                .match_request(&request)
                .await
                .map_err(|e| Error::delivery_failure(request.url.as_str(), e))?;

            if let Some(response) = cached {
                debug!("Cache hit for {} {}", request.method, request.url);
                return Ok(response);
            }

            debug!("Cache miss for {} {}, fetching", request.method, request.url);
            network.fetch(&request).await.map_err(|e| {
                warn!("Fetch failed for {} {}: {}", request.method, request.url, e);
                Error::delivery_failure(request.url.as_str(), e)
            })
        })
    }
}

impl EventListener for FetchHandler {
    fn handle_event(&self, event: WorkerEvent<'_>) -> Result<()> {
        match event {
            WorkerEvent::Fetch(fetch) => fetch.respond_with(self.respond(fetch.request().clone())),
            _ => Ok(()),
        }
    }
}
