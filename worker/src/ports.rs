#![deny(clippy::all)]

use crate::domain::{Method, Request, RequestKey, Response};
use async_trait::async_trait;
use shared::{Error, Result};
use std::sync::Arc;

// Ports are the pluggable extension points for cache backends and the network

/// Port for a single named cache.
///
/// Backends implement the raw keyed operations; request matching rules live
/// in the provided methods so every backend behaves the same way.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn get(&self, key: &RequestKey) -> Result<Option<Response>>;

    /// Write every entry or none of them
    async fn insert_batch(&self, entries: Vec<(RequestKey, Response)>) -> Result<()>;

    async fn remove(&self, key: &RequestKey) -> Result<bool>;

    async fn keys(&self) -> Result<Vec<RequestKey>>;

    /// Look up a stored response. Only GET requests can match.
    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        if request.method != Method::Get {
            return Ok(None);
        }
        self.get(&request.key()).await
    }

    async fn put(&self, request: &Request, response: Response) -> Result<()> {
        self.put_all(vec![(request.clone(), response)]).await
    }

    async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<()> {
        let mut keyed = Vec::with_capacity(entries.len());
        for (request, response) in entries {
            ensure_cacheable(&request)?;
            keyed.push((request.key(), response));
        }
        self.insert_batch(keyed).await
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        self.remove(&request.key()).await
    }
}

/// Port for the collection of named caches
#[async_trait]
pub trait CacheStorage: Send + Sync + 'static {
    /// Open a cache by name, creating it if absent
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>>;

    /// Get an existing cache without creating it.
    /// Fails with `CacheNotFound` when no cache has that name.
    async fn lookup(&self, name: &str) -> Result<Arc<dyn CacheStore>>;

    async fn has(&self, name: &str) -> Result<bool>;

    async fn delete(&self, name: &str) -> Result<bool>;

    /// Cache names in creation order
    async fn keys(&self) -> Result<Vec<String>>;

    /// Search every cache in creation order and return the first match
    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        for name in self.keys().await? {
            // Deleted since `keys` ran
            let cache = match self.lookup(&name).await {
                Ok(cache) => cache,
                Err(Error::CacheNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if let Some(response) = cache.match_request(request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

/// Port for live network access
#[async_trait]
pub trait Network: Send + Sync + 'static {
    /// Perform the request. Any HTTP status is a successful fetch; only
    /// transport failures are errors.
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

fn ensure_cacheable(request: &Request) -> Result<()> {
    if request.method != Method::Get {
        return Err(Error::InvalidRequest(format!(
            "only GET requests can be cached, got {} {}",
            request.method, request.url
        )));
    }
    match request.url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::InvalidRequest(format!(
            "unsupported scheme '{}' for {}",
            scheme, request.url
        ))),
    }
}
