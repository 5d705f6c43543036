use crate::domain::{Request, RequestKey, Response};
use crate::persistence::SledCacheStorage;
use crate::ports::{CacheStorage, CacheStore, Network};
use async_trait::async_trait;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Route {
    Respond(Response),
    Fail(String),
}

/// Scripted network that counts every fetch per URL
#[derive(Default)]
pub struct StubNetwork {
    routes: HashMap<String, (Route, Option<Duration>)>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, response: Response) -> Self {
        self.routes
            .insert(url.to_string(), (Route::Respond(response), None));
        self
    }

    pub fn fail(mut self, url: &str, reason: &str) -> Self {
        self.routes
            .insert(url.to_string(), (Route::Fail(reason.to_string()), None));
        self
    }

    /// Delay the answer for an already scripted URL
    pub fn delayed(mut self, url: &str, delay: Duration) -> Self {
        if let Some(route) = self.routes.get_mut(url) {
            route.1 = Some(delay);
        }
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = request.url.to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_insert(0) += 1;

        let Some((route, delay)) = self.routes.get(&url) else {
            return Err(Error::Network(format!("no route to {}", url)));
        };
        if let Some(delay) = delay {
            tokio::time::sleep(*delay).await;
        }
        match route {
            Route::Respond(response) => Ok(response.clone()),
            Route::Fail(reason) => Err(Error::Network(reason.clone())),
        }
    }
}

pub fn sled_storage() -> (tempfile::TempDir, SledCacheStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SledCacheStorage::new(dir.path().join("caches.sled")).unwrap();
    (dir, storage)
}

/// Cache whose writes always fail, for storage error paths
pub struct FailingStore {
    name: String,
    reason: String,
}

impl FailingStore {
    pub fn new(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, _key: &RequestKey) -> Result<Option<Response>> {
        Ok(None)
    }

    async fn insert_batch(&self, _entries: Vec<(RequestKey, Response)>) -> Result<()> {
        Err(Error::Storage(self.reason.clone()))
    }

    async fn remove(&self, _key: &RequestKey) -> Result<bool> {
        Ok(false)
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        Ok(Vec::new())
    }
}

/// Storage handing out a single `FailingStore` under any name
pub struct FailingStorage {
    store: Arc<FailingStore>,
}

impl FailingStorage {
    pub fn new(reason: &str) -> Self {
        Self {
            store: Arc::new(FailingStore::new("failing", reason)),
        }
    }
}

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open(&self, _name: &str) -> Result<Arc<dyn CacheStore>> {
        let store: Arc<dyn CacheStore> = self.store.clone();
        Ok(store)
    }

    async fn lookup(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        self.open(name).await
    }

    async fn has(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    async fn delete(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(vec![self.store.name().to_string()])
    }
}
