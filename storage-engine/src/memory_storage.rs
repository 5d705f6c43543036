use crate::moka_cache::MokaCacheStore;
use async_trait::async_trait;
use dashmap::DashMap;
use shared::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use worker::ports::{CacheStorage, CacheStore};

/// Process-local cache storage backed by moka caches
#[derive(Default)]
pub struct MemoryCacheStorage {
    // Maps cache name -> (creation sequence, store)
    caches: DashMap<String, (u64, Arc<MokaCacheStore>)>,
    next_seq: AtomicU64,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        let entry = self.caches.entry(name.to_string()).or_insert_with(|| {
            debug!("Created cache '{}'", name);
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            (seq, Arc::new(MokaCacheStore::new(name)))
        });
        let store: Arc<dyn CacheStore> = entry.value().1.clone();
        Ok(store)
    }

    async fn lookup(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        let store: Arc<dyn CacheStore> = self
            .caches
            .get(name)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| Error::CacheNotFound(name.to_string()))?;
        Ok(store)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.caches.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.caches.remove(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names: Vec<(u64, String)> = self
            .caches
            .iter()
            .map(|entry| (entry.value().0, entry.key().clone()))
            .collect();
        names.sort();
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }
}
