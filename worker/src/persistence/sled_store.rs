use crate::domain::{RequestKey, Response};
use crate::ports::{CacheStorage, CacheStore};
use async_trait::async_trait;
use shared::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

// Maps cache name -> creation sequence (u64, big-endian)
const CATALOG_TREE: &str = "__cache_catalog";
const CACHE_TREE_PREFIX: &str = "cache:";

/// Sled-backed cache storage. Every named cache lives in its own tree, so
/// entries survive a restart of the worker.
pub struct SledCacheStorage {
    db: sled::Db,
    catalog: sled::Tree,
}

impl SledCacheStorage {
    /// Open (or create) the storage at `path`
    /// Creates the parent directory if it doesn't exist
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open Sled database: {}", e)))?;
        let catalog = db
            .open_tree(CATALOG_TREE)
            .map_err(|e| Error::Storage(format!("Failed to open cache catalog: {}", e)))?;

        Ok(Self { db, catalog })
    }

    fn tree_name(name: &str) -> String {
        format!("{}{}", CACHE_TREE_PREFIX, name)
    }

    fn open_store(&self, name: &str) -> Result<SledCacheStore> {
        let tree = self
            .db
            .open_tree(Self::tree_name(name))
            .map_err(|e| Error::Storage(format!("Failed to open cache '{}': {}", name, e)))?;
        Ok(SledCacheStore {
            name: name.to_string(),
            tree,
        })
    }
}

#[async_trait]
impl CacheStorage for SledCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        if !self.has(name).await? {
            let id = self
                .db
                .generate_id()
                .map_err(|e| Error::Storage(format!("Failed to allocate cache id: {}", e)))?;
            let seq = id.to_be_bytes();

            // A concurrent open may have won the race; its sequence stands.
            let created = self
                .catalog
                .compare_and_swap(name.as_bytes(), None as Option<&[u8]>, Some(&seq[..]))
                .map_err(|e| Error::Storage(format!("Failed to register cache: {}", e)))?
                .is_ok();

            if created {
                self.catalog
                    .flush()
                    .map_err(|e| Error::Storage(format!("Failed to flush catalog: {}", e)))?;
                debug!("Created cache '{}'", name);
            }
        }

        Ok(Arc::new(self.open_store(name)?))
    }

    async fn lookup(&self, name: &str) -> Result<Arc<dyn CacheStore>> {
        if !self.has(name).await? {
            return Err(Error::CacheNotFound(name.to_string()));
        }
        Ok(Arc::new(self.open_store(name)?))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        self.catalog
            .contains_key(name.as_bytes())
            .map_err(|e| Error::Storage(format!("Failed to read cache catalog: {}", e)))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let removed = self
            .catalog
            .remove(name.as_bytes())
            .map_err(|e| Error::Storage(format!("Failed to delete cache: {}", e)))?
            .is_some();

        if removed {
            self.db
                .drop_tree(Self::tree_name(name))
                .map_err(|e| Error::Storage(format!("Failed to drop cache '{}': {}", name, e)))?;
            self.catalog
                .flush()
                .map_err(|e| Error::Storage(format!("Failed to flush catalog: {}", e)))?;
        }

        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut caches = Vec::new();

        for result in self.catalog.iter() {
            let (name, seq) = result
                .map_err(|e| Error::Storage(format!("Failed to iterate cache catalog: {}", e)))?;
            let seq: [u8; 8] = seq
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Corrupt cache catalog entry".to_string()))?;
            let name = String::from_utf8(name.to_vec())
                .map_err(|e| Error::Storage(format!("Cache name is not UTF-8: {}", e)))?;
            caches.push((u64::from_be_bytes(seq), name));
        }

        caches.sort();
        Ok(caches.into_iter().map(|(_, name)| name).collect())
    }
}

/// One named cache persisted as a sled tree. Entries are JSON-encoded
/// responses keyed by `"METHOD url"`.
pub struct SledCacheStore {
    name: String,
    tree: sled::Tree,
}

#[async_trait]
impl CacheStore for SledCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<Response>> {
        let value = self
            .tree
            .get(key.to_bytes())
            .map_err(|e| Error::Storage(format!("Failed to read entry: {}", e)))?;

        match value {
            Some(bytes) => {
                let response: Response = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::Storage(format!("Failed to deserialize response: {}", e))
                })?;
                Ok(Some(response))
            }
            None => Ok(None),
        }
    }

    async fn insert_batch(&self, entries: Vec<(RequestKey, Response)>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for (key, response) in &entries {
            let value = serde_json::to_vec(response)
                .map_err(|e| Error::Storage(format!("Failed to serialize response: {}", e)))?;
            batch.insert(key.to_bytes(), value);
        }

        self.tree
            .apply_batch(batch)
            .map_err(|e| Error::Storage(format!("Failed to write entries: {}", e)))?;

        self.tree
            .flush()
            .map_err(|e| Error::Storage(format!("Failed to flush cache: {}", e)))?;

        debug!("Stored {} entries in cache '{}'", entries.len(), self.name);
        Ok(())
    }

    async fn remove(&self, key: &RequestKey) -> Result<bool> {
        let removed = self
            .tree
            .remove(key.to_bytes())
            .map_err(|e| Error::Storage(format!("Failed to delete entry: {}", e)))?
            .is_some();

        self.tree
            .flush()
            .map_err(|e| Error::Storage(format!("Failed to flush cache: {}", e)))?;

        Ok(removed)
    }

    /// Keys in byte order of their encoding
    async fn keys(&self) -> Result<Vec<RequestKey>> {
        let mut keys = Vec::new();
        for result in self.tree.iter().keys() {
            let key = result.map_err(|e| Error::Storage(format!("Failed to iterate cache: {}", e)))?;
            keys.push(RequestKey::from_bytes(&key)?);
        }
        Ok(keys)
    }
}
