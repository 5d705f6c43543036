use async_trait::async_trait;
use moka::future::Cache;
use shared::Result;
use std::fmt::Debug;
use worker::ports::CacheStore;
use worker::{RequestKey, Response};

/// Moka-based in-memory named cache.
/// Unbounded and without TTL: entries stay until deleted or the process exits.
pub struct MokaCacheStore {
    name: String,
    cache: Cache<RequestKey, Response>,
}

impl MokaCacheStore {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let cache = Cache::builder().name(&name).build();
        Self { name, cache }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<Response>> {
        Ok(self.cache.get(key).await)
    }

    async fn insert_batch(&self, entries: Vec<(RequestKey, Response)>) -> Result<()> {
        // Not transactional: add_all only reaches this after every fetch succeeded
        for (key, response) in entries {
            self.cache.insert(key, response).await;
        }
        Ok(())
    }

    async fn remove(&self, key: &RequestKey) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        let mut keys: Vec<RequestKey> = self.cache.iter().map(|(key, _)| (*key).clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

impl Debug for MokaCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheStore")
            .field("name", &self.name)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use worker::{Method, Request};

    fn request(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_moka_cache_put_and_match() {
        let cache = MokaCacheStore::new("test");

        let req = request("http://h/index.html");
        cache.put(&req, Response::ok("<html>")).await.unwrap();

        let hit = cache.match_request(&req).await.unwrap();
        assert_eq!(hit.unwrap().body, b"<html>");
    }

    #[tokio::test]
    async fn test_moka_cache_miss() {
        let cache = MokaCacheStore::new("test");
        let result = cache.match_request(&request("http://h/nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_moka_cache_only_get_matches() {
        let cache = MokaCacheStore::new("test");
        let req = request("http://h/index.html");
        cache.put(&req, Response::ok("x")).await.unwrap();

        let head = Request::new(Method::Head, req.url.clone());
        assert!(cache.match_request(&head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_moka_cache_overwrite() {
        let cache = MokaCacheStore::new("test");
        let req = request("http://h/");

        cache.put(&req, Response::ok("value1")).await.unwrap();
        cache.put(&req, Response::ok("value2")).await.unwrap();

        let hit = cache.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.body, b"value2");
    }

    #[tokio::test]
    async fn test_moka_cache_delete_and_keys() {
        let cache = MokaCacheStore::new("test");
        cache
            .put_all(vec![
                (request("http://h/b"), Response::ok("b")),
                (request("http://h/a"), Response::ok("a")),
            ])
            .await
            .unwrap();

        let keys: Vec<String> = cache.keys().await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(keys, vec!["http://h/a", "http://h/b"]);

        assert!(cache.delete(&request("http://h/a")).await.unwrap());
        assert!(!cache.delete(&request("http://h/a")).await.unwrap());
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }
}
