use crate::domain::{Method, Request};
use crate::ports::{CacheStore, Network};
use futures::future::try_join_all;
use shared::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// Fetch every request and store all responses in `cache` as one batch.
///
/// Nothing is written unless every fetch returns an ok response. Failures are
/// reported as `InstallPopulationFailure` naming the offending URL, or the
/// cache name when the batch write itself fails.
pub async fn add_all(
    cache: &dyn CacheStore,
    network: &dyn Network,
    requests: Vec<Request>,
) -> Result<usize> {
    let mut seen = HashSet::with_capacity(requests.len());
    for request in &requests {
        if request.method != Method::Get {
            return Err(Error::install_failure(
                request.url.as_str(),
                Error::InvalidRequest(format!("{} requests cannot be cached", request.method)),
            ));
        }
        if !seen.insert(request.key()) {
            return Err(Error::install_failure(
                request.url.as_str(),
                Error::InvalidState("duplicate request in batch".to_string()),
            ));
        }
    }

    let fetches = requests.into_iter().map(|request| async move {
        let response = network
            .fetch(&request)
            .await
            .map_err(|e| Error::install_failure(request.url.as_str(), e))?;

        if !response.is_ok() {
            return Err(Error::install_failure(
                request.url.as_str(),
                Error::BadStatus {
                    url: request.url.to_string(),
                    status: response.status,
                },
            ));
        }

        debug!("Fetched {} for cache '{}'", request.url, cache.name());
        Ok((request, response))
    });

    let entries = try_join_all(fetches).await?;
    let count = entries.len();
    cache
        .put_all(entries)
        .await
        .map_err(|e| Error::install_failure(cache.name(), e))?;
    Ok(count)
}

/// Fetch one request and store it, with the same rules as `add_all`
pub async fn add(cache: &dyn CacheStore, network: &dyn Network, request: Request) -> Result<()> {
    add_all(cache, network, vec![request]).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Response;
    use crate::test_support::{FailingStore, StubNetwork, sled_storage};
    use crate::ports::CacheStorage;
    use url::Url;

    fn request(path: &str) -> Request {
        Request::get(Url::parse("http://origin.test/").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_add_all_stores_every_response() {
        let (_dir, storage) = sled_storage();
        let cache = storage.open("assets").await.unwrap();
        let network = StubNetwork::new()
            .route("http://origin.test/a.html", Response::ok("a"))
            .route("http://origin.test/b.html", Response::ok("b"));

        let stored = add_all(
            cache.as_ref(),
            &network,
            vec![request("a.html"), request("b.html")],
        )
        .await
        .unwrap();

        assert_eq!(stored, 2);
        assert_eq!(cache.keys().await.unwrap().len(), 2);
        let hit = cache.match_request(&request("b.html")).await.unwrap().unwrap();
        assert_eq!(hit.body, b"b");
    }

    #[tokio::test]
    async fn test_add_all_rejects_bad_status_and_writes_nothing() {
        let (_dir, storage) = sled_storage();
        let cache = storage.open("assets").await.unwrap();
        let network = StubNetwork::new()
            .route("http://origin.test/a.html", Response::ok("a"))
            .route("http://origin.test/b.html", Response::new(404, "missing"));

        let result = add_all(
            cache.as_ref(),
            &network,
            vec![request("a.html"), request("b.html")],
        )
        .await;

        match result {
            Err(Error::InstallPopulationFailure { url, reason }) => {
                assert_eq!(url, "http://origin.test/b.html");
                assert!(reason.contains("404"));
            }
            other => panic!("expected install failure, got {:?}", other),
        }
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_all_rejects_duplicates_before_fetching() {
        let (_dir, storage) = sled_storage();
        let cache = storage.open("assets").await.unwrap();
        let network = StubNetwork::new().route("http://origin.test/a.html", Response::ok("a"));

        let result = add_all(
            cache.as_ref(),
            &network,
            vec![request("a.html"), request("a.html#again")],
        )
        .await;

        assert!(matches!(result, Err(Error::InstallPopulationFailure { .. })));
        assert_eq!(network.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_add_all_reports_write_failure_as_install_failure() {
        let cache = FailingStore::new("assets", "disk full");
        let network = StubNetwork::new().route("http://origin.test/a.html", Response::ok("a"));

        let result = add_all(&cache, &network, vec![request("a.html")]).await;
        match result {
            Err(Error::InstallPopulationFailure { url, reason }) => {
                assert_eq!(url, "assets");
                assert!(reason.contains("disk full"));
            }
            other => panic!("expected install failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_single_request() {
        let (_dir, storage) = sled_storage();
        let cache = storage.open("assets").await.unwrap();
        let network = StubNetwork::new().route("http://origin.test/a.html", Response::ok("a"));

        add(cache.as_ref(), &network, request("a.html")).await.unwrap();
        assert!(cache.match_request(&request("a.html")).await.unwrap().is_some());
    }
}
