use crate::dispatcher::EventDispatcher;
use crate::domain::{CACHE_NAME, Request, Response, asset_requests};
use crate::events::EventKind;
use crate::handlers::{FetchHandler, InstallHandler};
use crate::lifecycle::WorkerState;
use crate::ports::{CacheStorage, CacheStore, Network};
use shared::{Error, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// The offline cache worker: an install handler that pre-caches the asset
/// list and a fetch handler that serves cache-first, wired to one injected
/// cache storage handle for the worker's lifetime.
pub struct OfflineCacheWorker {
    script_url: Url,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    dispatcher: EventDispatcher,
    state: RwLock<WorkerState>,
}

impl OfflineCacheWorker {
    pub fn new(
        script_url: Url,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Result<Self> {
        let assets = asset_requests(&script_url)?;

        let dispatcher = EventDispatcher::new(Arc::clone(&network));
        dispatcher.add_listener(
            EventKind::Install,
            Arc::new(InstallHandler::new(
                Arc::clone(&storage),
                Arc::clone(&network),
                CACHE_NAME,
                assets,
            )),
        );
        dispatcher.add_listener(
            EventKind::Fetch,
            Arc::new(FetchHandler::new(Arc::clone(&storage), Arc::clone(&network))),
        );

        Ok(Self {
            script_url,
            storage,
            network,
            dispatcher,
            state: RwLock::new(WorkerState::Parsed),
        })
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// The worker's own cache, opened (or created) by name
    pub async fn cache(&self) -> Result<Arc<dyn CacheStore>> {
        self.storage.open(CACHE_NAME).await
    }

    /// Dispatch the install event. On failure the worker becomes redundant.
    pub async fn install(&self) -> Result<()> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)
            .await?;
        info!("Installing worker from {}", self.script_url);

        match self.dispatcher.dispatch_install().await {
            Ok(()) => {
                self.set_state(WorkerState::Installed).await;
                info!("Worker installed");
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                warn!("Worker install failed: {}", e);
                Err(e)
            }
        }
    }

    /// Dispatch the activate event. Caches from older versions are left alone.
    pub async fn activate(&self) -> Result<()> {
        self.transition(WorkerState::Installed, WorkerState::Activating)
            .await?;

        match self.dispatcher.dispatch_activate().await {
            Ok(()) => {
                self.set_state(WorkerState::Activated).await;
                info!("Worker activated, controlling fetches");
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                warn!("Worker activation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Install then activate
    pub async fn start(&self) -> Result<()> {
        self.install().await?;
        self.activate().await
    }

    /// Answer a request issued by the controlled page. Until the worker is
    /// activated, requests bypass it and go straight to the network.
    pub async fn handle_fetch(&self, request: Request) -> Result<Response> {
        let state = self.state().await;
        if !state.can_intercept_fetch() {
            debug!(
                "Worker is {}, passing {} {} through",
                state, request.method, request.url
            );
            return self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::delivery_failure(request.url.as_str(), e));
        }

        self.dispatcher.dispatch_fetch(request).await
    }

    async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidState(format!(
                "cannot move to {} while {}",
                to, *state
            )));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }
}

impl std::fmt::Debug for OfflineCacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCacheWorker")
            .field("script_url", &self.script_url.as_str())
            .field("cache_name", &CACHE_NAME)
            .finish()
    }
}
