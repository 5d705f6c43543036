use crate::domain::{Request, Response};
use crate::events::{ActivateEvent, EventKind, FetchEvent, InstallEvent, WorkerEvent};
use crate::ports::Network;
use dashmap::DashMap;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// A registered reaction to worker events.
///
/// Listeners run synchronously and hand any asynchronous work back to the
/// event (`wait_until`, `respond_with`); the dispatcher awaits it.
pub trait EventListener: Send + Sync + 'static {
    fn handle_event(&self, event: WorkerEvent<'_>) -> Result<()>;
}

impl<F> EventListener for F
where
    F: Fn(WorkerEvent<'_>) -> Result<()> + Send + Sync + 'static,
{
    fn handle_event(&self, event: WorkerEvent<'_>) -> Result<()> {
        self(event)
    }
}

/// Routes lifecycle and fetch events to the listeners registered for them
pub struct EventDispatcher {
    listeners: DashMap<EventKind, Vec<Arc<dyn EventListener>>>,
    // Default action for fetch events nobody answered
    network: Arc<dyn Network>,
}

impl EventDispatcher {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            listeners: DashMap::new(),
            network,
        }
    }

    pub fn add_listener(&self, kind: EventKind, listener: Arc<dyn EventListener>) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map(|l| l.len()).unwrap_or(0)
    }

    /// Run the install listeners and hold the event open until their work resolves
    pub async fn dispatch_install(&self) -> Result<()> {
        let event = InstallEvent::new();
        self.notify(WorkerEvent::Install(&event))?;
        event.settle().await
    }

    pub async fn dispatch_activate(&self) -> Result<()> {
        let event = ActivateEvent::new();
        self.notify(WorkerEvent::Activate(&event))?;
        event.settle().await
    }

    /// Deliver a request to the fetch listeners and await the response they
    /// chose. Without a response, the request goes to the network untouched.
    pub async fn dispatch_fetch(&self, request: Request) -> Result<Response> {
        let event = FetchEvent::new(request);
        self.notify(WorkerEvent::Fetch(&event))
            .map_err(|e| Error::delivery_failure(event.request().url.as_str(), e))?;

        match event.take_response()? {
            Some(response) => response.await,
            None => {
                let request = event.request();
                debug!("No listener answered {} {}, using network", request.method, request.url);
                self.network
                    .fetch(request)
                    .await
                    .map_err(|e| Error::delivery_failure(request.url.as_str(), e))
            }
        }
    }

    fn notify(&self, event: WorkerEvent<'_>) -> Result<()> {
        // Clone out so no map guard is held while listeners run
        let listeners = self
            .listeners
            .get(&event.kind())
            .map(|l| l.clone())
            .unwrap_or_default();

        for listener in listeners {
            listener.handle_event(event)?;
        }
        Ok(())
    }
}
