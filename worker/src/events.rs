use crate::domain::{Request, Response};
use futures::future::{BoxFuture, try_join_all};
use shared::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Work a listener hands back to the dispatcher to be awaited later
pub type Deferred<T> = BoxFuture<'static, Result<T>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
}

/// Borrowed view of the event currently being dispatched
#[derive(Clone, Copy)]
pub enum WorkerEvent<'a> {
    Install(&'a InstallEvent),
    Activate(&'a ActivateEvent),
    Fetch(&'a FetchEvent),
}

impl WorkerEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::Install(_) => EventKind::Install,
            WorkerEvent::Activate(_) => EventKind::Activate,
            WorkerEvent::Fetch(_) => EventKind::Fetch,
        }
    }
}

/// Lifecycle event whose completion can be deferred with `wait_until`
#[derive(Default)]
pub struct ExtendableEvent {
    pending: Mutex<Vec<Deferred<()>>>,
    settled: AtomicBool,
}

impl ExtendableEvent {
    pub fn wait_until<F>(&self, work: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        if self.settled.load(Ordering::Acquire) {
            return Err(Error::InvalidState(
                "wait_until called after the event settled".to_string(),
            ));
        }
        self.lock()?.push(Box::pin(work));
        Ok(())
    }

    pub fn pending_count(&self) -> usize {
        self.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    /// Await everything registered so far. The first failure wins.
    pub(crate) async fn settle(&self) -> Result<()> {
        let pending = {
            let mut guard = self.lock()?;
            self.settled.store(true, Ordering::Release);
            std::mem::take(&mut *guard)
        };
        try_join_all(pending).await.map(|_| ())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Deferred<()>>>> {
        self.pending
            .lock()
            .map_err(|_| Error::Internal("event lock poisoned".to_string()))
    }
}

#[derive(Default)]
pub struct InstallEvent {
    extendable: ExtendableEvent,
}

impl InstallEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait_until<F>(&self, work: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.extendable.wait_until(work)
    }

    pub fn pending_count(&self) -> usize {
        self.extendable.pending_count()
    }

    pub(crate) async fn settle(&self) -> Result<()> {
        self.extendable.settle().await
    }
}

#[derive(Default)]
pub struct ActivateEvent {
    extendable: ExtendableEvent,
}

impl ActivateEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait_until<F>(&self, work: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.extendable.wait_until(work)
    }

    pub(crate) async fn settle(&self) -> Result<()> {
        self.extendable.settle().await
    }
}

/// An intercepted request. At most one listener may answer it.
pub struct FetchEvent {
    request: Request,
    response: Mutex<Option<Deferred<Response>>>,
    responded: AtomicBool,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Mutex::new(None),
            responded: AtomicBool::new(false),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn respond_with<F>(&self, response: F) -> Result<()>
    where
        F: Future<Output = Result<Response>> + Send + 'static,
    {
        if self.responded.swap(true, Ordering::AcqRel) {
            return Err(Error::InvalidState(format!(
                "respond_with already called for {} {}",
                self.request.method, self.request.url
            )));
        }
        *self.lock()? = Some(Box::pin(response));
        Ok(())
    }

    pub fn was_responded(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }

    pub(crate) fn take_response(&self) -> Result<Option<Deferred<Response>>> {
        Ok(self.lock()?.take())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Deferred<Response>>>> {
        self.response
            .lock()
            .map_err(|_| Error::Internal("event lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_install_event_settles_all_pending_work() {
        let event = InstallEvent::new();
        event.wait_until(async { Ok(()) }).unwrap();
        event.wait_until(async { Ok(()) }).unwrap();
        assert_eq!(event.pending_count(), 2);

        event.settle().await.unwrap();
        assert_eq!(event.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_install_event_fails_if_any_work_fails() {
        let event = InstallEvent::new();
        event.wait_until(async { Ok(()) }).unwrap();
        event
            .wait_until(async { Err(Error::Network("offline".to_string())) })
            .unwrap();

        let result = event.settle().await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_wait_until_rejected_after_settle() {
        let event = ActivateEvent::new();
        event.settle().await.unwrap();
        let result = event.wait_until(async { Ok(()) });
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_respond_with_only_once() {
        let url = Url::parse("http://localhost/index.html").unwrap();
        let event = FetchEvent::new(Request::get(url));
        assert!(!event.was_responded());

        event.respond_with(async { Ok(Response::ok("first")) }).unwrap();
        let second = event.respond_with(async { Ok(Response::ok("second")) });
        assert!(matches!(second, Err(Error::InvalidState(_))));

        let response = event.take_response().unwrap().unwrap().await.unwrap();
        assert_eq!(response.body, b"first");
    }

    #[test]
    fn test_event_kind() {
        let install = InstallEvent::new();
        assert_eq!(WorkerEvent::Install(&install).kind(), EventKind::Install);
    }
}
