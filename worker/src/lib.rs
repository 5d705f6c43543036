pub mod cache_operations;
pub mod dispatcher;
pub mod domain;
pub mod events;
pub mod handlers;
pub mod lifecycle;
pub mod persistence;
pub mod ports;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use domain::{ASSET_LIST, CACHE_NAME, Method, Request, RequestKey, Response};
pub use lifecycle::WorkerState;
pub use worker::OfflineCacheWorker;
