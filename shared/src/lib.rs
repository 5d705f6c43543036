// shared/src/lib.rs

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cache not found: {0}")]
    CacheNotFound(String),
    #[error("install failed for {url}: {reason}")]
    InstallPopulationFailure { url: String, reason: String },
    #[error("fetch failed for {url}: {reason}")]
    FetchDeliveryFailure { url: String, reason: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("bad response status {status} for {url}")]
    BadStatus { url: String, status: u16 },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a failure raised while populating the cache at install time.
    pub fn install_failure(url: impl Into<String>, cause: Error) -> Self {
        match cause {
            already @ Error::InstallPopulationFailure { .. } => already,
            other => Error::InstallPopulationFailure {
                url: url.into(),
                reason: other.to_string(),
            },
        }
    }

    /// Classify a failure raised while answering an intercepted request.
    pub fn delivery_failure(url: impl Into<String>, cause: Error) -> Self {
        match cause {
            already @ Error::FetchDeliveryFailure { .. } => already,
            other => Error::FetchDeliveryFailure {
                url: url.into(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
