use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::fmt;
use url::Url;

/// Name of the single cache the worker populates. Bumping the version suffix
/// is the only way stale entries are ever left behind.
pub const CACHE_NAME: &str = "never-give-up-v1";

/// Assets pre-cached at install, relative to the worker script URL
pub const ASSET_LIST: [&str; 4] = ["./", "./index.html", "./icon.png", "./manifest.json"];

/// Resolve the asset list against the URL the worker script was served from
pub fn asset_requests(script_url: &Url) -> Result<Vec<Request>> {
    ASSET_LIST
        .iter()
        .map(|asset| Request::resolve(script_url, asset))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Other(String),
}

impl Method {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Other(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request descriptor carried by a fetch event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Build a GET request for `reference` resolved against `base`
    pub fn resolve(base: &Url, reference: &str) -> Result<Self> {
        let url = base
            .join(reference)
            .map_err(|e| Error::InvalidRequest(format!("cannot resolve '{}': {}", reference, e)))?;
        Ok(Self::get(url))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Identity used to key cache entries: method plus URL without fragment
    pub fn key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey {
            method: self.method.clone(),
            url: url.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = std::str::from_utf8(bytes)
            .map_err(|e| Error::Storage(format!("Request key is not UTF-8: {}", e)))?;
        let (method, url) = raw
            .split_once(' ')
            .ok_or_else(|| Error::Storage(format!("Malformed request key '{}'", raw)))?;
        Ok(Self {
            method: Method::parse(method),
            url: url.to_string(),
        })
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Response header with its value kept as raw bytes; HTTP allows values
/// that are not valid UTF-8.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

/// A response as stored in a cache or returned from the network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<Header>,
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
    /// Final URL after redirects, if known
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
            url: None,
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let mut response = Self::new(200, body);
        response.status_text = "OK".to_string();
        response
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(Header {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Same range the fetch standard calls "ok"
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_slice())
    }

    /// Header value as text; `None` when absent or not UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_bytes(name)
            .and_then(|value| std::str::from_utf8(value).ok())
    }
}
