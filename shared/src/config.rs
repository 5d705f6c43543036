use tracing::warn;

/// Where the worker keeps its named caches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sled,
}

impl StorageBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(StorageBackend::Memory),
            "sled" | "disk" => Some(StorageBackend::Sled),
            _ => None,
        }
    }
}

pub struct Config {
    /// URL the worker script was served from; relative asset paths resolve against it
    pub script_url: String,
    pub data_dir: String,
    pub storage: StorageBackend,
}

impl Config {
    const DEFAULT_SCRIPT_URL: &str = "http://localhost:8000/sw.js";
    const DEFAULT_DATA_DIR: &str = "./data";

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let storage = match lookup("NGU_STORAGE") {
            Some(raw) => StorageBackend::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown NGU_STORAGE value '{}', falling back to sled", raw);
                StorageBackend::Sled
            }),
            None => StorageBackend::Sled,
        };

        Self {
            script_url: lookup("NGU_SCRIPT_URL")
                .unwrap_or_else(|| Self::DEFAULT_SCRIPT_URL.to_string()),
            data_dir: lookup("NGU_DATA_DIR").unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            storage,
        }
    }
}
