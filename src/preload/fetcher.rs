use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::PreloadError;

/// Loads one image by URL. Implementations must not retry; the coordinator
/// counts a failure as settled.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PreloadError>;
}

/// In-memory cache of preloaded image bytes, keyed by image identifier.
///
/// Cheap to clone; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    entries: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(path.to_string(), Arc::new(bytes));
        }
    }

    pub fn get(&self, path: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.read().ok()?.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches images over HTTP. No per-request timeout unless one is configured.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, PreloadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PreloadError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PreloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PreloadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreloadError::Http {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PreloadError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Mock fetcher for testing: configurable failures, delays and hangs.
#[derive(Default)]
pub struct MockImageFetcher {
    failing: HashSet<String>,
    hanging: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any URL ending with `suffix`.
    pub fn failing(mut self, suffix: &str) -> Self {
        self.failing.insert(suffix.to_string());
        self
    }

    /// Never settle any URL ending with `suffix`.
    pub fn hanging(mut self, suffix: &str) -> Self {
        self.hanging.insert(suffix.to_string());
        self
    }

    /// Delay any URL ending with `suffix`.
    pub fn delayed(mut self, suffix: &str, delay: Duration) -> Self {
        self.delays.insert(suffix.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn matches(set: &HashSet<String>, url: &str) -> bool {
        set.iter().any(|suffix| url.ends_with(suffix.as_str()))
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PreloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .delays
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if Self::matches(&self.hanging, url) {
            std::future::pending::<()>().await;
        }
        if Self::matches(&self.failing, url) {
            return Err(PreloadError::Http { status: 404 });
        }
        Ok(url.as_bytes().to_vec())
    }
}
