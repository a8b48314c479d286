use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::Client;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PUT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("store returned status {0}")]
    Status(u16),
}

/// Opaque "put blob under key" capability. Calls are independent and
/// idempotent enough to be retried externally; this component never
/// retries them itself.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), ArchiveError>;
}

/// Object store reached over HTTP: `PUT {base_url}/{key}`.
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), ArchiveError> {
        let resp = self
            .client
            .put(format!("{}/{key}", self.base_url))
            .header("content-type", content_type)
            .timeout(PUT_TIMEOUT)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ArchiveError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ArchiveError::Status(resp.status().as_u16()))
        }
    }
}

/// In-memory store for tests: records every put, optionally failing
/// all of them to exercise error isolation.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (String, Bytes)>>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every put fails.
    pub fn failing() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failing: true,
        }
    }

    pub fn get(&self, key: &str) -> Option<(String, Bytes)> {
        self.objects.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), ArchiveError> {
        if self.failing {
            return Err(ArchiveError::Status(503));
        }
        let _ = self
            .objects
            .lock()
            .insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(())
    }
}
