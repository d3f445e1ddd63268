//! Replay queue for user actions that failed to reach upstream.
//!
//! Each action carries an id that doubles as its idempotency key: enqueueing
//! an id that is already queued is a no-op. Actions are replayed in FIFO
//! order and carry their own failure count so the replayer can enforce a
//! ceiling.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::cache::current_timestamp_ms;
use crate::error::{CacheError, Result};
use crate::models::InterceptedRequest;

static NEXT_ACTION: AtomicU64 = AtomicU64::new(0);

/// Process-unique action id for callers that did not supply one.
pub fn generate_action_id() -> String {
    format!(
        "action-{}-{}",
        current_timestamp_ms(),
        NEXT_ACTION.fetch_add(1, Ordering::Relaxed)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Idempotency key
    pub id: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<String>,
    /// Failed replays so far
    #[serde(default)]
    pub attempts: u32,
    pub queued_at: DateTime<Utc>,
}

impl QueuedAction {
    pub fn new(id: impl Into<String>, method: &str, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.to_ascii_uppercase(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
            attempts: 0,
            queued_at: Utc::now(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    /// Captures a failed request for later replay.
    ///
    /// Returns None for bodies that are not valid UTF-8.
    pub fn from_request(request: &InterceptedRequest) -> Option<Self> {
        let body = match &request.body {
            Some(bytes) => Some(String::from_utf8(bytes.to_vec()).ok()?),
            None => None,
        };
        let id = request
            .header("idempotency-key")
            .map(String::from)
            .unwrap_or_else(generate_action_id);

        Some(
            Self::new(id, &request.method, request.url.to_string())
                .with_headers(request.headers.clone())
                .with_body(body),
        )
    }

    /// Rebuilds the upstream request.
    pub fn to_request(&self) -> Result<InterceptedRequest> {
        let url = Url::parse(&self.url)
            .map_err(|e| CacheError::InvalidRequest(format!("Queued url {}: {}", self.url, e)))?;
        let mut request = InterceptedRequest::new(&self.method, url);
        request.headers = self.headers.clone();
        request.body = self.body.clone().map(Bytes::from);
        Ok(request)
    }
}

/// Durable FIFO of actions awaiting replay.
#[async_trait]
pub trait ActionQueue: Send + Sync {
    /// Appends an action. Returns false when its id is already queued.
    async fn enqueue(&self, action: QueuedAction) -> Result<bool>;

    /// Every queued action, oldest first.
    async fn pending(&self) -> Result<Vec<QueuedAction>>;

    /// Removes an action. Returns whether it was queued.
    async fn remove(&self, id: &str) -> Result<bool>;

    /// Bumps the failure count of an action and returns the new count.
    async fn record_failure(&self, id: &str) -> Result<u32>;
}

fn push_unique(actions: &mut Vec<QueuedAction>, action: QueuedAction) -> bool {
    if actions.iter().any(|a| a.id == action.id) {
        debug!("Action {} already queued", action.id);
        return false;
    }
    actions.push(action);
    true
}

fn bump(actions: &mut [QueuedAction], id: &str) -> Result<u32> {
    let action = actions
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| CacheError::Storage(format!("Action {} is not queued", id)))?;
    action.attempts += 1;
    Ok(action.attempts)
}

fn take(actions: &mut Vec<QueuedAction>, id: &str) -> bool {
    let before = actions.len();
    actions.retain(|a| a.id != id);
    actions.len() != before
}

// == Memory Queue ==
/// Queue that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryActionQueue {
    actions: Mutex<Vec<QueuedAction>>,
}

impl MemoryActionQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionQueue for MemoryActionQueue {
    async fn enqueue(&self, action: QueuedAction) -> Result<bool> {
        Ok(push_unique(&mut *self.actions.lock().await, action))
    }

    async fn pending(&self) -> Result<Vec<QueuedAction>> {
        Ok(self.actions.lock().await.clone())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(take(&mut *self.actions.lock().await, id))
    }

    async fn record_failure(&self, id: &str) -> Result<u32> {
        bump(&mut self.actions.lock().await, id)
    }
}

// == File Queue ==
/// Queue persisted as a JSON document, rewritten after every mutation.
#[derive(Debug)]
pub struct FileActionQueue {
    path: PathBuf,
    actions: Mutex<Vec<QueuedAction>>,
}

impl FileActionQueue {
    /// Loads the queue from `path`, starting empty when the file is absent.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let actions = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                CacheError::Storage(format!("Corrupt action queue {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(CacheError::Storage(format!(
                    "Failed to read action queue {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Ok(Self {
            path,
            actions: Mutex::new(actions),
        })
    }

    /// Writes to a sibling temp file then renames it over the queue file.
    async fn persist(&self, actions: &[QueuedAction]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(actions)
            .map_err(|e| CacheError::Storage(format!("Failed to encode action queue: {}", e)))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| CacheError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            CacheError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl ActionQueue for FileActionQueue {
    async fn enqueue(&self, action: QueuedAction) -> Result<bool> {
        let mut actions = self.actions.lock().await;
        let added = push_unique(&mut actions, action);
        if added {
            self.persist(&actions).await?;
        }
        Ok(added)
    }

    async fn pending(&self) -> Result<Vec<QueuedAction>> {
        Ok(self.actions.lock().await.clone())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut actions = self.actions.lock().await;
        let removed = take(&mut actions, id);
        if removed {
            self.persist(&actions).await?;
        }
        Ok(removed)
    }

    async fn record_failure(&self, id: &str) -> Result<u32> {
        let mut actions = self.actions.lock().await;
        let attempts = bump(&mut actions, id)?;
        self.persist(&actions).await?;
        Ok(attempts)
    }
}
