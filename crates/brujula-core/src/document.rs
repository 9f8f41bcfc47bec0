//! Document store client: one JSON document per device key, live-subscription
//! reads, merge-semantics writes, local-cache-first.
//!
//! [`RestDocumentClient`] talks to the cloud document API over HTTP and keeps
//! a two-layer cache in front of it (DashMap hot cache + Sled on disk), so a
//! subscriber gets the cached document immediately and genuine server
//! snapshots as they arrive. [`MemoryDocumentClient`] is the in-process
//! implementation used by tests and local demos.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffer size for snapshot channels. Subscribers that fall this far behind
/// start dropping intermediate snapshots, which is safe: only the latest
/// document matters.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 32;

/// One delivery from a document subscription.
///
/// `data = None` means the document does not exist remotely. `pending_write`
/// marks the latency-compensation echo of this client's own in-flight write;
/// the sync engine ignores those. `from_cache` marks the immediate replay of
/// the locally cached document before the first server round trip.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub data: Option<Value>,
    pub pending_write: bool,
    pub from_cache: bool,
}

impl DocumentSnapshot {
    fn cached(data: Value) -> Self {
        Self {
            data: Some(data),
            pending_write: false,
            from_cache: true,
        }
    }

    fn pending(data: Value) -> Self {
        Self {
            data: Some(data),
            pending_write: true,
            from_cache: false,
        }
    }

    fn server(data: Option<Value>) -> Self {
        Self {
            data,
            pending_write: false,
            from_cache: false,
        }
    }
}

/// The seam between the sync engine and whatever actually stores documents.
/// Writes use top-level merge semantics; the last writer wins.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Live subscription: the receiver gets the current document first (from
    /// cache when available), then every subsequent change. The subscription
    /// ends when the receiver is dropped.
    async fn subscribe(&self, key: &str) -> CoreResult<mpsc::Receiver<DocumentSnapshot>>;

    /// Persists the full document under `key`.
    async fn write(&self, key: &str, doc: &Value) -> CoreResult<()>;
}

type ListenerMap = Arc<DashMap<String, Vec<mpsc::Sender<DocumentSnapshot>>>>;

/// Sends a snapshot to every listener of `key`. Senders are cloned out first
/// so no map guard is held across an await; closed receivers just miss out.
async fn fan_out(listeners: &ListenerMap, key: &str, snapshot: DocumentSnapshot) {
    let targets: Vec<mpsc::Sender<DocumentSnapshot>> = match listeners.get(key) {
        Some(entry) => entry.clone(),
        None => return,
    };
    for tx in targets {
        let _ = tx.send(snapshot.clone()).await;
    }
}

// ---------------------------------------------------------------------------
// REST client with local-cache-first semantics
// ---------------------------------------------------------------------------

/// HTTP document client. `GET {base}/documents/{key}` returns the document
/// (404 = absent); `PATCH` writes it with top-level merge. Change delivery is
/// a poll loop per subscription that emits only genuine transitions.
#[derive(Clone)]
pub struct RestDocumentClient {
    http: reqwest::Client,
    base_url: String,
    cache: sled::Db,
    hot: Arc<DashMap<String, Value>>,
    listeners: ListenerMap,
    poll_interval: Duration,
}

impl RestDocumentClient {
    /// Opens the client with its Sled cache at `cache_path`.
    pub fn open<P: AsRef<Path>>(
        base_url: impl Into<String>,
        cache_path: P,
        poll_interval: Duration,
    ) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: sled::open(cache_path)?,
            hot: Arc::new(DashMap::new()),
            listeners: Arc::new(DashMap::new()),
            poll_interval,
        })
    }

    fn document_url(&self, key: &str) -> String {
        format!("{}/documents/{}", self.base_url, key)
    }

    /// Cached document, hot layer first, then Sled.
    fn cached(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.hot.get(key) {
            return Some(v.clone());
        }
        let bytes = self.cache.get(key.as_bytes()).ok().flatten()?;
        let value: Value = serde_json::from_slice(&bytes).ok()?;
        self.hot.insert(key.to_string(), value.clone());
        Some(value)
    }

    fn store_cached(&self, key: &str, doc: &Value) {
        self.hot.insert(key.to_string(), doc.clone());
        match serde_json::to_vec(doc) {
            Ok(bytes) => {
                if let Err(e) = self.cache.insert(key.as_bytes(), bytes) {
                    warn!("document cache write failed: {e}");
                }
            }
            Err(e) => warn!("document cache serialization failed: {e}"),
        }
    }

    /// One GET round trip. `Ok(None)` = document absent.
    async fn fetch(&self, key: &str) -> CoreResult<Option<Value>> {
        let res = self
            .http
            .get(self.document_url(key))
            .send()
            .await
            .map_err(|e| CoreError::Store(format!("document fetch failed: {e}")))?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(CoreError::Store(format!(
                "document fetch returned {}",
                res.status()
            )));
        }
        let value = res
            .json::<Value>()
            .await
            .map_err(|e| CoreError::Store(format!("document fetch parse failed: {e}")))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl DocumentClient for RestDocumentClient {
    async fn subscribe(&self, key: &str) -> CoreResult<mpsc::Receiver<DocumentSnapshot>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);

        // Cache-first: replay the local copy before the first round trip.
        if let Some(cached) = self.cached(key) {
            let _ = tx.send(DocumentSnapshot::cached(cached)).await;
        }

        self.listeners
            .entry(key.to_string())
            .or_default()
            .push(tx.clone());

        let client = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            // `last` tracks the last state delivered by the server so the loop
            // only emits genuine transitions (including absent -> present).
            let mut last: Option<Option<Value>> = None;
            loop {
                match client.fetch(&key).await {
                    Ok(current) => {
                        if last.as_ref() != Some(&current) {
                            if let Some(doc) = &current {
                                client.store_cached(&key, doc);
                            }
                            if tx.send(DocumentSnapshot::server(current.clone())).await.is_err() {
                                break;
                            }
                            last = Some(current);
                        }
                    }
                    Err(e) => debug!("document poll failed, will retry: {e}"),
                }
                if tx.is_closed() {
                    break;
                }
                tokio::time::sleep(client.poll_interval).await;
            }
            debug!(key = %key, "document subscription ended");
        });

        Ok(rx)
    }

    async fn write(&self, key: &str, doc: &Value) -> CoreResult<()> {
        // Cache and echo first: the UI-facing snapshot stream sees the write
        // immediately, flagged pending until the server acknowledges it.
        self.store_cached(key, doc);
        fan_out(&self.listeners, key, DocumentSnapshot::pending(doc.clone())).await;

        let res = self
            .http
            .patch(self.document_url(key))
            .json(doc)
            .send()
            .await
            .map_err(|e| CoreError::Store(format!("document write failed: {e}")))?;
        if !res.status().is_success() {
            return Err(CoreError::Store(format!(
                "document write returned {}",
                res.status()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-process client for tests and local demos
// ---------------------------------------------------------------------------

/// In-memory document store. Tests can script write failures and push
/// arbitrary snapshots (e.g. a pending-write echo) into live subscriptions.
#[derive(Default)]
pub struct MemoryDocumentClient {
    docs: DashMap<String, Value>,
    listeners: DashMap<String, Vec<mpsc::Sender<DocumentSnapshot>>>,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<(String, Value)>>,
}

impl MemoryDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a document so the first subscription snapshot carries it.
    pub fn seed(&self, key: &str, doc: Value) {
        self.docs.insert(key.to_string(), doc);
    }

    /// When set, every `write` fails with a store error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every successful write in order, with its payload.
    pub fn written(&self) -> Vec<(String, Value)> {
        self.writes.lock().unwrap().clone()
    }

    /// Pushes an arbitrary snapshot into live subscriptions for `key`.
    pub async fn push_snapshot(&self, key: &str, data: Option<Value>, pending_write: bool) {
        let snapshot = DocumentSnapshot {
            data,
            pending_write,
            from_cache: false,
        };
        let targets: Vec<mpsc::Sender<DocumentSnapshot>> = match self.listeners.get(key) {
            Some(entry) => entry.clone(),
            None => return,
        };
        for tx in targets {
            let _ = tx.send(snapshot.clone()).await;
        }
    }
}

#[async_trait]
impl DocumentClient for MemoryDocumentClient {
    async fn subscribe(&self, key: &str) -> CoreResult<mpsc::Receiver<DocumentSnapshot>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let initial = self.docs.get(key).map(|v| v.clone());
        let _ = tx.send(DocumentSnapshot::server(initial)).await;
        self.listeners.entry(key.to_string()).or_default().push(tx);
        Ok(rx)
    }

    async fn write(&self, key: &str, doc: &Value) -> CoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Store("write rejected (scripted failure)".into()));
        }
        self.docs.insert(key.to_string(), doc.clone());
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), doc.clone()));
        // Server-acknowledged echo, exactly like a live backend would deliver.
        self.push_snapshot(key, Some(doc.clone()), false).await;
        Ok(())
    }
}
