//! Sync engine: bridges the local state store and the cloud document.
//!
//! Remote → local: genuine server snapshots replace local state wholesale;
//! pending-write echoes of this client's own writes are ignored. Local →
//! remote: every local mutation (re)arms one debounced write that carries the
//! snapshot captured at the last arm, so N rapid edits coalesce into a single
//! write of the Nth state. Local state is always authoritative for the UI;
//! a failed write only downgrades the status indicator.

use crate::document::{DocumentClient, DocumentSnapshot};
use crate::error::CoreError;
use crate::model::AppState;
use crate::store::{ChangeSource, StateStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default quiet period before a local mutation is written out.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Where the engine currently stands. `Loading` until the first genuine
/// server snapshot; `Local` means no cloud backend is configured and none
/// will ever be contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Loading,
    Synced,
    Local,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Loading => "loading",
            SyncStatus::Synced => "synced",
            SyncStatus::Local => "local",
            SyncStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote document key; in production this is the device identity.
    pub document_key: String,
    pub debounce: Duration,
}

impl SyncConfig {
    pub fn new(document_key: impl Into<String>) -> Self {
        Self {
            document_key: document_key.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Handle to a running engine: status stream plus shutdown (the
/// unsubscribe-on-unmount path).
pub struct SyncHandle {
    status_rx: watch::Receiver<SyncStatus>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn status(&self) -> SyncStatus {
        *self.status_rx.borrow()
    }

    /// Watch channel for status transitions (e.g. a header indicator).
    pub fn status_stream(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// Stops the listener task and drops the document subscription. Further
    /// local mutations still apply; they just stop being persisted.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

pub struct SyncEngine;

impl SyncEngine {
    /// Starts the engine. With no client configured the status flips straight
    /// to `Local` and no task is spawned.
    pub fn start(
        store: Arc<StateStore>,
        client: Option<Arc<dyn DocumentClient>>,
        config: SyncConfig,
    ) -> SyncHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let Some(client) = client else {
            info!("no document backend configured; running local-only");
            let (status_tx, status_rx) = watch::channel(SyncStatus::Local);
            drop(status_tx);
            return SyncHandle {
                status_rx,
                shutdown_tx,
                task: None,
            };
        };

        let (status_tx, status_rx) = watch::channel(SyncStatus::Loading);
        let task = tokio::spawn(run(store, client, config, status_tx, shutdown_rx));
        SyncHandle {
            status_rx,
            shutdown_tx,
            task: Some(task),
        }
    }
}

async fn run(
    store: Arc<StateStore>,
    client: Arc<dyn DocumentClient>,
    config: SyncConfig,
    status_tx: watch::Sender<SyncStatus>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut local_rx = store.subscribe();
    let mut remote_rx = match client.subscribe(&config.document_key).await {
        Ok(rx) => rx,
        Err(e) => {
            warn!("document subscription failed: {e}");
            let _ = status_tx.send(SyncStatus::Error);
            return;
        }
    };

    // The debounced writer: only the latest snapshot and one deadline exist
    // at any time, so the write that eventually fires is last-scheduled-wins.
    let mut pending: Option<AppState> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let flush = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            changed = local_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let change = local_rx.borrow_and_update().clone();
                if change.source == ChangeSource::Local {
                    pending = Some(change.state);
                    deadline = Some(Instant::now() + config.debounce);
                }
            }
            snapshot = remote_rx.recv() => {
                match snapshot {
                    Some(snapshot) => apply_snapshot(&store, &client, &config, &status_tx, snapshot).await,
                    None => {
                        debug!("document snapshot stream closed");
                        break;
                    }
                }
            }
            _ = flush => {
                deadline = None;
                if let Some(state) = pending.take() {
                    flush_state(&client, &config, &status_tx, &state).await;
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("sync engine shutting down");
                break;
            }
        }
    }
}

/// Handles one incoming snapshot per the policy in the module docs. A cached
/// replay hydrates the UI early but never counts as server confirmation; an
/// absent document (first run or remote deletion, one policy for both) seeds
/// the remote with the current local state.
async fn apply_snapshot(
    store: &StateStore,
    client: &Arc<dyn DocumentClient>,
    config: &SyncConfig,
    status_tx: &watch::Sender<SyncStatus>,
    snapshot: DocumentSnapshot,
) {
    if snapshot.pending_write {
        debug!("ignoring pending-write echo");
        return;
    }
    match snapshot.data {
        Some(value) => match serde_json::from_value::<AppState>(value) {
            Ok(state) => {
                store.hydrate(state);
                if snapshot.from_cache {
                    debug!("hydrated from local cache; awaiting server snapshot");
                } else {
                    let _ = status_tx.send(SyncStatus::Synced);
                }
            }
            Err(e) => warn!("dropping undecodable remote document: {e}"),
        },
        None => {
            info!("remote document absent; seeding with local state");
            let state = store.get();
            flush_state(client, config, status_tx, &state).await;
        }
    }
}

async fn flush_state(
    client: &Arc<dyn DocumentClient>,
    config: &SyncConfig,
    status_tx: &watch::Sender<SyncStatus>,
    state: &AppState,
) {
    match write_state(client, &config.document_key, state).await {
        Ok(()) => {
            let _ = status_tx.send(SyncStatus::Synced);
        }
        Err(e) => {
            // No rollback and no retry here: local state stays authoritative
            // and the next mutation re-arms the writer.
            warn!("document write failed: {e}");
            let _ = status_tx.send(SyncStatus::Error);
        }
    }
}

async fn write_state(
    client: &Arc<dyn DocumentClient>,
    key: &str,
    state: &AppState,
) -> Result<(), CoreError> {
    let doc = serde_json::to_value(state)?;
    client.write(key, &doc).await
}
