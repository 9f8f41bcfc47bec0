//! The local state store: one owned [`AppState`] behind a controlled mutation
//! API.
//!
//! The UI renders whatever `get()` returns; every successful mutation
//! broadcasts the full resulting snapshot on a watch channel so the sync
//! engine can schedule a write-back. Remote snapshots come in through
//! [`StateStore::hydrate`], which broadcasts with `source = Remote` so the
//! sync engine never echoes them back out.

use crate::model::AppState;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::watch;

/// Where a snapshot came from. The sync engine only schedules writes for
/// `Local` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Local,
    Remote,
}

/// A broadcast state snapshot. `seq` is monotonically increasing; the watch
/// channel only keeps the latest value, which is exactly the
/// last-scheduled-wins behavior the debounced writer wants.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub seq: u64,
    pub source: ChangeSource,
    pub state: AppState,
}

pub struct StateStore {
    inner: RwLock<AppState>,
    seq: AtomicU64,
    tx: watch::Sender<StateChange>,
}

impl StateStore {
    pub fn new(initial: AppState) -> Self {
        let (tx, _rx) = watch::channel(StateChange {
            seq: 0,
            source: ChangeSource::Local,
            state: initial.clone(),
        });
        Self {
            inner: RwLock::new(initial),
            seq: AtomicU64::new(0),
            tx,
        }
    }

    /// Fresh store seeded with [`AppState::bootstrap`].
    pub fn bootstrap() -> Self {
        Self::new(AppState::bootstrap(Utc::now().timestamp_millis()))
    }

    /// Current snapshot.
    pub fn get(&self) -> AppState {
        self.inner.read().unwrap().clone()
    }

    /// Applies a mutation command and broadcasts the result. The command
    /// receives the current snapshot and the wall-clock `now_ms` used for
    /// entity stamping. Returns the resulting snapshot.
    pub fn apply<F>(&self, command: F) -> AppState
    where
        F: FnOnce(&AppState, i64) -> AppState,
    {
        let now_ms = Utc::now().timestamp_millis();
        let next = {
            let mut guard = self.inner.write().unwrap();
            let next = command(&guard, now_ms);
            *guard = next.clone();
            next
        };
        self.broadcast(ChangeSource::Local, next.clone());
        next
    }

    /// Replaces local state wholesale with a remote snapshot. The broadcast is
    /// tagged `Remote`, so the sync engine treats it as already persisted.
    pub fn hydrate(&self, state: AppState) -> AppState {
        {
            let mut guard = self.inner.write().unwrap();
            *guard = state.clone();
        }
        self.broadcast(ChangeSource::Remote, state.clone());
        state
    }

    /// Watch channel delivering every state change; receivers that lag only
    /// ever see the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StateChange> {
        self.tx.subscribe()
    }

    fn broadcast(&self, source: ChangeSource, state: AppState) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        // Send only fails when every receiver is gone, which is fine: the
        // store keeps working without a sync engine attached.
        let _ = self.tx.send(StateChange { seq, source, state });
    }
}
