//! brujula-core: planner state, the mutation command set, and cloud document
//! sync.
//!
//! The UI layer (out of tree) holds an `Arc<StateStore>`, applies commands
//! from [`mutations`], and renders `get()`. A [`SyncEngine`] attached to the
//! same store mirrors every local change to one cloud document keyed by the
//! [`DeviceIdentity`], debounced and last-writer-wins.

mod config;
mod document;
mod error;
mod identity;
pub mod model;
pub mod mutations;
mod store;
mod sync;

pub use config::{AppConfig, UserConfig};
pub use document::{DocumentClient, DocumentSnapshot, MemoryDocumentClient, RestDocumentClient};
pub use error::{CoreError, CoreResult};
pub use identity::DeviceIdentity;
pub use model::{
    AppState, ChatMessage, ChatRole, CoachMode, Mission, Project, ProjectStep, Quadrant, Role,
    Task, UserSettings,
};
pub use mutations::{ProjectDraft, TaskDraft, DEFAULT_TARGET_SESSIONS};
pub use store::{ChangeSource, StateChange, StateStore};
pub use sync::{SyncConfig, SyncEngine, SyncHandle, SyncStatus, DEFAULT_DEBOUNCE};
