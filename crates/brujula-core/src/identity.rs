//! Device identity: the opaque id that keys the remote document.
//!
//! Generated once, persisted beside the user config, and reused across runs.
//! Resetting clears the file and mints a fresh id, which effectively detaches
//! the device from its cloud document.

use crate::error::CoreResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub struct DeviceIdentity {
    id: String,
    path: PathBuf,
}

impl DeviceIdentity {
    /// Loads the persisted id, or generates and persists a new one.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Ok(raw) = fs::read_to_string(&path) {
            let id = raw.trim().to_string();
            if !id.is_empty() {
                return Ok(Self { id, path });
            }
        }
        let identity = Self {
            id: Uuid::new_v4().to_string(),
            path,
        };
        identity.persist()?;
        info!("generated new device identity");
        Ok(identity)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mints a fresh id and persists it. The caller is expected to restart
    /// the sync engine afterwards; the old document is left behind.
    pub fn reset(&mut self) -> CoreResult<&str> {
        self.id = Uuid::new_v4().to_string();
        self.persist()?;
        info!("device identity reset");
        Ok(&self.id)
    }

    fn persist(&self) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &self.id)?;
        Ok(())
    }
}
