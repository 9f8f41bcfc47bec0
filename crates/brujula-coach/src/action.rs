//! Pending structured actions: the typed boundary between loosely-shaped
//! model function calls and actual state mutations.
//!
//! A call either converts into a validated [`ProposedAction`] held for
//! explicit user confirmation, or it is logged and dropped. Nothing the model
//! proposes ever touches state without an authorize.

use crate::genai::FunctionCall;
use crate::prompts::{FN_CREATE_PROJECT, FN_CREATE_TASK};
use brujula_core::Quadrant;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Arguments of a `crear_tarea` call. `quadrant` is optional on the wire and
/// defaults to II (big rock) at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskArgs {
    pub title: String,
    #[serde(rename = "roleId")]
    pub role_id: String,
    #[serde(default, with = "quadrant_str")]
    pub quadrant: Option<Quadrant>,
    #[serde(default)]
    pub day: Option<u8>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Arguments of a `crear_proyecto` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProjectArgs {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "roleId")]
    pub role_id: String,
    #[serde(default)]
    pub area: String,
}

/// Quadrants arrive as `"I".."IV"` strings; anything unparseable is treated
/// as absent rather than failing the whole action.
mod quadrant_str {
    use brujula_core::Quadrant;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(q: &Option<Quadrant>, s: S) -> Result<S::Ok, S::Error> {
        match q {
            Some(q) => s.serialize_str(q.as_str()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Quadrant>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(Quadrant::from_str))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposedAction {
    CreateTask(CreateTaskArgs),
    CreateProject(CreateProjectArgs),
}

impl ProposedAction {
    /// Converts a raw function call. Unknown names and undecodable argument
    /// objects return None (logged), as do structurally empty actions.
    pub fn from_function_call(call: &FunctionCall) -> Option<Self> {
        let action = match call.name.as_str() {
            FN_CREATE_TASK => serde_json::from_value::<CreateTaskArgs>(call.args.clone())
                .map(Self::CreateTask)
                .map_err(|e| warn!("dropping malformed {FN_CREATE_TASK} call: {e}"))
                .ok()?,
            FN_CREATE_PROJECT => serde_json::from_value::<CreateProjectArgs>(call.args.clone())
                .map(Self::CreateProject)
                .map_err(|e| warn!("dropping malformed {FN_CREATE_PROJECT} call: {e}"))
                .ok()?,
            other => {
                warn!(name = other, "dropping unrecognized function call");
                return None;
            }
        };
        if action.is_valid() {
            Some(action)
        } else {
            warn!("dropping structurally empty action");
            None
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            ProposedAction::CreateTask(args) => {
                !args.title.trim().is_empty() && !args.role_id.trim().is_empty()
            }
            ProposedAction::CreateProject(args) => {
                !args.title.trim().is_empty() && !args.role_id.trim().is_empty()
            }
        }
    }

    /// Short human-readable label for the confirmation UI.
    pub fn summary(&self) -> String {
        match self {
            ProposedAction::CreateTask(args) => format!("Task: {}", args.title),
            ProposedAction::CreateProject(args) => format!("Project: {}", args.title),
        }
    }
}

/// A proposed action waiting for the user's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    pub action: ProposedAction,
}

impl PendingAction {
    pub fn new(action: ProposedAction) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action,
        }
    }
}
