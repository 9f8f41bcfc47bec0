//! Planner entities: mission, roles, weekly tasks, projects, and the coach transcript.
//!
//! Everything here is a plain value record. Mutations never edit in place; the
//! command set in [`crate::mutations`] takes a snapshot and returns a new one,
//! which is what makes change detection and the cloud document trivial. The
//! whole [`AppState`] serializes to a single JSON object with camelCase keys,
//! matching the remote document format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Eisenhower quadrant: urgency/importance classification for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Urgent and important.
    I,
    /// Important, not urgent ("big rock" territory).
    II,
    /// Urgent, not important.
    III,
    /// Neither.
    IV,
}

impl Quadrant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::I => "I",
            Quadrant::II => "II",
            Quadrant::III => "III",
            Quadrant::IV => "IV",
        }
    }

    /// Parses "I".."IV" (case-insensitive). Unknown input maps to None.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "I" => Some(Quadrant::I),
            "II" => Some(Quadrant::II),
            "III" => Some(Quadrant::III),
            "IV" => Some(Quadrant::IV),
            _ => None,
        }
    }
}

/// Coach persona. Governs the system directive sent to the model and the
/// synthesized voice; the transcript is kept per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachMode {
    Strategist,
    Financial,
    BusinessOwner,
    ZenEnergy,
    Socratic,
}

impl CoachMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoachMode::Strategist => "strategist",
            CoachMode::Financial => "financial",
            CoachMode::BusinessOwner => "business_owner",
            CoachMode::ZenEnergy => "zen_energy",
            CoachMode::Socratic => "socratic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strategist" => Some(CoachMode::Strategist),
            "financial" => Some(CoachMode::Financial),
            "business_owner" => Some(CoachMode::BusinessOwner),
            "zen_energy" => Some(CoachMode::ZenEnergy),
            "socratic" => Some(CoachMode::Socratic),
            _ => None,
        }
    }

    /// All modes in display order.
    pub fn all() -> [Self; 5] {
        [
            CoachMode::Strategist,
            CoachMode::Financial,
            CoachMode::BusinessOwner,
            CoachMode::ZenEnergy,
            CoachMode::Socratic,
        ]
    }
}

/// Who wrote a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Coach,
}

/// One turn in a coach transcript. Transcripts are append-only and never
/// truncated automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Millisecond UTC timestamp; also the playback key for voice output.
    pub timestamp_ms: i64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp_ms,
        }
    }
}

/// The personal mission statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub updated_at_ms: i64,
}

/// A life role (e.g. "Engineer", "Parent"). Tasks and projects reference roles
/// by id; deleting a role cascades to everything referencing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub color: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Role {
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            icon: String::new(),
            goal: String::new(),
            color: String::new(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }
}

/// A weekly task. `day = None` keeps it in the unscheduled inbox for its week;
/// `week_offset = 0` is the current week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub role_id: String,
    /// High-impact flag. Forced true whenever the task sits in quadrant II.
    #[serde(default)]
    pub is_big_rock: bool,
    /// 0 (Monday) .. 6 (Sunday); None = inbox.
    #[serde(default)]
    pub day: Option<u8>,
    #[serde(default)]
    pub week_offset: i32,
    /// Optional "HH:MM" start.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration_min: Option<u32>,
    pub quadrant: Quadrant,
    #[serde(default)]
    pub completed: bool,
    /// Back-reference set when the task was scheduled from a project step.
    #[serde(default)]
    pub project_id: Option<String>,
    pub updated_at_ms: i64,
}

/// One step inside a project breakdown. `task_id` is stamped once the step is
/// scheduled into a concrete task; a step never owns more than one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStep {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl ProjectStep {
    pub fn new(text: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            instruction: instruction.into(),
            completed: false,
            task_id: None,
        }
    }
}

/// A project / OKR with a session budget and an ordered step breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub role_id: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub target_sessions: u32,
    #[serde(default)]
    pub completed_sessions: u32,
    #[serde(default)]
    pub steps: Vec<ProjectStep>,
    pub updated_at_ms: i64,
}

/// User-facing settings mirrored into the cloud document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_voice_enabled")]
    pub voice_enabled: bool,
}

fn default_voice_enabled() -> bool {
    true
}

/// Root aggregate. One `AppState` is the whole planner; it is mirrored 1:1 to
/// the remote document keyed by the device identity.
///
/// Invariant: `roles` is never empty. [`AppState::bootstrap`] seeds the first
/// role, and the mutation command set refuses to delete the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub mission: Mission,
    pub roles: Vec<Role>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default = "default_coach_mode")]
    pub coach_mode: CoachMode,
    #[serde(default)]
    pub coach_messages: HashMap<CoachMode, Vec<ChatMessage>>,
    #[serde(default)]
    pub settings: UserSettings,
}

fn default_coach_mode() -> CoachMode {
    CoachMode::Strategist
}

impl AppState {
    /// Fresh state for a first run: empty planner with one seed role.
    pub fn bootstrap(now_ms: i64) -> Self {
        Self {
            mission: Mission::default(),
            roles: vec![Role::new("Personal", now_ms)],
            tasks: Vec::new(),
            projects: Vec::new(),
            coach_mode: CoachMode::Strategist,
            coach_messages: HashMap::new(),
            settings: UserSettings::default(),
        }
    }

    pub fn role(&self, role_id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    /// Transcript for a mode; empty slice when the mode has never been used.
    pub fn transcript(&self, mode: CoachMode) -> &[ChatMessage] {
        self.coach_messages.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }
}
