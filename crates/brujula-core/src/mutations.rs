//! The mutation command set: every state change is a named pure function
//! `(&AppState, args, now_ms) -> AppState`.
//!
//! Commands never panic and never fail: invalid input (unknown id, deleting
//! the last role, scheduling an already-scheduled step) returns the snapshot
//! unchanged. Callers pass `now_ms` so commands stay deterministic under test;
//! [`crate::StateStore::apply`] supplies the wall clock in production.

use crate::model::{
    AppState, ChatMessage, ChatRole, CoachMode, Project, ProjectStep, Quadrant, Role, Task,
};
use tracing::debug;
use uuid::Uuid;

/// Draft for a new task. `quadrant` II forces the big-rock flag regardless of
/// what the draft says.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub role_id: String,
    pub quadrant: Quadrant,
    pub is_big_rock: bool,
    pub day: Option<u8>,
    pub week_offset: i32,
    pub time: Option<String>,
    pub duration_min: Option<u32>,
    pub project_id: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, role_id: impl Into<String>, quadrant: Quadrant) -> Self {
        Self {
            title: title.into(),
            role_id: role_id.into(),
            quadrant,
            is_big_rock: quadrant == Quadrant::II,
            day: None,
            week_offset: 0,
            time: None,
            duration_min: None,
            project_id: None,
        }
    }

    pub fn on_day(mut self, day: u8, week_offset: i32) -> Self {
        self.day = Some(day);
        self.week_offset = week_offset;
        self
    }

    pub fn at_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// Draft for a new project.
#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub role_id: String,
    pub area: String,
    pub target_sessions: u32,
}

/// Default session budget for projects created without one (e.g. from a coach
/// action, which carries no session field on the wire).
pub const DEFAULT_TARGET_SESSIONS: u32 = 10;

impl ProjectDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        role_id: impl Into<String>,
        area: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            role_id: role_id.into(),
            area: area.into(),
            target_sessions: DEFAULT_TARGET_SESSIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Mission & roles
// ---------------------------------------------------------------------------

pub fn set_mission(state: &AppState, text: &str, now_ms: i64) -> AppState {
    let mut next = state.clone();
    next.mission.text = text.to_string();
    next.mission.updated_at_ms = now_ms;
    next
}

pub fn add_role(state: &AppState, name: &str, now_ms: i64) -> AppState {
    let name = name.trim();
    if name.is_empty() {
        return state.clone();
    }
    let mut next = state.clone();
    next.roles.push(Role::new(name, now_ms));
    next
}

/// Applies `edit` to the matching role and stamps it. Unknown id is a no-op.
pub fn update_role<F>(state: &AppState, role_id: &str, edit: F, now_ms: i64) -> AppState
where
    F: FnOnce(&mut Role),
{
    let mut next = state.clone();
    match next.roles.iter_mut().find(|r| r.id == role_id) {
        Some(role) => {
            edit(role);
            role.updated_at_ms = now_ms;
            next
        }
        None => state.clone(),
    }
}

/// Deletes a role and cascades to every task and project referencing it.
/// Deleting the last remaining role is a no-op.
pub fn delete_role(state: &AppState, role_id: &str, _now_ms: i64) -> AppState {
    if state.roles.len() <= 1 || state.role(role_id).is_none() {
        debug!(role_id, "delete_role rejected (last role or unknown id)");
        return state.clone();
    }
    let mut next = state.clone();
    next.roles.retain(|r| r.id != role_id);
    next.tasks.retain(|t| t.role_id != role_id);
    next.projects.retain(|p| p.role_id != role_id);
    next
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub fn add_task(state: &AppState, draft: TaskDraft, now_ms: i64) -> AppState {
    let title = draft.title.trim();
    if title.is_empty() || state.role(&draft.role_id).is_none() {
        debug!("add_task rejected (empty title or unknown role)");
        return state.clone();
    }
    let day = draft.day.filter(|d| *d <= 6);
    let mut next = state.clone();
    next.tasks.push(Task {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        role_id: draft.role_id,
        is_big_rock: draft.is_big_rock || draft.quadrant == Quadrant::II,
        day,
        week_offset: draft.week_offset,
        time: draft.time,
        duration_min: draft.duration_min,
        quadrant: draft.quadrant,
        completed: false,
        project_id: draft.project_id,
        updated_at_ms: now_ms,
    });
    next
}

/// Applies `edit` to the matching task, re-asserts the quadrant-II big-rock
/// rule, and stamps it. Unknown id is a no-op.
pub fn update_task<F>(state: &AppState, task_id: &str, edit: F, now_ms: i64) -> AppState
where
    F: FnOnce(&mut Task),
{
    let mut next = state.clone();
    match next.tasks.iter_mut().find(|t| t.id == task_id) {
        Some(task) => {
            edit(task);
            if task.quadrant == Quadrant::II {
                task.is_big_rock = true;
            }
            task.updated_at_ms = now_ms;
            next
        }
        None => state.clone(),
    }
}

/// Flips completion. A task scheduled from a project step also flips the step
/// and moves the project's completed-session counter in the same direction.
pub fn toggle_task(state: &AppState, task_id: &str, now_ms: i64) -> AppState {
    let Some(task) = state.task(task_id) else {
        return state.clone();
    };
    let completed = !task.completed;
    let project_id = task.project_id.clone();

    let mut next = update_task(state, task_id, |t| t.completed = completed, now_ms);
    if let Some(project_id) = project_id {
        if let Some(project) = next.projects.iter_mut().find(|p| p.id == project_id) {
            if let Some(step) = project
                .steps
                .iter_mut()
                .find(|s| s.task_id.as_deref() == Some(task_id))
            {
                step.completed = completed;
            }
            project.completed_sessions = if completed {
                (project.completed_sessions + 1).min(project.target_sessions.max(1))
            } else {
                project.completed_sessions.saturating_sub(1)
            };
            project.updated_at_ms = now_ms;
        }
    }
    next
}

/// Moves a task to a day slot (or back to the inbox with `day = None`).
pub fn move_task(
    state: &AppState,
    task_id: &str,
    day: Option<u8>,
    week_offset: i32,
    now_ms: i64,
) -> AppState {
    if day.is_some_and(|d| d > 6) {
        return state.clone();
    }
    update_task(
        state,
        task_id,
        |t| {
            t.day = day;
            t.week_offset = week_offset;
        },
        now_ms,
    )
}

/// Reclassifies a task. Quadrant II forces `is_big_rock`; any other quadrant
/// leaves the flag at its prior value.
pub fn set_task_quadrant(state: &AppState, task_id: &str, quadrant: Quadrant, now_ms: i64) -> AppState {
    update_task(state, task_id, |t| t.quadrant = quadrant, now_ms)
}

/// Deletes a task and clears the back-reference on any step that scheduled it,
/// so the step can be scheduled again.
pub fn delete_task(state: &AppState, task_id: &str, _now_ms: i64) -> AppState {
    if state.task(task_id).is_none() {
        return state.clone();
    }
    let mut next = state.clone();
    next.tasks.retain(|t| t.id != task_id);
    for project in &mut next.projects {
        for step in &mut project.steps {
            if step.task_id.as_deref() == Some(task_id) {
                step.task_id = None;
            }
        }
    }
    next
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub fn add_project(state: &AppState, draft: ProjectDraft, now_ms: i64) -> AppState {
    let title = draft.title.trim();
    if title.is_empty() || state.role(&draft.role_id).is_none() {
        debug!("add_project rejected (empty title or unknown role)");
        return state.clone();
    }
    let mut next = state.clone();
    next.projects.push(Project {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: draft.description,
        role_id: draft.role_id,
        area: draft.area,
        target_sessions: draft.target_sessions.max(1),
        completed_sessions: 0,
        steps: Vec::new(),
        updated_at_ms: now_ms,
    });
    next
}

pub fn update_project<F>(state: &AppState, project_id: &str, edit: F, now_ms: i64) -> AppState
where
    F: FnOnce(&mut Project),
{
    let mut next = state.clone();
    match next.projects.iter_mut().find(|p| p.id == project_id) {
        Some(project) => {
            edit(project);
            project.updated_at_ms = now_ms;
            next
        }
        None => state.clone(),
    }
}

pub fn delete_project(state: &AppState, project_id: &str, _now_ms: i64) -> AppState {
    if state.project(project_id).is_none() {
        return state.clone();
    }
    let mut next = state.clone();
    next.projects.retain(|p| p.id != project_id);
    // Tasks scheduled from the project stay on the week but lose the link.
    for task in &mut next.tasks {
        if task.project_id.as_deref() == Some(project_id) {
            task.project_id = None;
        }
    }
    next
}

/// Replaces the whole step list (breakdown regeneration). Only called on a
/// successful coach response; a failed regeneration never reaches this point.
pub fn set_project_steps(
    state: &AppState,
    project_id: &str,
    steps: Vec<ProjectStep>,
    now_ms: i64,
) -> AppState {
    update_project(state, project_id, |p| p.steps = steps, now_ms)
}

pub fn toggle_project_step(state: &AppState, project_id: &str, step_id: &str, now_ms: i64) -> AppState {
    update_project(
        state,
        project_id,
        |p| {
            if let Some(step) = p.steps.iter_mut().find(|s| s.id == step_id) {
                step.completed = !step.completed;
            }
        },
        now_ms,
    )
}

/// Schedules a step into a concrete task on the given day and stamps the
/// step's `task_id`. A step that already owns a task is a no-op (the gate that
/// keeps one-step-to-at-most-one-task).
pub fn schedule_step(
    state: &AppState,
    project_id: &str,
    step_id: &str,
    day: u8,
    week_offset: i32,
    now_ms: i64,
) -> AppState {
    if day > 6 {
        return state.clone();
    }
    let Some(project) = state.project(project_id) else {
        return state.clone();
    };
    let Some(step) = project.steps.iter().find(|s| s.id == step_id) else {
        return state.clone();
    };
    if step.task_id.is_some() {
        debug!(step_id, "schedule_step rejected (step already scheduled)");
        return state.clone();
    }

    let task_id = Uuid::new_v4().to_string();
    let mut next = state.clone();
    next.tasks.push(Task {
        id: task_id.clone(),
        title: step.text.clone(),
        role_id: project.role_id.clone(),
        is_big_rock: true,
        day: Some(day),
        week_offset,
        time: None,
        duration_min: None,
        quadrant: Quadrant::II,
        completed: false,
        project_id: Some(project.id.clone()),
        updated_at_ms: now_ms,
    });
    if let Some(project) = next.projects.iter_mut().find(|p| p.id == project_id) {
        if let Some(step) = project.steps.iter_mut().find(|s| s.id == step_id) {
            step.task_id = Some(task_id);
        }
        project.updated_at_ms = now_ms;
    }
    next
}

// ---------------------------------------------------------------------------
// Coach transcript
// ---------------------------------------------------------------------------

pub fn set_coach_mode(state: &AppState, mode: CoachMode, _now_ms: i64) -> AppState {
    let mut next = state.clone();
    next.coach_mode = mode;
    next
}

pub fn append_chat(
    state: &AppState,
    mode: CoachMode,
    role: ChatRole,
    text: &str,
    now_ms: i64,
) -> AppState {
    let mut next = state.clone();
    next.coach_messages
        .entry(mode)
        .or_default()
        .push(ChatMessage::new(role, text, now_ms));
    next
}
