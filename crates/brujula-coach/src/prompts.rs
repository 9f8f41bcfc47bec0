//! Persona directives and prompt assembly.
//!
//! The context window is bounded on purpose: role list, the last
//! [`RECENT_COMPLETED_LIMIT`] completed tasks, project summaries, and the
//! transcript of the active mode. Everything else stays local.

use crate::genai::{Content, FunctionDecl};
use brujula_core::{AppState, ChatRole, CoachMode};
use serde_json::{json, Value};

/// How many recently completed tasks travel with each request.
pub const RECENT_COMPLETED_LIMIT: usize = 15;

/// Wire name of the create-task function exposed to the model.
pub const FN_CREATE_TASK: &str = "crear_tarea";
/// Wire name of the create-project function exposed to the model.
pub const FN_CREATE_PROJECT: &str = "crear_proyecto";

/// System directive for a coach persona.
pub fn system_directive(mode: CoachMode) -> &'static str {
    match mode {
        CoachMode::Strategist => {
            "You are a personal strategy coach in the Covey tradition. Keep the \
             user anchored to their mission and roles, push weekly big rocks \
             over busywork, and answer in two short paragraphs at most. When \
             the user commits to something concrete, propose it as a task or \
             project instead of describing it."
        }
        CoachMode::Financial => {
            "You are a pragmatic personal-finance coach. Tie every suggestion \
             to a measurable number and a deadline, prefer boring repeatable \
             systems over hot ideas, and flag anything that smells like risk \
             the user has not priced in."
        }
        CoachMode::BusinessOwner => {
            "You are a seasoned business owner mentoring another owner. Think \
             in offers, pipelines, and delegation. Challenge the user to drop \
             work an employee or a system could do, and turn commitments into \
             scheduled tasks."
        }
        CoachMode::ZenEnergy => {
            "You are a calm energy-management coach. Watch for overload in the \
             user's week, suggest recovery before throughput, and keep answers \
             short, warm, and concrete. Never add pressure."
        }
        CoachMode::Socratic => {
            "You are a Socratic coach. Lead with questions, never with advice. \
             One question at a time, each one sharper than the last, until the \
             user states their own next step; only then offer to schedule it."
        }
    }
}

/// Serializes the bounded planner context plus transcript into request turns.
/// The final element is always the new user message.
pub fn build_context(state: &AppState, mode: CoachMode, user_message: &str) -> Vec<Content> {
    let mut contents = vec![Content::user(context_block(state))];
    for message in state.transcript(mode) {
        contents.push(match message.role {
            ChatRole::User => Content::user(message.text.clone()),
            ChatRole::Coach => Content::model(message.text.clone()),
        });
    }
    contents.push(Content::user(user_message));
    contents
}

fn context_block(state: &AppState) -> String {
    let mut block = String::from("Planner context (do not echo back):\n");

    if !state.mission.text.trim().is_empty() {
        block.push_str(&format!("Mission: {}\n", state.mission.text.trim()));
    }

    block.push_str("Roles:\n");
    for role in &state.roles {
        if role.goal.trim().is_empty() {
            block.push_str(&format!("- {} (id {})\n", role.name, role.id));
        } else {
            block.push_str(&format!("- {} (id {}): {}\n", role.name, role.id, role.goal));
        }
    }

    let mut completed: Vec<_> = state.tasks.iter().filter(|t| t.completed).collect();
    completed.sort_by_key(|t| std::cmp::Reverse(t.updated_at_ms));
    if !completed.is_empty() {
        block.push_str("Recently completed:\n");
        for task in completed.into_iter().take(RECENT_COMPLETED_LIMIT) {
            block.push_str(&format!("- [{}] {}\n", task.quadrant.as_str(), task.title));
        }
    }

    if !state.projects.is_empty() {
        block.push_str("Projects:\n");
        for project in &state.projects {
            block.push_str(&format!(
                "- {} ({}): {}/{} sessions\n",
                project.title, project.area, project.completed_sessions, project.target_sessions
            ));
        }
    }

    block
}

/// The two functions the model may call. Names and argument keys are the wire
/// contract; anything else coming back is rejected at the boundary.
pub fn function_declarations() -> Vec<FunctionDecl> {
    vec![
        FunctionDecl {
            name: FN_CREATE_TASK.to_string(),
            description: "Create a weekly task for the user after they agree to it."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "roleId": {"type": "string", "description": "Id of an existing role"},
                    "quadrant": {"type": "string", "enum": ["I", "II", "III", "IV"]},
                    "day": {"type": "integer", "minimum": 0, "maximum": 6},
                    "time": {"type": "string", "description": "HH:MM, optional"}
                },
                "required": ["title", "roleId"]
            }),
        },
        FunctionDecl {
            name: FN_CREATE_PROJECT.to_string(),
            description: "Create a project with a session budget after the user agrees to it."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "roleId": {"type": "string", "description": "Id of an existing role"},
                    "area": {"type": "string"}
                },
                "required": ["title", "description", "roleId", "area"]
            }),
        },
    ]
}

/// Prompt + response schema for a project breakdown request.
pub fn breakdown_prompt(title: &str, description: &str) -> String {
    format!(
        "Break the following project into 5 to 8 ordered, concrete steps. \
         Each step needs a short imperative 'text' and an 'instruction' with \
         enough detail to start working immediately.\n\nProject: {title}\n{description}"
    )
}

pub fn breakdown_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "text": {"type": "string"},
                "instruction": {"type": "string"}
            },
            "required": ["text", "instruction"]
        }
    })
}

/// Prompt + response schema for an objective-improvement request.
pub fn improvement_prompt(title: &str, description: &str) -> String {
    format!(
        "Rewrite this objective so the title is a crisp outcome and the \
         description states the measurable result and the constraint that \
         matters most. Keep the user's language.\n\nTitle: {title}\nDescription: {description}"
    )
}

pub fn improvement_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "description": {"type": "string"}
        },
        "required": ["title", "description"]
    })
}
