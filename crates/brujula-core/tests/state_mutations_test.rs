//! Integration tests: the mutation command set and its invariants.
//!
//! ## Scenarios
//! 1. Task commands keep the count invariant (add/update/delete).
//! 2. The last role can never be deleted; otherwise deletion cascades.
//! 3. Quadrant II forces the big-rock flag; other quadrants leave it alone.
//! 4. Step scheduling creates one back-linked task and respects the
//!    already-scheduled gate.
//! 5. End-to-end: add in quadrant I, reclassify to II.

use brujula_core::model::{AppState, ChatRole, CoachMode, ProjectStep, Quadrant};
use brujula_core::mutations::{self, ProjectDraft, TaskDraft};

const NOW: i64 = 1_700_000_000_000;

/// Two roles, one task each, one project on the second role.
fn populated_state() -> AppState {
    let state = AppState::bootstrap(NOW);
    let state = mutations::add_role(&state, "Engineer", NOW);
    let personal = state.roles[0].id.clone();
    let engineer = state.roles[1].id.clone();

    let state = mutations::add_task(
        &state,
        TaskDraft::new("Water the plants", personal.as_str(), Quadrant::IV),
        NOW,
    );
    let state = mutations::add_task(
        &state,
        TaskDraft::new("Review design doc", engineer.as_str(), Quadrant::I).on_day(2, 0),
        NOW,
    );
    mutations::add_project(
        &state,
        ProjectDraft::new("Ship v2", "The big rewrite", engineer.as_str(), "Work"),
        NOW,
    )
}

// ===========================================================================
// Test 1: count invariant
// ===========================================================================

#[test]
fn task_commands_keep_the_count_invariant() {
    let state = populated_state();
    let before = state.tasks.len();
    let role = state.roles[0].id.clone();
    let task_id = state.tasks[0].id.clone();

    let added = mutations::add_task(&state, TaskDraft::new("New", role.as_str(), Quadrant::III), NOW);
    assert_eq!(added.tasks.len(), before + 1);

    let toggled = mutations::toggle_task(&state, &task_id, NOW);
    assert_eq!(toggled.tasks.len(), before, "toggle must not change the count");

    let moved = mutations::move_task(&state, &task_id, Some(5), 1, NOW);
    assert_eq!(moved.tasks.len(), before, "move must not change the count");

    let deleted = mutations::delete_task(&state, &task_id, NOW);
    assert_eq!(deleted.tasks.len(), before - 1);
}

#[test]
fn invalid_drafts_are_no_ops() {
    let state = populated_state();
    let role = state.roles[0].id.clone();

    let blank = mutations::add_task(&state, TaskDraft::new("   ", role.as_str(), Quadrant::I), NOW);
    assert_eq!(blank, state, "blank title must not create a task");

    let orphan = mutations::add_task(&state, TaskDraft::new("X", "no-such-role", Quadrant::I), NOW);
    assert_eq!(orphan, state, "unknown role must not create a task");
}

// ===========================================================================
// Test 2: role deletion
// ===========================================================================

#[test]
fn deleting_the_last_role_is_a_no_op() {
    let state = AppState::bootstrap(NOW);
    assert_eq!(state.roles.len(), 1);
    let only_role = state.roles[0].id.clone();

    let after = mutations::delete_role(&state, &only_role, NOW);
    assert_eq!(after, state, "state must be structurally unchanged");
}

#[test]
fn deleting_a_role_cascades_to_tasks_and_projects() {
    let state = populated_state();
    let engineer = state.roles[1].id.clone();
    assert!(state.tasks.iter().any(|t| t.role_id == engineer));
    assert!(state.projects.iter().any(|p| p.role_id == engineer));

    let after = mutations::delete_role(&state, &engineer, NOW);
    assert_eq!(after.roles.len(), state.roles.len() - 1);
    assert!(
        after.tasks.iter().all(|t| t.role_id != engineer),
        "no surviving task may reference the deleted role"
    );
    assert!(
        after.projects.iter().all(|p| p.role_id != engineer),
        "no surviving project may reference the deleted role"
    );
}

// ===========================================================================
// Test 3: quadrant / big-rock coupling
// ===========================================================================

#[test]
fn quadrant_two_forces_big_rock() {
    let state = populated_state();
    let task_id = state.tasks[0].id.clone();
    assert!(!state.tasks[0].is_big_rock);

    let after = mutations::set_task_quadrant(&state, &task_id, Quadrant::II, NOW);
    let task = after.task(&task_id).unwrap();
    assert_eq!(task.quadrant, Quadrant::II);
    assert!(task.is_big_rock, "quadrant II must force the big-rock flag");
}

#[test]
fn other_quadrants_leave_big_rock_unchanged() {
    let state = populated_state();
    let task_id = state.tasks[0].id.clone();

    // Promote to II first so the flag is set, then demote.
    let promoted = mutations::set_task_quadrant(&state, &task_id, Quadrant::II, NOW);
    let demoted = mutations::set_task_quadrant(&promoted, &task_id, Quadrant::III, NOW);
    assert!(
        demoted.task(&task_id).unwrap().is_big_rock,
        "leaving quadrant II must not clear the flag"
    );

    // And a task that never was a big rock stays that way in I/III/IV.
    for q in [Quadrant::I, Quadrant::III, Quadrant::IV] {
        let after = mutations::set_task_quadrant(&state, &task_id, q, NOW);
        assert!(!after.task(&task_id).unwrap().is_big_rock);
    }
}

// ===========================================================================
// Test 4: step scheduling
// ===========================================================================

#[test]
fn scheduling_a_step_creates_one_backlinked_task() {
    let state = populated_state();
    let project_id = state.projects[0].id.clone();
    let steps = vec![
        ProjectStep::new("Write the RFC", "Cover the storage layer"),
        ProjectStep::new("Prototype", "Spike the sync path"),
    ];
    let state = mutations::set_project_steps(&state, &project_id, steps, NOW);
    let step_id = state.projects[0].steps[0].id.clone();
    let tasks_before = state.tasks.len();

    let after = mutations::schedule_step(&state, &project_id, &step_id, 2, 0, NOW);

    assert_eq!(after.tasks.len(), tasks_before + 1);
    let task = after.tasks.last().unwrap();
    assert_eq!(task.day, Some(2));
    assert_eq!(task.week_offset, 0);
    assert_eq!(task.project_id.as_deref(), Some(project_id.as_str()));
    assert_eq!(task.quadrant, Quadrant::II);
    assert!(task.is_big_rock);

    let step = &after.projects[0].steps[0];
    assert_eq!(
        step.task_id.as_deref(),
        Some(task.id.as_str()),
        "the step must point at the task it was scheduled into"
    );
}

#[test]
fn scheduling_an_already_scheduled_step_is_a_no_op() {
    let state = populated_state();
    let project_id = state.projects[0].id.clone();
    let state = mutations::set_project_steps(
        &state,
        &project_id,
        vec![ProjectStep::new("Write the RFC", "")],
        NOW,
    );
    let step_id = state.projects[0].steps[0].id.clone();

    let once = mutations::schedule_step(&state, &project_id, &step_id, 2, 0, NOW);
    let twice = mutations::schedule_step(&once, &project_id, &step_id, 4, 1, NOW);
    assert_eq!(twice, once, "a step with a task_id must never schedule again");
}

#[test]
fn deleting_a_scheduled_task_reopens_the_step() {
    let state = populated_state();
    let project_id = state.projects[0].id.clone();
    let state = mutations::set_project_steps(
        &state,
        &project_id,
        vec![ProjectStep::new("Write the RFC", "")],
        NOW,
    );
    let step_id = state.projects[0].steps[0].id.clone();

    let scheduled = mutations::schedule_step(&state, &project_id, &step_id, 2, 0, NOW);
    let task_id = scheduled.projects[0].steps[0].task_id.clone().unwrap();

    let after = mutations::delete_task(&scheduled, &task_id, NOW);
    assert!(
        after.projects[0].steps[0].task_id.is_none(),
        "deleting the task must clear the step back-reference"
    );
}

#[test]
fn completing_a_scheduled_task_completes_the_step_and_counts_a_session() {
    let state = populated_state();
    let project_id = state.projects[0].id.clone();
    let state = mutations::set_project_steps(
        &state,
        &project_id,
        vec![ProjectStep::new("Write the RFC", "")],
        NOW,
    );
    let step_id = state.projects[0].steps[0].id.clone();
    let scheduled = mutations::schedule_step(&state, &project_id, &step_id, 2, 0, NOW);
    let task_id = scheduled.projects[0].steps[0].task_id.clone().unwrap();

    let done = mutations::toggle_task(&scheduled, &task_id, NOW);
    assert!(done.projects[0].steps[0].completed);
    assert_eq!(done.projects[0].completed_sessions, 1);

    let undone = mutations::toggle_task(&done, &task_id, NOW);
    assert!(!undone.projects[0].steps[0].completed);
    assert_eq!(undone.projects[0].completed_sessions, 0);
}

// ===========================================================================
// Test 5: end-to-end reclassification
// ===========================================================================

#[test]
fn add_then_promote_to_quadrant_two() {
    let state = AppState::bootstrap(NOW);
    let state = mutations::add_role(&state, "Engineer", NOW);
    assert_eq!(state.roles.len(), 2);
    assert!(state.tasks.is_empty());

    let role = state.roles[0].id.clone();
    let state = mutations::add_task(&state, TaskDraft::new("Plan the week", role.as_str(), Quadrant::I), NOW);
    assert_eq!(state.tasks.len(), 1);
    assert!(!state.tasks[0].is_big_rock);

    let task_id = state.tasks[0].id.clone();
    let state = mutations::set_task_quadrant(&state, &task_id, Quadrant::II, NOW);

    assert_eq!(state.tasks.len(), 1);
    let task = state.task(&task_id).unwrap();
    assert_eq!(task.quadrant, Quadrant::II);
    assert!(task.is_big_rock);
}

// ===========================================================================
// Transcript bookkeeping
// ===========================================================================

#[test]
fn transcripts_are_per_mode_and_append_only() {
    let state = AppState::bootstrap(NOW);
    let state = mutations::append_chat(&state, CoachMode::Strategist, ChatRole::User, "hello", NOW);
    let state = mutations::append_chat(&state, CoachMode::Strategist, ChatRole::Coach, "hi", NOW + 1);
    let state = mutations::append_chat(&state, CoachMode::Socratic, ChatRole::User, "why?", NOW + 2);

    assert_eq!(state.transcript(CoachMode::Strategist).len(), 2);
    assert_eq!(state.transcript(CoachMode::Socratic).len(), 1);
    assert_eq!(state.transcript(CoachMode::Financial).len(), 0);
    assert_eq!(state.transcript(CoachMode::Strategist)[0].text, "hello");
}
