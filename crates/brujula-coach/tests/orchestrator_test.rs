//! Integration tests: the coach loop against a scripted transport.
//!
//! ## Scenarios
//! 1. Retry policy: two transient failures then success = 3 calls; a
//!    permanent failure = 1 call and the fallback reply.
//! 2. Function calls become pending actions; authorize mutates state with
//!    defaults, reject discards.
//! 3. Breakdown replaces steps on success only.
//! 4. Objective improvement degrades to the caller's input.

use async_trait::async_trait;
use brujula_coach::{
    CoachError, CoachOrchestrator, FunctionCall, GenAiTransport, GenerateRequest,
    GenerateResponse, RetryPolicy, FALLBACK_REPLY,
};
use brujula_core::model::{AppState, ChatRole, CoachMode, ProjectStep, Quadrant};
use brujula_core::mutations::{self, ProjectDraft};
use brujula_core::StateStore;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Transport that pops one scripted result per call and counts calls.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<GenerateResponse, CoachError>>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn push_ok(&self, response: GenerateResponse) {
        self.script.lock().unwrap().push_back(Ok(response));
    }

    fn push_err(&self, error: CoachError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenAiTransport for ScriptedTransport {
    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, CoachError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CoachError::Parse("script exhausted".into())))
    }
}

fn text_response(text: &str) -> GenerateResponse {
    GenerateResponse {
        text: text.to_string(),
        function_calls: Vec::new(),
    }
}

fn setup() -> (Arc<StateStore>, Arc<ScriptedTransport>, CoachOrchestrator) {
    let store = Arc::new(StateStore::new(AppState::bootstrap(1_000)));
    let transport = Arc::new(ScriptedTransport::default());
    let orchestrator =
        CoachOrchestrator::new(store.clone(), transport.clone(), "test-model");
    (store, transport, orchestrator)
}

// ===========================================================================
// Test 1: retry policy
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn two_transient_failures_then_success_makes_three_calls() {
    let (store, transport, orchestrator) = setup();
    transport.push_err(CoachError::Service { status: 503, body: String::new() });
    transport.push_err(CoachError::Service { status: 429, body: String::new() });
    transport.push_ok(text_response("Third time lucky."));

    let reply = orchestrator.send_message("hola").await;

    assert_eq!(transport.calls(), 3);
    assert_eq!(reply.text, "Third time lucky.");
    let transcript = store.get();
    let turns = transcript.transcript(CoachMode::Strategist);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, ChatRole::User);
    assert_eq!(turns[1].text, "Third time lucky.");
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_makes_one_call_and_falls_back() {
    let (store, transport, orchestrator) = setup();
    transport.push_err(CoachError::Service { status: 400, body: "bad request".into() });

    let reply = orchestrator.send_message("hola").await;

    assert_eq!(transport.calls(), 1, "permanent errors must not be retried");
    assert_eq!(reply.text, FALLBACK_REPLY);
    let state = store.get();
    assert_eq!(state.transcript(CoachMode::Strategist).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn retries_exhausted_falls_back() {
    let (_, transport, orchestrator) = setup();
    for _ in 0..3 {
        transport.push_err(CoachError::Service { status: 500, body: String::new() });
    }
    let orchestrator = orchestrator.with_retry(RetryPolicy::default());

    let reply = orchestrator.send_message("hola").await;

    assert_eq!(transport.calls(), 3);
    assert_eq!(reply.text, FALLBACK_REPLY);
}

// ===========================================================================
// Test 2: pending actions
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn authorized_create_task_applies_defaults() {
    let (store, transport, orchestrator) = setup();
    let role_id = store.get().roles[0].id.clone();
    transport.push_ok(GenerateResponse {
        text: "Lo agendo como roca grande.".to_string(),
        function_calls: vec![FunctionCall {
            name: "crear_tarea".to_string(),
            args: json!({"title": "X", "roleId": role_id, "quadrant": "II"}),
        }],
    });

    orchestrator.send_message("agenda X").await;
    let pending = orchestrator.pending_actions();
    assert_eq!(pending.len(), 1);
    assert!(store.get().tasks.is_empty(), "nothing mutates before authorize");

    assert!(orchestrator.authorize(&pending[0].id));

    let state = store.get();
    assert_eq!(state.tasks.len(), 1);
    let task = &state.tasks[0];
    assert_eq!(task.title, "X");
    assert_eq!(task.role_id, role_id);
    assert_eq!(task.quadrant, Quadrant::II);
    assert!(task.is_big_rock);
    assert!(!task.completed);
    assert!(orchestrator.pending_actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_quadrant_defaults_to_big_rock() {
    let (store, transport, orchestrator) = setup();
    let role_id = store.get().roles[0].id.clone();
    transport.push_ok(GenerateResponse {
        text: String::new(),
        function_calls: vec![FunctionCall {
            name: "crear_tarea".to_string(),
            args: json!({"title": "Sin cuadrante", "roleId": role_id}),
        }],
    });

    let reply = orchestrator.send_message("agenda").await;
    assert!(
        !reply.text.is_empty(),
        "a pure function-call response still yields a visible turn"
    );

    let pending = orchestrator.pending_actions();
    orchestrator.authorize(&pending[0].id);
    let task = store.get().tasks[0].clone();
    assert_eq!(task.quadrant, Quadrant::II);
    assert!(task.is_big_rock);
}

#[tokio::test(start_paused = true)]
async fn rejected_action_never_touches_state() {
    let (store, transport, orchestrator) = setup();
    let role_id = store.get().roles[0].id.clone();
    transport.push_ok(GenerateResponse {
        text: "propongo".to_string(),
        function_calls: vec![FunctionCall {
            name: "crear_proyecto".to_string(),
            args: json!({
                "title": "Nuevo negocio",
                "description": "d",
                "roleId": role_id,
                "area": "Side"
            }),
        }],
    });

    orchestrator.send_message("idea").await;
    let pending = orchestrator.pending_actions();
    assert_eq!(pending.len(), 1);

    assert!(orchestrator.reject(&pending[0].id));
    assert!(orchestrator.pending_actions().is_empty());
    assert!(store.get().projects.is_empty());
    assert!(!orchestrator.reject(&pending[0].id), "double reject is false");
}

#[tokio::test(start_paused = true)]
async fn unrecognized_function_calls_are_dropped() {
    let (store, transport, orchestrator) = setup();
    transport.push_ok(GenerateResponse {
        text: "hecho".to_string(),
        function_calls: vec![FunctionCall {
            name: "borrar_todo".to_string(),
            args: json!({}),
        }],
    });

    orchestrator.send_message("haz algo raro").await;
    assert!(orchestrator.pending_actions().is_empty());
    assert!(store.get().tasks.is_empty());
}

// ===========================================================================
// Test 3: project breakdown
// ===========================================================================

fn with_project(store: &StateStore) -> String {
    let role_id = store.get().roles[0].id.clone();
    let state = store.apply(|s, now| {
        mutations::add_project(
            s,
            ProjectDraft::new("Ship v2", "rewrite", role_id.as_str(), "Work"),
            now,
        )
    });
    state.projects[0].id.clone()
}

#[tokio::test(start_paused = true)]
async fn breakdown_success_overwrites_all_steps() {
    let (store, transport, orchestrator) = setup();
    let project_id = with_project(&store);
    store.apply(|s, now| {
        mutations::set_project_steps(
            s,
            &project_id,
            vec![ProjectStep::new("old step", "stale")],
            now,
        )
    });
    transport.push_ok(text_response(
        r#"[{"text": "Write RFC", "instruction": "Cover storage"},
            {"text": "Prototype", "instruction": "Spike sync"}]"#,
    ));

    let steps = orchestrator.breakdown_project(&project_id).await.unwrap();

    assert_eq!(steps.len(), 2);
    let project = store.get().project(&project_id).cloned().unwrap();
    assert_eq!(project.steps.len(), 2);
    assert_eq!(project.steps[0].text, "Write RFC");
    assert!(project.steps.iter().all(|s| s.task_id.is_none()));
}

#[tokio::test(start_paused = true)]
async fn breakdown_failure_leaves_existing_steps_untouched() {
    let (store, transport, orchestrator) = setup();
    let project_id = with_project(&store);
    store.apply(|s, now| {
        mutations::set_project_steps(
            s,
            &project_id,
            vec![ProjectStep::new("keep me", "")],
            now,
        )
    });
    transport.push_err(CoachError::Service { status: 400, body: String::new() });

    let result = orchestrator.breakdown_project(&project_id).await;
    assert!(result.is_err());
    let project = store.get().project(&project_id).cloned().unwrap();
    assert_eq!(project.steps.len(), 1);
    assert_eq!(project.steps[0].text, "keep me");
}

#[tokio::test(start_paused = true)]
async fn breakdown_garbage_payload_is_a_parse_error() {
    let (store, transport, orchestrator) = setup();
    let project_id = with_project(&store);
    transport.push_ok(text_response("not json at all"));

    let result = orchestrator.breakdown_project(&project_id).await;
    assert!(matches!(result, Err(CoachError::Parse(_))));
    assert!(store.get().project(&project_id).unwrap().steps.is_empty());
}

// ===========================================================================
// Test 4: objective improvement
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn improvement_returns_refined_pair() {
    let (_, transport, orchestrator) = setup();
    transport.push_ok(text_response(
        r#"{"title": "Launch v2 by March", "description": "Ship to 100 users"}"#,
    ));

    let (title, description) = orchestrator.improve_objective("launch", "ship it").await;
    assert_eq!(title, "Launch v2 by March");
    assert_eq!(description, "Ship to 100 users");
}

#[tokio::test(start_paused = true)]
async fn improvement_failure_returns_input_unchanged() {
    let (_, transport, orchestrator) = setup();
    transport.push_err(CoachError::Service { status: 400, body: String::new() });

    let (title, description) = orchestrator.improve_objective("launch", "ship it").await;
    assert_eq!(title, "launch");
    assert_eq!(description, "ship it");

    transport.push_ok(text_response("][ not json"));
    let (title, _) = orchestrator.improve_objective("launch", "ship it").await;
    assert_eq!(title, "launch");
}
