//! The coach request loop: state in, model request out, reply and pending
//! actions back in.
//!
//! Every external call runs through the retry policy; permanent failures turn
//! into a user-visible fallback chat message and never crash the caller.
//! Proposed actions wait in a pending list until the user authorizes them.

use crate::action::{PendingAction, ProposedAction};
use crate::error::{CoachError, CoachResult};
use crate::genai::{Content, GenAiTransport, GenerateRequest, GenerateResponse};
use crate::prompts;
use crate::retry::{with_retry, RetryPolicy};
use brujula_core::model::{ChatMessage, ChatRole, ProjectStep, Quadrant};
use brujula_core::mutations::{self, ProjectDraft, TaskDraft};
use brujula_core::StateStore;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Shown as the coach's reply when the endpoint fails permanently.
pub const FALLBACK_REPLY: &str =
    "I could not reach the coaching service just now. Your planner is untouched; \
     please try again in a moment.";

const CHAT_TEMPERATURE: f32 = 0.7;
const STRUCTURED_TEMPERATURE: f32 = 0.2;

pub struct CoachOrchestrator {
    store: Arc<StateStore>,
    transport: Arc<dyn GenAiTransport>,
    chat_model: String,
    retry: RetryPolicy,
    pending: Mutex<Vec<PendingAction>>,
}

impl CoachOrchestrator {
    pub fn new(
        store: Arc<StateStore>,
        transport: Arc<dyn GenAiTransport>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            chat_model: chat_model.into(),
            retry: RetryPolicy::default(),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One chat round for the active mode. Appends the user turn, calls the
    /// model (with retry), appends the reply — or the fallback on permanent
    /// failure — and queues any proposed actions. Returns the coach message.
    pub async fn send_message(&self, text: &str) -> ChatMessage {
        let mode = self.store.get().coach_mode;
        self.store
            .apply(|s, now| mutations::append_chat(s, mode, ChatRole::User, text, now));

        let state = self.store.get();
        let request = GenerateRequest {
            model: self.chat_model.clone(),
            system_instruction: prompts::system_directive(mode).to_string(),
            contents: prompts::build_context(&state, mode, text),
            temperature: CHAT_TEMPERATURE,
            function_declarations: prompts::function_declarations(),
            response_schema: None,
        };

        let reply = match self.generate(&request).await {
            Ok(response) => {
                self.queue_actions(&response);
                if response.text.trim().is_empty() {
                    // Pure function-call responses still need a visible turn.
                    "I have a suggestion ready for you to confirm.".to_string()
                } else {
                    response.text
                }
            }
            Err(e) => {
                warn!("coach request failed permanently: {e}");
                FALLBACK_REPLY.to_string()
            }
        };

        let state = self
            .store
            .apply(|s, now| mutations::append_chat(s, mode, ChatRole::Coach, &reply, now));
        state
            .transcript(mode)
            .last()
            .cloned()
            .unwrap_or_else(|| ChatMessage::new(ChatRole::Coach, reply, 0))
    }

    /// Actions awaiting confirmation, oldest first.
    pub fn pending_actions(&self) -> Vec<PendingAction> {
        self.pending.lock().unwrap().clone()
    }

    /// Executes a pending action against the store and removes it. Missing
    /// wire fields get defaults here: quadrant II (big rock), inbox day,
    /// current week. Returns false for an unknown id.
    pub fn authorize(&self, action_id: &str) -> bool {
        let Some(pending) = self.take_pending(action_id) else {
            return false;
        };
        match pending.action {
            ProposedAction::CreateTask(args) => {
                let quadrant = args.quadrant.unwrap_or(Quadrant::II);
                self.store.apply(|s, now| {
                    let mut draft =
                        TaskDraft::new(args.title.clone(), args.role_id.clone(), quadrant);
                    draft.day = args.day.filter(|d| *d <= 6);
                    draft.time = args.time.clone();
                    mutations::add_task(s, draft, now)
                });
                info!("authorized coach task \"{}\"", args.title);
            }
            ProposedAction::CreateProject(args) => {
                self.store.apply(|s, now| {
                    mutations::add_project(
                        s,
                        ProjectDraft::new(
                            args.title.clone(),
                            args.description.clone(),
                            args.role_id.clone(),
                            args.area.clone(),
                        ),
                        now,
                    )
                });
                info!("authorized coach project \"{}\"", args.title);
            }
        }
        true
    }

    /// Discards a pending action. Returns false for an unknown id.
    pub fn reject(&self, action_id: &str) -> bool {
        self.take_pending(action_id).is_some()
    }

    /// Regenerates a project's step breakdown. Steps are only replaced on a
    /// fully successful response; any failure leaves the project untouched.
    pub async fn breakdown_project(&self, project_id: &str) -> CoachResult<Vec<ProjectStep>> {
        let state = self.store.get();
        let project = state
            .project(project_id)
            .ok_or_else(|| CoachError::UnknownProject(project_id.to_string()))?;

        let request = GenerateRequest {
            model: self.chat_model.clone(),
            system_instruction: "You split projects into concrete, startable steps.".to_string(),
            contents: vec![Content::user(prompts::breakdown_prompt(
                &project.title,
                &project.description,
            ))],
            temperature: STRUCTURED_TEMPERATURE,
            function_declarations: Vec::new(),
            response_schema: Some(prompts::breakdown_schema()),
        };

        #[derive(Deserialize)]
        struct WireStep {
            text: String,
            #[serde(default)]
            instruction: String,
        }

        let response = self.generate(&request).await?;
        let wire: Vec<WireStep> = serde_json::from_str(&response.text)
            .map_err(|e| CoachError::Parse(format!("breakdown payload: {e}")))?;
        if wire.is_empty() {
            return Err(CoachError::Parse("breakdown returned no steps".into()));
        }

        let steps: Vec<ProjectStep> = wire
            .into_iter()
            .map(|s| ProjectStep::new(s.text, s.instruction))
            .collect();
        let project_id = project_id.to_string();
        let result = steps.clone();
        self.store
            .apply(move |s, now| mutations::set_project_steps(s, &project_id, steps, now));
        Ok(result)
    }

    /// Refines a draft objective. Never fails: any error returns the caller's
    /// input unchanged.
    pub async fn improve_objective(&self, title: &str, description: &str) -> (String, String) {
        let request = GenerateRequest {
            model: self.chat_model.clone(),
            system_instruction: "You sharpen objectives without changing their intent.".to_string(),
            contents: vec![Content::user(prompts::improvement_prompt(title, description))],
            temperature: STRUCTURED_TEMPERATURE,
            function_declarations: Vec::new(),
            response_schema: Some(prompts::improvement_schema()),
        };

        #[derive(Deserialize)]
        struct WireObjective {
            title: String,
            description: String,
        }

        match self.generate(&request).await {
            Ok(response) => match serde_json::from_str::<WireObjective>(&response.text) {
                Ok(refined) => (refined.title, refined.description),
                Err(e) => {
                    warn!("improvement payload undecodable, keeping draft: {e}");
                    (title.to_string(), description.to_string())
                }
            },
            Err(e) => {
                warn!("improvement request failed, keeping draft: {e}");
                (title.to_string(), description.to_string())
            }
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> CoachResult<GenerateResponse> {
        with_retry(self.retry, || self.transport.generate(request)).await
    }

    fn queue_actions(&self, response: &GenerateResponse) {
        let mut pending = self.pending.lock().unwrap();
        for call in &response.function_calls {
            if let Some(action) = ProposedAction::from_function_call(call) {
                pending.push(PendingAction::new(action));
            }
        }
    }

    fn take_pending(&self, action_id: &str) -> Option<PendingAction> {
        let mut pending = self.pending.lock().unwrap();
        let index = pending.iter().position(|p| p.id == action_id)?;
        Some(pending.remove(index))
    }
}
