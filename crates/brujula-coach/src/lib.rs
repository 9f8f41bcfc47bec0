//! brujula-coach: the AI coach request loop.
//!
//! Turns a user chat message plus the current planner state into a model
//! request, and turns the response into appended chat text and pending
//! structured actions that only mutate state after explicit confirmation.
//! Transport is a trait so tests script the endpoint; production uses the
//! Gemini-style HTTP client.

mod action;
mod error;
mod genai;
mod orchestrator;
pub mod prompts;
mod retry;

pub use action::{CreateProjectArgs, CreateTaskArgs, PendingAction, ProposedAction};
pub use error::{CoachError, CoachResult};
pub use genai::{
    Content, FunctionCall, FunctionDecl, GenAiTransport, GenerateRequest, GenerateResponse,
    HttpGenAi,
};
pub use orchestrator::{CoachOrchestrator, FALLBACK_REPLY};
pub use retry::{with_retry, RetryPolicy};
