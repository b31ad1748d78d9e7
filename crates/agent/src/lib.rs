//! Orchestration engine - intent routing and bounded tool-calling loops
//!
//! This crate is the control plane of the specwatch system:
//! - **Routing** (`router`) - classify a request and dispatch it to exactly
//!   one handler: a bounded sub-workflow, the generic responder, or the
//!   error terminal
//! - **Looping** (`engine`) - the planner/executor loop with an iteration
//!   ceiling, self-correcting validation, and cooperative cancellation
//! - **Tooling** (`registry`, `executor`) - closed tool catalogs per
//!   workflow kind, pure parameter validation, store dispatch
//! - **Inference** (`reasoner`, `llm`, `prompts`) - the pluggable reasoner
//!   seam and its Ollama-backed implementation
//!
//! # Safety principle
//!
//! The reasoner is strictly a decision maker. It never touches the store
//! directly: every tool call it proposes is resolved against a fixed
//! registry and schema-validated before execution, and the engine's
//! iteration ceiling guarantees termination no matter what the reasoner
//! returns.

pub mod engine;
pub mod executor;
pub mod llm;
pub mod prompts;
pub mod reasoner;
pub mod registry;
pub mod router;
pub mod state;

pub use engine::{
    CancellationToken, RunOutcome, SubWorkflowEngine, INCOMPLETE_NOTE,
    REASONER_UNAVAILABLE_RESPONSE,
};
pub use llm::{LlmClient, LlmError, LlmReasoner, OllamaClient};
pub use reasoner::{
    PlannerContext, PlannerDecision, QueryAnalysis, Reasoner, ReasonerError, ResponderContext,
};
pub use registry::{ToolName, ToolRegistry, ValidationError};
pub use router::{IntentRouter, RouteOutcome, GENERIC_FALLBACK_RESPONSE, UNRECOGNIZED_REQUEST_RESPONSE};
pub use state::{Intent, IntentRecord, ToolCallRecord, ToolOutcome, WorkflowKind, WorkflowState};
