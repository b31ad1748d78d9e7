//! The inference seam.
//!
//! The engine treats the reasoner as a black box that either returns a
//! well-formed structured decision or fails. The two failure classes matter
//! to the caller: `Malformed` output is substituted with a safe default,
//! while `Unavailable` aborts the current request with a fixed degraded
//! response.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::state::{IntentRecord, WorkflowKind, WorkflowState};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReasonerError {
    #[error("reasoner unavailable: {0}")]
    Unavailable(String),
    #[error("reasoner returned malformed output: {0}")]
    Malformed(String),
}

/// Coarse entity/context extraction produced by the initial-analysis step.
/// Purely additive: an empty analysis never fails a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryAnalysis {
    pub requires_schema_knowledge: bool,
    pub requires_rf_knowledge: bool,
    pub requires_store_access: bool,
    pub entities: Value,
}

/// Everything the planner may consider for its next decision.
pub struct PlannerContext<'a> {
    pub kind: WorkflowKind,
    pub query: &'a str,
    /// Rendered tool catalog for the active registry.
    pub catalog: &'a str,
    pub state: &'a WorkflowState,
}

pub struct ResponderContext<'a> {
    pub kind: WorkflowKind,
    pub query: &'a str,
    pub state: &'a WorkflowState,
    /// False when the iteration budget ran out before the planner chose to
    /// respond.
    pub complete: bool,
}

/// A planning turn yields exactly one of these.
#[derive(Clone, Debug, PartialEq)]
pub enum PlannerDecision {
    CallTool { tool: String, parameters: Value, reasoning: String },
    Respond { reasoning: String },
}

#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn analyze(&self, query: &str) -> Result<QueryAnalysis, ReasonerError>;

    async fn classify(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
    ) -> Result<IntentRecord, ReasonerError>;

    async fn plan(&self, context: &PlannerContext<'_>) -> Result<PlannerDecision, ReasonerError>;

    async fn respond_generic(&self, query: &str) -> Result<String, ReasonerError>;

    async fn summarize(&self, context: &ResponderContext<'_>) -> Result<String, ReasonerError>;
}
