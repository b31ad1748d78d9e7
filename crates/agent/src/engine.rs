//! The bounded loop driver.
//!
//! One engine instance drives one sub-workflow run through the phases
//! `Planning -> {Executing, Responding}`, `Executing -> Planning`,
//! `Responding -> Done`, as an explicit loop (never recursion). The ceiling
//! guard runs before every planner invocation and forces a degraded respond
//! once `iteration_count` reaches `max_iterations`, which bounds every run
//! at `max_iterations + 1` planner-adjacent steps no matter how the planner
//! behaves. Cancellation is checked at the top of each loop pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use specwatch_core::store::RuleStore;

use crate::executor;
use crate::reasoner::{
    PlannerContext, PlannerDecision, Reasoner, ReasonerError, ResponderContext,
};
use crate::registry::{validate_params, ToolName, ToolRegistry};
use crate::state::{
    IntentRecord, ToolCallRecord, TurnRole, WorkflowKind, WorkflowState,
};

/// Returned when the reasoner is unreachable mid-run. The request aborts
/// with this fixed text instead of looping.
pub const REASONER_UNAVAILABLE_RESPONSE: &str =
    "The reasoning service is currently unreachable, so this request could not be completed. \
     Please try again shortly.";

/// Prefix marking a run that terminated on the iteration ceiling.
pub const INCOMPLETE_NOTE: &str =
    "Note: this request could not be fully completed within the allotted planning steps.";

/// Cooperative cancellation signal. Cloneable; checked by the engine at the
/// top of every loop iteration.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Terminal result of a sub-workflow run. A cancelled run is distinguishable
/// from every completed one, so callers never mistake it for success.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed {
        response: String,
        /// False when the run terminated degraded (iteration ceiling or an
        /// unreachable reasoner).
        complete: bool,
    },
    Cancelled,
}

enum Phase {
    Planning,
    Executing { tool: ToolName, parameters: Value },
    Responding { complete: bool },
}

pub struct SubWorkflowEngine<'a> {
    kind: WorkflowKind,
    registry: ToolRegistry,
    reasoner: &'a dyn Reasoner,
    store: &'a dyn RuleStore,
    max_iterations: u32,
}

impl<'a> SubWorkflowEngine<'a> {
    pub fn new(
        kind: WorkflowKind,
        reasoner: &'a dyn Reasoner,
        store: &'a dyn RuleStore,
        max_iterations: u32,
    ) -> Self {
        Self { kind, registry: ToolRegistry::for_kind(kind), reasoner, store, max_iterations }
    }

    pub async fn run(
        &self,
        query: &str,
        original_intent: IntentRecord,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut state =
            WorkflowState::new(self.kind, query, original_intent, self.max_iterations);
        state.push_turn(
            TurnRole::Classification,
            format!(
                "Intent: {} (confidence {:.2}) - {}",
                state.original_intent.intent.as_str(),
                state.original_intent.confidence,
                state.original_intent.reasoning
            ),
        );
        let catalog = self.registry.catalog();
        let mut phase = Phase::Planning;

        loop {
            if cancel.is_cancelled() {
                info!(
                    event_name = "engine.run.cancelled",
                    workflow = self.kind.as_str(),
                    iteration = state.iteration_count,
                    "sub-workflow cancelled before next step"
                );
                return RunOutcome::Cancelled;
            }

            phase = match phase {
                Phase::Planning => {
                    if state.iteration_count >= state.max_iterations {
                        warn!(
                            event_name = "engine.planner.budget_exhausted",
                            workflow = self.kind.as_str(),
                            iteration = state.iteration_count,
                            "iteration ceiling reached, forcing response"
                        );
                        Phase::Responding { complete: false }
                    } else {
                        state.iteration_count += 1;
                        match self.plan(&mut state, &catalog).await {
                            Ok(next) => next,
                            Err(outcome) => return outcome,
                        }
                    }
                }
                Phase::Executing { tool, parameters } => {
                    self.execute(&mut state, tool, parameters).await;
                    Phase::Planning
                }
                Phase::Responding { complete } => {
                    let response = self.respond(&mut state, complete).await;
                    info!(
                        event_name = "engine.run.done",
                        workflow = self.kind.as_str(),
                        iterations = state.iteration_count,
                        tools_called = state.tools_called.len(),
                        complete,
                        "sub-workflow finished"
                    );
                    return RunOutcome::Completed { response, complete };
                }
            };
        }
    }

    /// One planner turn. Returns the next phase, or the terminal outcome
    /// when the reasoner is unreachable.
    async fn plan(
        &self,
        state: &mut WorkflowState,
        catalog: &str,
    ) -> Result<Phase, RunOutcome> {
        let context = PlannerContext {
            kind: self.kind,
            query: &state.query,
            catalog,
            state,
        };
        let decision = match self.reasoner.plan(&context).await {
            Ok(decision) => decision,
            Err(ReasonerError::Unavailable(reason)) => {
                error!(
                    event_name = "engine.planner.unavailable",
                    workflow = self.kind.as_str(),
                    reason,
                    "aborting run: reasoner unreachable"
                );
                return Err(RunOutcome::Completed {
                    response: REASONER_UNAVAILABLE_RESPONSE.to_string(),
                    complete: false,
                });
            }
            Err(ReasonerError::Malformed(reason)) => {
                warn!(
                    event_name = "engine.planner.malformed",
                    workflow = self.kind.as_str(),
                    reason,
                    "planner output unusable, forcing response"
                );
                state.push_turn(
                    TurnRole::Planning,
                    "Planner output could not be interpreted; responding with what is known.",
                );
                return Ok(Phase::Responding { complete: true });
            }
        };

        match decision {
            PlannerDecision::Respond { reasoning } => {
                debug!(
                    event_name = "engine.planner.respond",
                    workflow = self.kind.as_str(),
                    iteration = state.iteration_count,
                    "planner chose to respond"
                );
                state.push_turn(TurnRole::Planning, reasoning);
                Ok(Phase::Responding { complete: true })
            }
            PlannerDecision::CallTool { tool, parameters, reasoning } => {
                state.push_turn(TurnRole::Planning, reasoning);
                let resolved = match self.registry.resolve(&tool) {
                    Ok(resolved) => resolved,
                    Err(validation) => {
                        warn!(
                            event_name = "engine.planner.unknown_tool",
                            workflow = self.kind.as_str(),
                            tool,
                            "planner selected a tool outside the registry"
                        );
                        state.record_validation_error(validation.to_string());
                        return Ok(Phase::Planning);
                    }
                };
                match validate_params(resolved, &parameters) {
                    Ok(normalized) => {
                        debug!(
                            event_name = "engine.planner.call_tool",
                            workflow = self.kind.as_str(),
                            tool = resolved.as_str(),
                            iteration = state.iteration_count,
                            "planner selected a tool"
                        );
                        Ok(Phase::Executing { tool: resolved, parameters: normalized })
                    }
                    Err(validation) => {
                        warn!(
                            event_name = "engine.planner.invalid_parameters",
                            workflow = self.kind.as_str(),
                            tool = resolved.as_str(),
                            error = %validation,
                            "tool parameters failed validation"
                        );
                        state.record_validation_error(validation.to_string());
                        Ok(Phase::Planning)
                    }
                }
            }
        }
    }

    /// One executor pass. Failures become data in `tools_called`; the loop
    /// continues regardless so the planner can react on its next turn.
    async fn execute(&self, state: &mut WorkflowState, tool: ToolName, parameters: Value) {
        if state.is_repeat_call(tool.as_str(), &parameters) {
            // No idempotence guard blocks the repeat; the iteration cap is
            // the sole backstop.
            warn!(
                event_name = "engine.executor.repeat_call",
                workflow = self.kind.as_str(),
                tool = tool.as_str(),
                "tool re-invoked with identical parameters"
            );
        }

        let execution = executor::invoke(self.store, tool, &parameters).await;
        if execution.outcome.is_failure() {
            warn!(
                event_name = "engine.executor.tool_failed",
                workflow = self.kind.as_str(),
                tool = tool.as_str(),
                summary = %execution.summary,
                "tool call failed; recorded as data"
            );
            state.record_validation_error(execution.summary.clone());
        } else {
            info!(
                event_name = "engine.executor.tool_succeeded",
                workflow = self.kind.as_str(),
                tool = tool.as_str(),
                summary = %execution.summary,
                "tool call succeeded"
            );
        }

        state.record_tool_call(
            ToolCallRecord {
                tool: tool.as_str().to_string(),
                parameters,
                outcome: execution.outcome,
                summary: execution.summary,
                at: Utc::now(),
            },
            execution.accumulates,
        );
    }

    /// The responder runs at most once per engine run and always terminates
    /// it. Reasoner failure here degrades to a locally built summary.
    async fn respond(&self, state: &mut WorkflowState, complete: bool) -> String {
        let context = ResponderContext {
            kind: self.kind,
            query: &state.query,
            state,
            complete,
        };
        let summary = match self.reasoner.summarize(&context).await {
            Ok(text) => text,
            Err(reason) => {
                warn!(
                    event_name = "engine.responder.fallback",
                    workflow = self.kind.as_str(),
                    error = %reason,
                    "responder failed, using deterministic summary"
                );
                fallback_summary(state)
            }
        };

        let response = if complete {
            summary
        } else {
            format!("{INCOMPLETE_NOTE}\n{summary}")
        };
        state.push_turn(TurnRole::Response, response.clone());
        state.set_final_response(response.clone());
        response
    }
}

/// Deterministic plain-text summary built from the call log, used when the
/// reasoner cannot produce the final response.
fn fallback_summary(state: &WorkflowState) -> String {
    if state.tools_called.is_empty() {
        return "No operations were performed for this request.".to_string();
    }
    let mut lines = vec!["Here is what was completed:".to_string()];
    for record in &state.tools_called {
        lines.push(format!("- {}", record.summary));
    }
    lines.join("\n")
}
