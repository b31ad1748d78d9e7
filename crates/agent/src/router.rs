//! Top-level request routing.
//!
//! A request flows through initial analysis, classification, and a closed
//! dispatch over the intent label. Exactly one handler runs per request:
//! one of the three bounded sub-workflows, the GENERIC direct-response
//! path, or the ERROR terminal.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use specwatch_core::config::EngineConfig;
use specwatch_core::store::RuleStore;

use crate::engine::{CancellationToken, RunOutcome, SubWorkflowEngine};
use crate::reasoner::{QueryAnalysis, Reasoner};
use crate::state::{Intent, IntentRecord, WorkflowKind};

/// Fixed diagnostic returned by the ERROR terminal. Produced without any
/// reasoner or tool call.
pub const UNRECOGNIZED_REQUEST_RESPONSE: &str =
    "Sorry, I could not understand that request. I can create, update, or look up RF spectrum \
     automation rules, or answer general questions about the system.";

/// Fallback when the GENERIC path cannot reach the reasoner.
pub const GENERIC_FALLBACK_RESPONSE: &str =
    "I could not produce an answer right now. Please try again shortly.";

/// Outcome of routing one request. Cancellation is distinguishable from
/// every response-bearing outcome.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteOutcome {
    Response { text: String, intent: Intent },
    Cancelled,
}

pub struct IntentRouter {
    reasoner: Arc<dyn Reasoner>,
    store: Arc<dyn RuleStore>,
    engine: EngineConfig,
}

impl IntentRouter {
    pub fn new(
        reasoner: Arc<dyn Reasoner>,
        store: Arc<dyn RuleStore>,
        engine: EngineConfig,
    ) -> Self {
        Self { reasoner, store, engine }
    }

    /// The process-boundary convenience: routes with a fresh token and
    /// returns the response text.
    pub async fn handle(&self, query: &str) -> String {
        match self.route(query, &CancellationToken::new()).await {
            RouteOutcome::Response { text, .. } => text,
            RouteOutcome::Cancelled => "The request was cancelled.".to_string(),
        }
    }

    pub async fn route(&self, query: &str, cancel: &CancellationToken) -> RouteOutcome {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "router.request.received",
            correlation_id,
            "routing request"
        );

        if cancel.is_cancelled() {
            return RouteOutcome::Cancelled;
        }

        // Initial analysis is purely additive: a reasoner failure here only
        // costs the extracted context, never the request.
        let analysis = match self.reasoner.analyze(query).await {
            Ok(analysis) => analysis,
            Err(error) => {
                warn!(
                    event_name = "router.analysis.failed",
                    correlation_id,
                    error = %error,
                    "initial analysis unavailable, continuing with empty extraction"
                );
                QueryAnalysis::default()
            }
        };

        let record = match self.reasoner.classify(query, &analysis).await {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    event_name = "router.classification.failed",
                    correlation_id,
                    error = %error,
                    "classification unavailable, treating intent as UNKNOWN"
                );
                IntentRecord::unknown(format!("classification failed: {error}"))
            }
        };
        info!(
            event_name = "router.classification.done",
            correlation_id,
            intent = record.intent.as_str(),
            confidence = record.confidence,
            "intent classified"
        );

        // Closed dispatch: every label has exactly one handler, and an
        // unhandled label is a compile-time gap.
        let intent = record.intent;
        let outcome = match intent {
            Intent::Create => {
                self.run_sub_workflow(WorkflowKind::Create, query, record, cancel).await
            }
            Intent::Update => {
                self.run_sub_workflow(WorkflowKind::Update, query, record, cancel).await
            }
            Intent::Info => {
                self.run_sub_workflow(WorkflowKind::Info, query, record, cancel).await
            }
            Intent::Generic => RunOutcome::Completed {
                response: self.generic_response(query).await,
                complete: true,
            },
            Intent::Unknown => RunOutcome::Completed {
                response: UNRECOGNIZED_REQUEST_RESPONSE.to_string(),
                complete: true,
            },
        };

        match outcome {
            RunOutcome::Completed { response, complete } => {
                info!(
                    event_name = "router.request.answered",
                    correlation_id,
                    intent = intent.as_str(),
                    complete,
                    "request answered"
                );
                RouteOutcome::Response { text: response, intent }
            }
            RunOutcome::Cancelled => {
                info!(
                    event_name = "router.request.cancelled",
                    correlation_id,
                    intent = intent.as_str(),
                    "request cancelled"
                );
                RouteOutcome::Cancelled
            }
        }
    }

    async fn run_sub_workflow(
        &self,
        kind: WorkflowKind,
        query: &str,
        record: IntentRecord,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let max_iterations = match kind {
            WorkflowKind::Create => self.engine.create_max_iterations,
            WorkflowKind::Update => self.engine.update_max_iterations,
            WorkflowKind::Info => self.engine.info_max_iterations,
        };
        let engine =
            SubWorkflowEngine::new(kind, self.reasoner.as_ref(), self.store.as_ref(), max_iterations);
        engine.run(query, record, cancel).await
    }

    /// GENERIC terminal: one reasoner call over the static knowledge text,
    /// no tools, no loop.
    async fn generic_response(&self, query: &str) -> String {
        match self.reasoner.respond_generic(query).await {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    event_name = "router.generic.fallback",
                    error = %error,
                    "generic responder unavailable"
                );
                GENERIC_FALLBACK_RESPONSE.to_string()
            }
        }
    }
}
