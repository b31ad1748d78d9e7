//! Scripted reasoner fake shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use specwatch_agent::reasoner::{
    PlannerContext, PlannerDecision, QueryAnalysis, Reasoner, ReasonerError, ResponderContext,
};
use specwatch_agent::state::IntentRecord;

pub enum PlanScript {
    /// Pop decisions in order; an exhausted queue yields `Respond`.
    Queue(VecDeque<Result<PlannerDecision, ReasonerError>>),
    /// Return the same decision on every planning turn.
    Always(Result<PlannerDecision, ReasonerError>),
}

pub struct ScriptedReasoner {
    pub classification: Mutex<Option<Result<IntentRecord, ReasonerError>>>,
    pub plans: Mutex<PlanScript>,
    pub fail_summarize: bool,
    pub plan_calls: AtomicUsize,
    pub summarize_calls: AtomicUsize,
    pub generic_calls: AtomicUsize,
    /// `validation_errors` length observed at each planning turn.
    pub errors_seen_per_plan: Mutex<Vec<usize>>,
}

impl ScriptedReasoner {
    pub fn with_plans(plans: Vec<Result<PlannerDecision, ReasonerError>>) -> Self {
        Self::new(PlanScript::Queue(plans.into()))
    }

    pub fn always(decision: Result<PlannerDecision, ReasonerError>) -> Self {
        Self::new(PlanScript::Always(decision))
    }

    pub fn new(plans: PlanScript) -> Self {
        Self {
            classification: Mutex::new(None),
            plans: Mutex::new(plans),
            fail_summarize: false,
            plan_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            generic_calls: AtomicUsize::new(0),
            errors_seen_per_plan: Mutex::new(Vec::new()),
        }
    }

    pub fn classify_as(self, result: Result<IntentRecord, ReasonerError>) -> Self {
        *self.classification.lock().unwrap() = Some(result);
        self
    }

    pub fn plan_call_count(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub fn summarize_call_count(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    pub fn generic_call_count(&self) -> usize {
        self.generic_calls.load(Ordering::SeqCst)
    }
}

pub fn call_tool(tool: &str, parameters: Value) -> Result<PlannerDecision, ReasonerError> {
    Ok(PlannerDecision::CallTool {
        tool: tool.to_string(),
        parameters,
        reasoning: format!("calling {tool}"),
    })
}

pub fn respond() -> Result<PlannerDecision, ReasonerError> {
    Ok(PlannerDecision::Respond { reasoning: "work complete".to_string() })
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn analyze(&self, _query: &str) -> Result<QueryAnalysis, ReasonerError> {
        Ok(QueryAnalysis::default())
    }

    async fn classify(
        &self,
        _query: &str,
        _analysis: &QueryAnalysis,
    ) -> Result<IntentRecord, ReasonerError> {
        self.classification
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(IntentRecord::unknown("no classification scripted")))
    }

    async fn plan(&self, context: &PlannerContext<'_>) -> Result<PlannerDecision, ReasonerError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        self.errors_seen_per_plan
            .lock()
            .unwrap()
            .push(context.state.validation_errors.len());

        let mut plans = self.plans.lock().unwrap();
        match &mut *plans {
            PlanScript::Queue(queue) => queue.pop_front().unwrap_or_else(respond),
            PlanScript::Always(decision) => decision.clone(),
        }
    }

    async fn respond_generic(&self, _query: &str) -> Result<String, ReasonerError> {
        self.generic_calls.fetch_add(1, Ordering::SeqCst);
        Ok("TDOA locates a transmitter from arrival-time differences across sensors.".to_string())
    }

    async fn summarize(&self, context: &ResponderContext<'_>) -> Result<String, ReasonerError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_summarize {
            return Err(ReasonerError::Malformed("scripted responder failure".to_string()));
        }
        Ok(format!(
            "ops={};errors={};complete={}",
            context.state.tools_called.len(),
            context.state.validation_errors.len(),
            context.complete
        ))
    }
}
