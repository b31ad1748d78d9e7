mod support;

use std::sync::Arc;

use serde_json::json;

use specwatch_agent::engine::CancellationToken;
use specwatch_agent::reasoner::ReasonerError;
use specwatch_agent::router::{IntentRouter, RouteOutcome, UNRECOGNIZED_REQUEST_RESPONSE};
use specwatch_agent::state::{Intent, IntentRecord};
use specwatch_core::config::EngineConfig;
use specwatch_core::store::InMemoryRuleStore;

use support::{call_tool, respond, ScriptedReasoner};

fn classified(intent: Intent) -> Result<IntentRecord, ReasonerError> {
    Ok(IntentRecord {
        intent,
        confidence: 0.9,
        reasoning: "scripted classification".to_string(),
        entities: json!({}),
    })
}

fn router(reasoner: ScriptedReasoner) -> (IntentRouter, Arc<ScriptedReasoner>) {
    let reasoner = Arc::new(reasoner);
    let store = Arc::new(InMemoryRuleStore::with_seed_data());
    let router = IntentRouter::new(reasoner.clone(), store, EngineConfig::default());
    (router, reasoner)
}

#[tokio::test]
async fn info_intent_runs_exactly_one_sub_workflow() {
    let scripted = ScriptedReasoner::with_plans(vec![
        call_tool("list_automation_rules", json!({})),
        respond(),
    ])
    .classify_as(classified(Intent::Info));
    let (router, reasoner) = router(scripted);

    let outcome = router.route("list my rules", &CancellationToken::new()).await;

    match outcome {
        RouteOutcome::Response { text, intent } => {
            assert_eq!(intent, Intent::Info);
            assert_eq!(text, "ops=1;errors=0;complete=true");
        }
        RouteOutcome::Cancelled => panic!("unexpected cancellation"),
    }
    // Exactly one handler ran: the sub-workflow, not the generic terminal.
    assert!(reasoner.plan_call_count() > 0);
    assert_eq!(reasoner.generic_call_count(), 0);
}

#[tokio::test]
async fn generic_intent_answers_without_tools_or_loop() {
    let scripted = ScriptedReasoner::with_plans(vec![]).classify_as(classified(Intent::Generic));
    let (router, reasoner) = router(scripted);

    let outcome = router.route("what is TDOA?", &CancellationToken::new()).await;

    match outcome {
        RouteOutcome::Response { text, intent } => {
            assert_eq!(intent, Intent::Generic);
            assert!(text.contains("TDOA"));
        }
        RouteOutcome::Cancelled => panic!("unexpected cancellation"),
    }
    assert_eq!(reasoner.generic_call_count(), 1);
    assert_eq!(reasoner.plan_call_count(), 0);
    assert_eq!(reasoner.summarize_call_count(), 0);
}

#[tokio::test]
async fn unknown_intent_hits_the_error_terminal() {
    let scripted = ScriptedReasoner::with_plans(vec![]).classify_as(classified(Intent::Unknown));
    let (router, reasoner) = router(scripted);

    let outcome = router.route("flibber the wug", &CancellationToken::new()).await;

    match outcome {
        RouteOutcome::Response { text, intent } => {
            assert_eq!(intent, Intent::Unknown);
            assert_eq!(text, UNRECOGNIZED_REQUEST_RESPONSE);
        }
        RouteOutcome::Cancelled => panic!("unexpected cancellation"),
    }
    // The error terminal never consults the reasoner or a tool.
    assert_eq!(reasoner.plan_call_count(), 0);
    assert_eq!(reasoner.generic_call_count(), 0);
    assert_eq!(reasoner.summarize_call_count(), 0);
}

#[tokio::test]
async fn classification_failure_routes_to_the_error_terminal() {
    let scripted = ScriptedReasoner::with_plans(vec![])
        .classify_as(Err(ReasonerError::Unavailable("classifier down".to_string())));
    let (router, reasoner) = router(scripted);

    let outcome = router.route("enable rule-001", &CancellationToken::new()).await;

    match outcome {
        RouteOutcome::Response { text, intent } => {
            assert_eq!(intent, Intent::Unknown);
            assert_eq!(text, UNRECOGNIZED_REQUEST_RESPONSE);
        }
        RouteOutcome::Cancelled => panic!("unexpected cancellation"),
    }
    assert_eq!(reasoner.plan_call_count(), 0);
}

#[tokio::test]
async fn update_intent_reaches_the_update_workflow() {
    let scripted = ScriptedReasoner::with_plans(vec![
        call_tool("activate_automation_rule", json!({"rule_id": "rule-003"})),
        respond(),
    ])
    .classify_as(classified(Intent::Update));
    let (router, _reasoner) = router(scripted);

    let text = router.handle("enable the energy threshold alert").await;
    assert_eq!(text, "ops=1;errors=0;complete=true");
}

#[tokio::test]
async fn cancelled_request_is_distinguishable_from_a_response() {
    let scripted = ScriptedReasoner::with_plans(vec![]).classify_as(classified(Intent::Info));
    let (router, reasoner) = router(scripted);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = router.route("list my rules", &cancel).await;

    assert_eq!(outcome, RouteOutcome::Cancelled);
    assert_eq!(reasoner.plan_call_count(), 0);
    assert_eq!(reasoner.summarize_call_count(), 0);
}
