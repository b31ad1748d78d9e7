//! Prompt construction for the LLM-backed reasoner.
//!
//! Each builder renders one role's prompt from the workflow state: the tool
//! catalog, call history, accumulated data, and prior validation errors the
//! planner should self-correct against.

use std::fmt::Write as _;

use specwatch_core::knowledge::{RF_SPECTRUM_KNOWLEDGE, SCHEMA_KNOWLEDGE};

use crate::reasoner::{PlannerContext, QueryAnalysis, ResponderContext};
use crate::state::WorkflowKind;

pub const PARAMETER_SCHEMAS: &str = "\
CONDITION TYPE SCHEMAS:

1. signalDetection:
   - minFrequencyMHz (number, 10-6000, default 10)
   - maxFrequencyMHz (number, 10-6000, default 6000)
   - signalType (required; one of Energy, 5G, LTE, QPSK, CW, PCMPM, CPM, CPMFM, BPSK, SOQPSK)

2. spectralEnergy:
   - minFrequencyMHz (number, 10-6000, default 10)
   - maxFrequencyMHz (number, 10-6000, default 6000)
   - threshold_dBm (required; number, -150 to 150)

ACTION TYPE SCHEMAS:

1. frequencyScanRequest:
   - sensorIds (required; non-empty list of sensor id strings)

2. geolocationRequest:
   - algorithm (required; TDOA or PDOA)
   - sensorIds (required; list of sensor id strings, minimum 2)

3. userNotification:
   - message (required; non-empty string)
";

pub fn analysis_prompt(query: &str) -> String {
    format!(
        "You are a query analyzer for an RF spectrum automation system.\n\
         \n\
         Determine whether the query requires:\n\
         1. Schema knowledge: questions about the automation database structure\n\
         2. RF knowledge: questions about RF concepts, signal types, frequencies\n\
         3. Database operations: create/update/read operations on automation rules,\n\
            conditions, or actions\n\
         \n\
         Respond ONLY with valid JSON:\n\
         {{\n\
           \"requires_schema_knowledge\": true/false,\n\
           \"requires_rf_knowledge\": true/false,\n\
           \"requires_database_queries\": true/false,\n\
           \"detected_entities\": {{\n\
             \"frequency_ranges\": [],\n\
             \"signal_types\": [],\n\
             \"action_types\": [],\n\
             \"condition_types\": [],\n\
             \"rule_references\": []\n\
           }}\n\
         }}\n\
         \n\
         Query: {query}"
    )
}

pub fn classification_prompt(query: &str, analysis: &QueryAnalysis) -> String {
    let mut context = String::new();
    if analysis.requires_schema_knowledge || analysis.requires_store_access {
        context.push_str(SCHEMA_KNOWLEDGE);
        context.push('\n');
    }
    if analysis.requires_rf_knowledge {
        context.push_str(RF_SPECTRUM_KNOWLEDGE);
        context.push('\n');
    }

    format!(
        "You are an assistant that classifies user queries for an RF spectrum automation\n\
         system.\n\
         \n\
         {context}\
         Classify the query into exactly ONE of these intents:\n\
         \n\
         1. CREATE: creating new automation rules, conditions, or actions\n\
            Examples: \"create a rule\", \"add a condition\", \"set up monitoring\"\n\
         2. UPDATE: modifying existing rules, conditions, or actions, including\n\
            enabling or disabling a rule\n\
            Examples: \"update rule\", \"change frequency\", \"disable rule\"\n\
         3. INFO: retrieving information about existing rules, conditions, or actions\n\
            Examples: \"show me rules\", \"list conditions\", \"find rules with 5G\"\n\
         4. GENERIC: general questions about RF spectrum, capabilities, or the schema\n\
            Examples: \"what is TDOA?\", \"what signal types are supported?\"\n\
         5. UNKNOWN: the query fits none of the above\n\
         \n\
         Respond ONLY with valid JSON:\n\
         {{\n\
           \"intent\": \"CREATE|UPDATE|INFO|GENERIC|UNKNOWN\",\n\
           \"confidence\": 0.95,\n\
           \"reasoning\": \"clear explanation of the classification\",\n\
           \"extracted_info\": {{}}\n\
         }}\n\
         \n\
         User Query: {query}"
    )
}

pub fn planner_prompt(context: &PlannerContext<'_>) -> String {
    let state = context.state;

    let mut history = String::new();
    for record in &state.tools_called {
        let _ = writeln!(
            history,
            "- {}({}): {}",
            record.tool, record.parameters, record.summary
        );
    }
    if history.is_empty() {
        history.push_str("None\n");
    }

    let mut gathered = String::new();
    for (role, value) in &state.accumulated {
        let _ = writeln!(gathered, "{role}: {value}");
    }
    if gathered.is_empty() {
        gathered.push_str("None\n");
    }

    let mut errors = String::new();
    for error in &state.validation_errors {
        let _ = writeln!(errors, "- {error}");
    }
    if errors.is_empty() {
        errors.push_str("None\n");
    }

    format!(
        "You are a planning agent for an RF spectrum automation system, handling a\n\
         {kind} request.\n\
         Your job each turn:\n\
         1. Analyze what the user wants\n\
         2. Review what has already been done\n\
         3. Decide the NEXT tool to call, or respond if the work is complete\n\
         4. Extract tool parameters from the user query\n\
         \n\
         Available tools:\n\
         {catalog}\n\
         Parameter schemas for conditions and actions:\n\
         {schemas}\n\
         {guidance}\n\
         Tools already called:\n\
         {history}\n\
         Data gathered so far:\n\
         {gathered}\n\
         Validation errors from previous turns (fix these before retrying):\n\
         {errors}\n\
         Respond ONLY with valid JSON:\n\
         {{\n\
           \"next_action\": \"call_tool|respond\",\n\
           \"reasoning\": \"explain your decision\",\n\
           \"selected_tool\": \"tool_name or null\",\n\
           \"tool_parameters\": {{}}\n\
         }}\n\
         \n\
         User Query: {query}",
        kind = context.kind.as_str(),
        catalog = context.catalog,
        schemas = PARAMETER_SCHEMAS,
        guidance = planner_guidance(context.kind),
        history = history,
        gathered = gathered,
        errors = errors,
        query = context.query,
    )
}

fn planner_guidance(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::Create => {
            "DECISION LOGIC:\n\
             - Prefer the combined tools: create_rule_condition_action when the query\n\
               describes rule, condition, AND action; create_rule_condition or\n\
               create_rule_action when it describes two of the three\n\
             - Use create_automation_rule only when the query lacks condition and\n\
               action details\n\
             - Always create rules with is_enabled=false initially\n\
             - Once a rule (with its condition/action when requested) has been\n\
               created, respond\n"
        }
        WorkflowKind::Update => {
            "DECISION LOGIC:\n\
             - If the user references a rule by NAME and no rules are retrieved yet,\n\
               call list_automation_rules first to find the rule id\n\
             - Use activate_automation_rule / deactivate_automation_rule only to\n\
               enable or disable an existing rule, never to create or delete one\n\
             - Use update_condition / update_action with the rule_id for parameter\n\
               changes; partial updates are allowed\n\
             - Once the requested updates are done, or the target rule cannot be\n\
               found, respond\n"
        }
        WorkflowKind::Info => {
            "DECISION LOGIC:\n\
             - If the user references a rule by NAME, call list_automation_rules\n\
               first to find its id\n\
             - For questions about condition types, signal types, or frequency\n\
               ranges, call list_automation_rules once, then\n\
               list_conditions_for_rule for EACH rule id, one at a time\n\
             - For questions about action types, do the same with\n\
               list_actions_for_rule\n\
             - NEVER call list_automation_rules more than once; it returns all rules\n\
             - When every needed piece of data has been gathered, respond\n"
        }
    }
}

pub fn responder_prompt(context: &ResponderContext<'_>) -> String {
    let state = context.state;

    let mut history = String::new();
    for record in &state.tools_called {
        let _ = writeln!(
            history,
            "- {}({}): {}",
            record.tool, record.parameters, record.summary
        );
    }
    if history.is_empty() {
        history.push_str("None\n");
    }

    let mut gathered = String::new();
    for (role, value) in &state.accumulated {
        let _ = writeln!(gathered, "{role}: {value}");
    }
    if gathered.is_empty() {
        gathered.push_str("None\n");
    }

    let mut errors = String::new();
    for error in &state.validation_errors {
        let _ = writeln!(errors, "- {error}");
    }
    if errors.is_empty() {
        errors.push_str("None\n");
    }

    let budget_note = if context.complete {
        ""
    } else {
        "IMPORTANT: the planning budget ran out before the request was fully handled.\n\
         Say clearly that the request is incomplete and summarize only what was done.\n"
    };

    format!(
        "You are a response generator for an RF spectrum automation system.\n\
         The user made a {kind} request and the following operations ran:\n\
         \n\
         Operations:\n\
         {history}\n\
         Gathered data:\n\
         {gathered}\n\
         Errors encountered (if any):\n\
         {errors}\n\
         {budget_note}\
         Write a clear, user-facing answer that:\n\
         1. Directly addresses the user's request\n\
         2. Confirms what succeeded, with rule names and ids\n\
         3. Mentions any errors and sensible next steps\n\
         4. Uses structured, easy-to-read formatting\n\
         Do NOT mention tool names or internal implementation details.\n\
         Respond with plain text, NOT JSON.\n\
         \n\
         User Query: {query}",
        kind = context.kind.as_str(),
        history = history,
        gathered = gathered,
        errors = errors,
        budget_note = budget_note,
        query = context.query,
    )
}

pub fn generic_prompt(query: &str) -> String {
    format!(
        "You are an RF spectrum management expert assistant.\n\
         \n\
         {schema}\n\
         {rf}\n\
         For this general question, provide educational information about RF\n\
         concepts, the system's capabilities, or the schema structure, with\n\
         examples of what the user can do. Be conversational and helpful.\n\
         \n\
         User Query: {query}",
        schema = SCHEMA_KNOWLEDGE,
        rf = RF_SPECTRUM_KNOWLEDGE,
        query = query,
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{analysis_prompt, classification_prompt, planner_prompt, responder_prompt};
    use crate::reasoner::{PlannerContext, QueryAnalysis, ResponderContext};
    use crate::registry::ToolRegistry;
    use crate::state::{IntentRecord, ToolCallRecord, ToolOutcome, WorkflowKind, WorkflowState};

    fn state_with_history() -> WorkflowState {
        let mut state =
            WorkflowState::new(WorkflowKind::Info, "list rules", IntentRecord::unknown("t"), 5);
        state.record_tool_call(
            ToolCallRecord {
                tool: "list_automation_rules".to_string(),
                parameters: json!({}),
                outcome: ToolOutcome::Success(json!([])),
                summary: "Retrieved 0 rules".to_string(),
                at: chrono::Utc::now(),
            },
            vec![("rules".to_string(), json!([]))],
        );
        state.record_validation_error("tool `nope` is not available");
        state
    }

    #[test]
    fn planner_prompt_carries_history_and_errors() {
        let state = state_with_history();
        let registry = ToolRegistry::for_kind(WorkflowKind::Info);
        let catalog = registry.catalog();
        let prompt = planner_prompt(&PlannerContext {
            kind: WorkflowKind::Info,
            query: "list rules",
            catalog: &catalog,
            state: &state,
        });

        assert!(prompt.contains("Retrieved 0 rules"));
        assert!(prompt.contains("tool `nope` is not available"));
        assert!(prompt.contains("list_conditions_for_rule"));
        assert!(prompt.contains("\"next_action\""));
    }

    #[test]
    fn responder_prompt_flags_exhausted_budget() {
        let state = state_with_history();
        let prompt = responder_prompt(&ResponderContext {
            kind: WorkflowKind::Info,
            query: "list rules",
            state: &state,
            complete: false,
        });
        assert!(prompt.contains("planning budget ran out"));

        let complete_prompt = responder_prompt(&ResponderContext {
            kind: WorkflowKind::Info,
            query: "list rules",
            state: &state,
            complete: true,
        });
        assert!(!complete_prompt.contains("planning budget ran out"));
    }

    #[test]
    fn classification_prompt_embeds_knowledge_on_demand() {
        let bare = classification_prompt("what is TDOA?", &QueryAnalysis::default());
        assert!(!bare.contains("DATABASE SCHEMA"));

        let with_schema = classification_prompt(
            "show my rules",
            &QueryAnalysis { requires_store_access: true, ..QueryAnalysis::default() },
        );
        assert!(with_schema.contains("DATABASE SCHEMA"));
    }

    #[test]
    fn analysis_prompt_requests_strict_json() {
        let prompt = analysis_prompt("create a rule");
        assert!(prompt.contains("Respond ONLY with valid JSON"));
        assert!(prompt.contains("detected_entities"));
    }
}
