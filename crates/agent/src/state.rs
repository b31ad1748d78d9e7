use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowKind {
    Create,
    Update,
    Info,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Info => "info",
        }
    }
}

/// Discrete request category. Routing is decided solely by this label;
/// classifier confidence is advisory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Create,
    Update,
    Info,
    Generic,
    Unknown,
}

impl Intent {
    /// Maps a classifier label to an intent. Unrecognized or missing labels
    /// become `Unknown`.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim() {
            "CREATE" => Self::Create,
            "UPDATE" => Self::Update,
            "INFO" => Self::Info,
            "GENERIC" => Self::Generic,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Info => "INFO",
            Self::Generic => "GENERIC",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Output of the classification step. Created once per request, read-only
/// afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct IntentRecord {
    pub intent: Intent,
    pub confidence: f64,
    pub reasoning: String,
    pub entities: Value,
}

impl IntentRecord {
    pub fn unknown(reasoning: impl Into<String>) -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            reasoning: reasoning.into(),
            entities: Value::Null,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnRole {
    Analysis,
    Classification,
    Planning,
    ToolResult,
    Response,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnRecord {
    pub role: TurnRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure { code: String, message: String },
}

impl ToolOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRecord {
    pub tool: String,
    pub parameters: Value,
    pub outcome: ToolOutcome,
    pub summary: String,
    pub at: DateTime<Utc>,
}

/// Mutable state of one sub-workflow run.
///
/// `messages`, `tools_called`, and `validation_errors` are append-only for
/// the lifetime of the run; the accumulator overwrites per entity role; the
/// final response is write-once.
#[derive(Clone, Debug)]
pub struct WorkflowState {
    pub kind: WorkflowKind,
    pub query: String,
    pub original_intent: IntentRecord,
    pub messages: Vec<TurnRecord>,
    pub iteration_count: u32,
    pub max_iterations: u32,
    pub tools_called: Vec<ToolCallRecord>,
    pub accumulated: BTreeMap<String, Value>,
    pub validation_errors: Vec<String>,
    pub final_response: Option<String>,
}

impl WorkflowState {
    pub fn new(
        kind: WorkflowKind,
        query: impl Into<String>,
        original_intent: IntentRecord,
        max_iterations: u32,
    ) -> Self {
        Self {
            kind,
            query: query.into(),
            original_intent,
            messages: Vec::new(),
            iteration_count: 0,
            max_iterations,
            tools_called: Vec::new(),
            accumulated: BTreeMap::new(),
            validation_errors: Vec::new(),
            final_response: None,
        }
    }

    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) {
        self.messages.push(TurnRecord { role, content: content.into(), at: Utc::now() });
    }

    pub fn record_validation_error(&mut self, message: impl Into<String>) {
        self.validation_errors.push(message.into());
    }

    /// Whether an identical tool call (same name, same parameters) was
    /// already executed during this run.
    pub fn is_repeat_call(&self, tool: &str, parameters: &Value) -> bool {
        self.tools_called
            .iter()
            .any(|record| record.tool == tool && &record.parameters == parameters)
    }

    /// Appends a tool-call record and merges its accumulator entries.
    /// Entries replace any previous value stored under the same role key.
    pub fn record_tool_call(
        &mut self,
        record: ToolCallRecord,
        accumulates: Vec<(String, Value)>,
    ) {
        self.push_turn(TurnRole::ToolResult, record.summary.clone());
        self.tools_called.push(record);
        for (role, value) in accumulates {
            self.accumulated.insert(role, value);
        }
    }

    /// Sets the final response. The first write wins; the responder runs at
    /// most once per engine run, so a second write indicates a driver bug
    /// and is ignored rather than clobbering the terminal signal.
    pub fn set_final_response(&mut self, text: impl Into<String>) {
        if self.final_response.is_none() {
            self.final_response = Some(text.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        Intent, IntentRecord, ToolCallRecord, ToolOutcome, TurnRole, WorkflowKind, WorkflowState,
    };

    fn call(tool: &str, parameters: serde_json::Value) -> ToolCallRecord {
        ToolCallRecord {
            tool: tool.to_string(),
            parameters,
            outcome: ToolOutcome::Success(json!({"ok": true})),
            summary: format!("{tool} succeeded"),
            at: chrono::Utc::now(),
        }
    }

    fn state() -> WorkflowState {
        WorkflowState::new(WorkflowKind::Info, "list rules", IntentRecord::unknown("test"), 5)
    }

    #[test]
    fn unrecognized_labels_map_to_unknown() {
        assert_eq!(Intent::from_label("INFO"), Intent::Info);
        assert_eq!(Intent::from_label("DELETE"), Intent::Unknown);
        assert_eq!(Intent::from_label(""), Intent::Unknown);
    }

    #[test]
    fn accumulator_overwrites_same_role() {
        let mut state = state();
        state.record_tool_call(
            call("get_automation_rule", json!({"rule_id": "rule-001"})),
            vec![("rule:rule-001".to_string(), json!({"name": "old"}))],
        );
        state.record_tool_call(
            call("get_automation_rule", json!({"rule_id": "rule-001"})),
            vec![("rule:rule-001".to_string(), json!({"name": "new"}))],
        );

        assert_eq!(state.accumulated.len(), 1);
        assert_eq!(state.accumulated["rule:rule-001"], json!({"name": "new"}));
        // The call log itself is append-only.
        assert_eq!(state.tools_called.len(), 2);
    }

    #[test]
    fn repeat_call_detection_matches_name_and_parameters() {
        let mut state = state();
        state.record_tool_call(call("list_automation_rules", json!({})), Vec::new());

        assert!(state.is_repeat_call("list_automation_rules", &json!({})));
        assert!(!state.is_repeat_call("list_automation_rules", &json!({"x": 1})));
        assert!(!state.is_repeat_call("get_automation_rule", &json!({})));
    }

    #[test]
    fn final_response_is_write_once() {
        let mut state = state();
        state.set_final_response("first");
        state.set_final_response("second");
        assert_eq!(state.final_response.as_deref(), Some("first"));
    }

    #[test]
    fn tool_results_are_recorded_as_turns() {
        let mut state = state();
        state.record_tool_call(call("list_automation_rules", json!({})), Vec::new());
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, TurnRole::ToolResult);
    }
}
