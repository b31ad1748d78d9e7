//! Per-workflow tool catalogs and parameter validation.
//!
//! Tool names form a closed enumeration; each workflow kind exposes a fixed
//! slice of it. Validation is pure: it fills deterministic defaults, checks
//! ranges and closed vocabularies, and never contacts the store, so the
//! engine can reject a bad planner decision before any side effect.

use serde_json::{json, Map, Value};
use thiserror::Error;

use specwatch_core::domain::action::{validate_action_params, validate_action_patch_params, ActionType};
use specwatch_core::domain::condition::{
    validate_condition_params, validate_condition_patch_params, ConditionType,
};
use specwatch_core::domain::rule::parse_datetime;
use specwatch_core::errors::DomainError;

use crate::state::WorkflowKind;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("tool `{tool}` is not available in the {kind} workflow")]
    UnknownTool { kind: &'static str, tool: String },
    #[error("tool `{tool}`: parameters must be a JSON object")]
    NotAnObject { tool: &'static str },
    #[error("tool `{tool}`: missing required parameter `{field}`")]
    MissingField { tool: &'static str, field: &'static str },
    #[error("tool `{tool}`: parameter `{field}` {reason}")]
    InvalidField { tool: &'static str, field: &'static str, reason: &'static str },
    #[error("tool `{tool}`: unknown parameter `{field}`")]
    UnknownField { tool: &'static str, field: String },
    #[error("tool `{tool}`: {source}")]
    Domain {
        tool: &'static str,
        #[source]
        source: DomainError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolName {
    ListAutomationRules,
    GetAutomationRule,
    ListConditionsForRule,
    ListActionsForRule,
    CreateAutomationRule,
    CreateRuleCondition,
    CreateRuleAction,
    CreateRuleConditionAction,
    ActivateAutomationRule,
    DeactivateAutomationRule,
    UpdateCondition,
    UpdateAction,
}

impl ToolName {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "list_automation_rules" => Some(Self::ListAutomationRules),
            "get_automation_rule" => Some(Self::GetAutomationRule),
            "list_conditions_for_rule" => Some(Self::ListConditionsForRule),
            "list_actions_for_rule" => Some(Self::ListActionsForRule),
            "create_automation_rule" => Some(Self::CreateAutomationRule),
            "create_rule_condition" => Some(Self::CreateRuleCondition),
            "create_rule_action" => Some(Self::CreateRuleAction),
            "create_rule_condition_action" => Some(Self::CreateRuleConditionAction),
            "activate_automation_rule" => Some(Self::ActivateAutomationRule),
            "deactivate_automation_rule" => Some(Self::DeactivateAutomationRule),
            "update_condition" => Some(Self::UpdateCondition),
            "update_action" => Some(Self::UpdateAction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListAutomationRules => "list_automation_rules",
            Self::GetAutomationRule => "get_automation_rule",
            Self::ListConditionsForRule => "list_conditions_for_rule",
            Self::ListActionsForRule => "list_actions_for_rule",
            Self::CreateAutomationRule => "create_automation_rule",
            Self::CreateRuleCondition => "create_rule_condition",
            Self::CreateRuleAction => "create_rule_action",
            Self::CreateRuleConditionAction => "create_rule_condition_action",
            Self::ActivateAutomationRule => "activate_automation_rule",
            Self::DeactivateAutomationRule => "deactivate_automation_rule",
            Self::UpdateCondition => "update_condition",
            Self::UpdateAction => "update_action",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::ListAutomationRules => {
                "Lists all automation rules. Call this first when the user references a rule by name instead of id."
            }
            Self::GetAutomationRule => "Gets details of a specific automation rule by id.",
            Self::ListConditionsForRule => "Lists all conditions for a specific rule by rule id.",
            Self::ListActionsForRule => "Lists all actions for a specific rule by rule id.",
            Self::CreateAutomationRule => {
                "Creates a new automation rule with basic information only. Create rules disabled initially; the returned rule id is needed for conditions and actions."
            }
            Self::CreateRuleCondition => {
                "Creates a new automation rule WITH a condition in one call. Use when the query carries enough detail for both (condition type plus frequency range, signal type, or threshold)."
            }
            Self::CreateRuleAction => {
                "Creates a new automation rule WITH an action in one call. Use when the query carries enough detail for both (action type plus message, sensor ids, or algorithm)."
            }
            Self::CreateRuleConditionAction => {
                "Creates a new automation rule WITH BOTH a condition AND an action in one call. The most complete creation tool; prefer it when the query describes all three."
            }
            Self::ActivateAutomationRule => {
                "Activates (enables) an automation rule so it starts monitoring. Never use it to create rules."
            }
            Self::DeactivateAutomationRule => {
                "Deactivates (disables) an automation rule without deleting it. Never use it to delete rules."
            }
            Self::UpdateCondition => {
                "Updates an existing condition of a rule (frequency range, signal type, threshold). Only rule_id is required; partial updates are allowed."
            }
            Self::UpdateAction => {
                "Updates an existing action of a rule (message, sensor ids, algorithm). Only rule_id is required; partial updates are allowed."
            }
        }
    }

    fn parameters_help(&self) -> &'static str {
        match self {
            Self::ListAutomationRules => "none",
            Self::GetAutomationRule
            | Self::ListConditionsForRule
            | Self::ListActionsForRule
            | Self::ActivateAutomationRule
            | Self::DeactivateAutomationRule => "rule_id (string, required)",
            Self::CreateAutomationRule => {
                "name (string, required), description (string), is_enabled (bool, default false), max_executions (int), start_time / end_time (ISO datetime)"
            }
            Self::CreateRuleCondition => {
                "rule fields as in create_automation_rule, plus condition_type (signalDetection|spectralEnergy, required), condition_parameters (object, required; frequency bounds default to 10-6000), condition_description (string)"
            }
            Self::CreateRuleAction => {
                "rule fields as in create_automation_rule, plus action_type (frequencyScanRequest|geolocationRequest|userNotification, required), action_parameters (object, required), action_description (string)"
            }
            Self::CreateRuleConditionAction => {
                "rule fields as in create_automation_rule, plus the condition_* fields of create_rule_condition and the action_* fields of create_rule_action"
            }
            Self::UpdateCondition => {
                "rule_id (string, required), condition_id (string), condition_type (signalDetection|spectralEnergy), parameters (object, partial), description (string)"
            }
            Self::UpdateAction => {
                "rule_id (string, required), action_id (string), action_type (frequencyScanRequest|geolocationRequest|userNotification), parameters (object, partial), description (string)"
            }
        }
    }
}

const CREATE_TOOLS: &[ToolName] = &[
    ToolName::ListAutomationRules,
    ToolName::CreateAutomationRule,
    ToolName::CreateRuleCondition,
    ToolName::CreateRuleAction,
    ToolName::CreateRuleConditionAction,
];

const UPDATE_TOOLS: &[ToolName] = &[
    ToolName::ListAutomationRules,
    ToolName::ActivateAutomationRule,
    ToolName::DeactivateAutomationRule,
    ToolName::UpdateCondition,
    ToolName::UpdateAction,
];

const INFO_TOOLS: &[ToolName] = &[
    ToolName::ListAutomationRules,
    ToolName::GetAutomationRule,
    ToolName::ListConditionsForRule,
    ToolName::ListActionsForRule,
];

/// The fixed tool catalog of one workflow kind. Built once and shared
/// read-only between requests.
#[derive(Clone, Copy, Debug)]
pub struct ToolRegistry {
    kind: WorkflowKind,
    tools: &'static [ToolName],
}

impl ToolRegistry {
    pub fn for_kind(kind: WorkflowKind) -> Self {
        let tools = match kind {
            WorkflowKind::Create => CREATE_TOOLS,
            WorkflowKind::Update => UPDATE_TOOLS,
            WorkflowKind::Info => INFO_TOOLS,
        };
        Self { kind, tools }
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn tools(&self) -> &'static [ToolName] {
        self.tools
    }

    /// Resolves a planner-supplied tool name against this registry,
    /// rejecting names that exist but belong to another workflow kind.
    pub fn resolve(&self, raw: &str) -> Result<ToolName, ValidationError> {
        match ToolName::parse(raw) {
            Some(tool) if self.tools.contains(&tool) => Ok(tool),
            _ => Err(ValidationError::UnknownTool {
                kind: self.kind.as_str(),
                tool: raw.to_string(),
            }),
        }
    }

    /// Renders the catalog text shown to the planner.
    pub fn catalog(&self) -> String {
        let mut out = String::new();
        for tool in self.tools {
            out.push_str("- ");
            out.push_str(tool.as_str());
            out.push_str(": ");
            out.push_str(tool.description());
            out.push_str("\n  Parameters: ");
            out.push_str(tool.parameters_help());
            out.push('\n');
        }
        out
    }
}

/// Validates and normalizes a raw parameter bag for `tool`.
///
/// Pure and deterministic: the same raw input always yields the same
/// normalized output (defaults are fixed constants), so validation may be
/// repeated freely.
pub fn validate_params(tool: ToolName, raw: &Value) -> Result<Value, ValidationError> {
    let name = tool.as_str();
    let map = as_object(name, raw)?;

    match tool {
        ToolName::ListAutomationRules => {
            reject_unknown(name, &map, &[])?;
            Ok(json!({}))
        }
        ToolName::GetAutomationRule
        | ToolName::ListConditionsForRule
        | ToolName::ListActionsForRule
        | ToolName::ActivateAutomationRule
        | ToolName::DeactivateAutomationRule => {
            reject_unknown(name, &map, &["rule_id"])?;
            let rule_id = require_string(name, &map, "rule_id")?;
            Ok(json!({ "rule_id": rule_id }))
        }
        ToolName::CreateAutomationRule => {
            reject_unknown(name, &map, RULE_FIELDS)?;
            Ok(Value::Object(rule_fields(name, &map)?))
        }
        ToolName::CreateRuleCondition => {
            reject_unknown(
                name,
                &map,
                &with_rule_fields(&["condition_type", "condition_parameters", "condition_description"]),
            )?;
            let mut normalized = rule_fields(name, &map)?;
            condition_fields(name, &map, &mut normalized)?;
            Ok(Value::Object(normalized))
        }
        ToolName::CreateRuleAction => {
            reject_unknown(
                name,
                &map,
                &with_rule_fields(&["action_type", "action_parameters", "action_description"]),
            )?;
            let mut normalized = rule_fields(name, &map)?;
            action_fields(name, &map, &mut normalized)?;
            Ok(Value::Object(normalized))
        }
        ToolName::CreateRuleConditionAction => {
            reject_unknown(
                name,
                &map,
                &with_rule_fields(&[
                    "condition_type",
                    "condition_parameters",
                    "condition_description",
                    "action_type",
                    "action_parameters",
                    "action_description",
                ]),
            )?;
            let mut normalized = rule_fields(name, &map)?;
            condition_fields(name, &map, &mut normalized)?;
            action_fields(name, &map, &mut normalized)?;
            Ok(Value::Object(normalized))
        }
        ToolName::UpdateCondition => {
            reject_unknown(
                name,
                &map,
                &["rule_id", "condition_id", "condition_type", "parameters", "description"],
            )?;
            let mut normalized = Map::new();
            normalized.insert("rule_id".into(), Value::from(require_string(name, &map, "rule_id")?));
            if let Some(condition_id) = optional_string(name, &map, "condition_id")? {
                normalized.insert("condition_id".into(), Value::from(condition_id));
            }
            if let Some(raw_type) = optional_string(name, &map, "condition_type")? {
                let parsed = ConditionType::parse(&raw_type).map_err(wrap_domain(name))?;
                normalized.insert("condition_type".into(), Value::from(parsed.as_str()));
            }
            if let Some(parameters) = map.get("parameters") {
                let validated =
                    validate_condition_patch_params(parameters).map_err(wrap_domain(name))?;
                normalized.insert("parameters".into(), validated);
            }
            if let Some(description) = optional_string(name, &map, "description")? {
                normalized.insert("description".into(), Value::from(description));
            }
            Ok(Value::Object(normalized))
        }
        ToolName::UpdateAction => {
            reject_unknown(
                name,
                &map,
                &["rule_id", "action_id", "action_type", "parameters", "description"],
            )?;
            let mut normalized = Map::new();
            normalized.insert("rule_id".into(), Value::from(require_string(name, &map, "rule_id")?));
            if let Some(action_id) = optional_string(name, &map, "action_id")? {
                normalized.insert("action_id".into(), Value::from(action_id));
            }
            if let Some(raw_type) = optional_string(name, &map, "action_type")? {
                let parsed = ActionType::parse(&raw_type).map_err(wrap_domain(name))?;
                normalized.insert("action_type".into(), Value::from(parsed.as_str()));
            }
            if let Some(parameters) = map.get("parameters") {
                let validated =
                    validate_action_patch_params(parameters).map_err(wrap_domain(name))?;
                normalized.insert("parameters".into(), validated);
            }
            if let Some(description) = optional_string(name, &map, "description")? {
                normalized.insert("description".into(), Value::from(description));
            }
            Ok(Value::Object(normalized))
        }
    }
}

const RULE_FIELDS: &[&str] =
    &["name", "description", "is_enabled", "max_executions", "start_time", "end_time"];

fn with_rule_fields(extra: &[&'static str]) -> Vec<&'static str> {
    let mut fields = RULE_FIELDS.to_vec();
    fields.extend_from_slice(extra);
    fields
}

fn rule_fields(
    tool: &'static str,
    map: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    let name = require_string(tool, map, "name")?;
    if name.trim().is_empty() {
        return Err(wrap_domain(tool)(DomainError::EmptyRuleName));
    }

    let mut normalized = Map::new();
    normalized.insert("name".into(), Value::from(name));
    if let Some(description) = optional_string(tool, map, "description")? {
        normalized.insert("description".into(), Value::from(description));
    }
    let is_enabled = match map.get("is_enabled") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            return Err(ValidationError::InvalidField {
                tool,
                field: "is_enabled",
                reason: "must be a boolean",
            })
        }
    };
    normalized.insert("is_enabled".into(), Value::from(is_enabled));

    if let Some(raw) = map.get("max_executions").filter(|value| !value.is_null()) {
        let count = raw
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .ok_or(ValidationError::InvalidField {
                tool,
                field: "max_executions",
                reason: "must be a non-negative integer",
            })?;
        normalized.insert("max_executions".into(), Value::from(count));
    }

    let start = optional_string(tool, map, "start_time")?;
    let end = optional_string(tool, map, "end_time")?;
    let parsed_start = start
        .as_deref()
        .map(|raw| parse_datetime(raw).map_err(wrap_domain(tool)))
        .transpose()?;
    let parsed_end = end
        .as_deref()
        .map(|raw| parse_datetime(raw).map_err(wrap_domain(tool)))
        .transpose()?;
    if let (Some(parsed_start), Some(parsed_end)) = (parsed_start, parsed_end) {
        if parsed_start >= parsed_end {
            return Err(wrap_domain(tool)(DomainError::InvalidTimeWindow));
        }
    }
    if let Some(start) = start {
        normalized.insert("start_time".into(), Value::from(start));
    }
    if let Some(end) = end {
        normalized.insert("end_time".into(), Value::from(end));
    }

    Ok(normalized)
}

fn condition_fields(
    tool: &'static str,
    map: &Map<String, Value>,
    normalized: &mut Map<String, Value>,
) -> Result<(), ValidationError> {
    let raw_type = require_string(tool, map, "condition_type")?;
    let condition_type = ConditionType::parse(&raw_type).map_err(wrap_domain(tool))?;
    let raw_params = map.get("condition_parameters").cloned().unwrap_or(Value::Null);
    let parameters =
        validate_condition_params(condition_type, &raw_params).map_err(wrap_domain(tool))?;

    normalized.insert("condition_type".into(), Value::from(condition_type.as_str()));
    normalized.insert("condition_parameters".into(), parameters);
    if let Some(description) = optional_string(tool, map, "condition_description")? {
        normalized.insert("condition_description".into(), Value::from(description));
    }
    Ok(())
}

fn action_fields(
    tool: &'static str,
    map: &Map<String, Value>,
    normalized: &mut Map<String, Value>,
) -> Result<(), ValidationError> {
    let raw_type = require_string(tool, map, "action_type")?;
    let action_type = ActionType::parse(&raw_type).map_err(wrap_domain(tool))?;
    let raw_params = map.get("action_parameters").cloned().unwrap_or(Value::Null);
    let parameters = validate_action_params(action_type, &raw_params).map_err(wrap_domain(tool))?;

    normalized.insert("action_type".into(), Value::from(action_type.as_str()));
    normalized.insert("action_parameters".into(), parameters);
    if let Some(description) = optional_string(tool, map, "action_description")? {
        normalized.insert("action_description".into(), Value::from(description));
    }
    Ok(())
}

fn as_object(tool: &'static str, raw: &Value) -> Result<Map<String, Value>, ValidationError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        _ => Err(ValidationError::NotAnObject { tool }),
    }
}

fn reject_unknown(
    tool: &'static str,
    map: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), ValidationError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ValidationError::UnknownField { tool, field: key.clone() });
        }
    }
    Ok(())
}

fn require_string(
    tool: &'static str,
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<String, ValidationError> {
    let value = map
        .get(field)
        .filter(|value| !value.is_null())
        .ok_or(ValidationError::MissingField { tool, field })?;
    let text = value.as_str().ok_or(ValidationError::InvalidField {
        tool,
        field,
        reason: "must be a string",
    })?;
    if text.is_empty() {
        return Err(ValidationError::InvalidField {
            tool,
            field,
            reason: "must be a non-empty string",
        });
    }
    Ok(text.to_string())
}

fn optional_string(
    tool: &'static str,
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ValidationError::InvalidField { tool, field, reason: "must be a string" }),
    }
}

fn wrap_domain(tool: &'static str) -> impl Fn(DomainError) -> ValidationError {
    move |source| ValidationError::Domain { tool, source }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{validate_params, ToolName, ToolRegistry, ValidationError};
    use crate::state::WorkflowKind;

    #[test]
    fn each_kind_exposes_its_fixed_catalog() {
        let create = ToolRegistry::for_kind(WorkflowKind::Create);
        let update = ToolRegistry::for_kind(WorkflowKind::Update);
        let info = ToolRegistry::for_kind(WorkflowKind::Info);

        assert_eq!(create.tools().len(), 5);
        assert_eq!(update.tools().len(), 5);
        assert_eq!(info.tools().len(), 4);
        assert!(create.catalog().contains("create_rule_condition_action"));
    }

    #[test]
    fn resolve_rejects_tools_from_other_workflows() {
        let info = ToolRegistry::for_kind(WorkflowKind::Info);
        assert_eq!(info.resolve("get_automation_rule"), Ok(ToolName::GetAutomationRule));
        assert!(matches!(
            info.resolve("create_automation_rule"),
            Err(ValidationError::UnknownTool { kind: "info", .. })
        ));
        assert!(matches!(
            info.resolve("drop_all_rules"),
            Err(ValidationError::UnknownTool { .. })
        ));
    }

    #[test]
    fn list_rules_takes_no_parameters() {
        assert_eq!(
            validate_params(ToolName::ListAutomationRules, &json!({})).unwrap(),
            json!({})
        );
        assert!(matches!(
            validate_params(ToolName::ListAutomationRules, &json!({"rule_id": "rule-001"})),
            Err(ValidationError::UnknownField { .. })
        ));
    }

    #[test]
    fn rule_id_must_be_a_non_empty_string() {
        let err = validate_params(ToolName::ActivateAutomationRule, &json!({})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "rule_id", .. }));

        let err =
            validate_params(ToolName::ActivateAutomationRule, &json!({"rule_id": ""})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "rule_id", .. }));
    }

    #[test]
    fn create_rule_fills_is_enabled_default() {
        let normalized =
            validate_params(ToolName::CreateAutomationRule, &json!({"name": "5G Alert"})).unwrap();
        assert_eq!(normalized, json!({"name": "5G Alert", "is_enabled": false}));
    }

    #[test]
    fn validation_is_idempotent() {
        let raw = json!({
            "name": "5G Monitor with Alert",
            "condition_type": "signalDetection",
            "condition_parameters": {"signalType": "5G"},
            "action_type": "userNotification",
            "action_parameters": {"message": "Signal found!"}
        });
        let first = validate_params(ToolName::CreateRuleConditionAction, &raw).unwrap();
        let second = validate_params(ToolName::CreateRuleConditionAction, &raw).unwrap();
        assert_eq!(first, second);
        // The frequency defaults were filled deterministically.
        assert_eq!(first["condition_parameters"]["minFrequencyMHz"], json!(10.0));
        assert_eq!(first["condition_parameters"]["maxFrequencyMHz"], json!(6000.0));
    }

    #[test]
    fn combined_create_requires_both_types() {
        let err = validate_params(
            ToolName::CreateRuleConditionAction,
            &json!({"name": "Incomplete", "condition_type": "signalDetection",
                    "condition_parameters": {"signalType": "5G"}}),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "action_type", .. }));
    }

    #[test]
    fn inverted_time_window_is_a_domain_error() {
        let err = validate_params(
            ToolName::CreateAutomationRule,
            &json!({
                "name": "Windowed",
                "start_time": "2026-03-01T00:00:00Z",
                "end_time": "2026-02-01T00:00:00Z"
            }),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Domain { .. }));
    }

    #[test]
    fn update_condition_validates_partial_parameters() {
        let normalized = validate_params(
            ToolName::UpdateCondition,
            &json!({"rule_id": "rule-001", "parameters": {"minFrequencyMHz": 3500}}),
        )
        .unwrap();
        assert_eq!(
            normalized,
            json!({"rule_id": "rule-001", "parameters": {"minFrequencyMHz": 3500}})
        );

        let err = validate_params(
            ToolName::UpdateCondition,
            &json!({"rule_id": "rule-001", "parameters": {"minFrequencyMHz": 9000}}),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Domain { .. }));
    }

    #[test]
    fn update_action_rejects_unknown_action_type() {
        let err = validate_params(
            ToolName::UpdateAction,
            &json!({"rule_id": "rule-001", "action_type": "selfDestruct"}),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Domain { .. }));
    }
}
