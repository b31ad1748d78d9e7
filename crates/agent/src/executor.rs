//! Tool execution.
//!
//! Invokes the store operation behind a validated tool call and converts the
//! result (success or typed failure) into data: a `ToolOutcome`, a one-line
//! summary for the planner's history, and the accumulator entries the result
//! contributes. Store failures never escape as control flow.

use serde::Deserialize;
use serde_json::{json, Value};

use specwatch_core::domain::action::{ActionDraft, ActionPatch, ActionType};
use specwatch_core::domain::condition::{ConditionDraft, ConditionPatch, ConditionType};
use specwatch_core::domain::rule::{parse_datetime, RuleDraft, RuleId};
use specwatch_core::errors::DomainError;
use specwatch_core::store::{RuleStore, StoreError, ToggleOutcome, ToggleStatus};

use crate::registry::ToolName;
use crate::state::ToolOutcome;

/// Everything one `EXECUTING` pass produces.
#[derive(Clone, Debug)]
pub struct Execution {
    pub outcome: ToolOutcome,
    pub summary: String,
    /// Role-keyed accumulator entries; empty on failure.
    pub accumulates: Vec<(String, Value)>,
}

type ToolResult = Result<(Value, String, Vec<(String, Value)>), StoreError>;

pub async fn invoke(store: &dyn RuleStore, tool: ToolName, parameters: &Value) -> Execution {
    let result = dispatch(store, tool, parameters).await;
    match result {
        Ok((value, summary, accumulates)) => Execution {
            outcome: ToolOutcome::Success(value),
            summary,
            accumulates,
        },
        Err(error) => Execution {
            outcome: ToolOutcome::Failure {
                code: error.code().to_string(),
                message: error.to_string(),
            },
            summary: error.to_string(),
            accumulates: Vec::new(),
        },
    }
}

async fn dispatch(store: &dyn RuleStore, tool: ToolName, parameters: &Value) -> ToolResult {
    match tool {
        ToolName::ListAutomationRules => {
            let rules = store.list_rules().await?;
            let value = encode(&rules);
            let summary = format!("Retrieved {} rules", rules.len());
            Ok((value.clone(), summary, vec![("rules".to_string(), value)]))
        }
        ToolName::GetAutomationRule => {
            let params: RuleIdParams = decode(parameters)?;
            let rule = store.get_rule(&RuleId(params.rule_id.clone())).await?;
            let value = encode(&rule);
            let summary = format!("Retrieved rule '{}' (ID: {})", rule.name, rule.id);
            Ok((value.clone(), summary, vec![(format!("rule:{}", rule.id), value)]))
        }
        ToolName::ListConditionsForRule => {
            let params: RuleIdParams = decode(parameters)?;
            let conditions = store.list_conditions(&RuleId(params.rule_id.clone())).await?;
            let value = encode(&conditions);
            let summary =
                format!("Retrieved {} conditions for rule {}", conditions.len(), params.rule_id);
            Ok((value.clone(), summary, vec![(format!("conditions:{}", params.rule_id), value)]))
        }
        ToolName::ListActionsForRule => {
            let params: RuleIdParams = decode(parameters)?;
            let actions = store.list_actions(&RuleId(params.rule_id.clone())).await?;
            let value = encode(&actions);
            let summary =
                format!("Retrieved {} actions for rule {}", actions.len(), params.rule_id);
            Ok((value.clone(), summary, vec![(format!("actions:{}", params.rule_id), value)]))
        }
        ToolName::CreateAutomationRule => {
            let params: CreateRuleParams = decode(parameters)?;
            let rule = store.create_rule(rule_draft(&params)?).await?;
            let value = encode(&rule);
            let summary = format!("Created rule '{}' (ID: {})", rule.name, rule.id);
            Ok((value.clone(), summary, vec![("rule".to_string(), value)]))
        }
        ToolName::CreateRuleCondition => {
            let params: CreateRuleConditionParams = decode(parameters)?;
            let rule = store.create_rule(rule_draft(&params.rule)?).await?;
            let condition = store
                .create_condition(&rule.id, condition_draft(&params.condition)?)
                .await
                .map_err(|error| after_partial_create(&rule.name, &rule.id, error))?;

            let rule_value = encode(&rule);
            let condition_value = encode(&condition);
            let summary = format!(
                "Successfully created rule '{}' (ID: {}) with {} condition (ID: {})",
                rule.name,
                rule.id,
                condition.condition_type.as_str(),
                condition.id
            );
            let value = json!({
                "success": true,
                "rule": rule_value,
                "rule_id": rule.id,
                "rule_name": rule.name,
                "condition": condition_value,
                "condition_id": condition.id,
                "condition_type": condition.condition_type,
                "message": summary,
            });
            Ok((
                value,
                summary,
                vec![
                    ("rule".to_string(), rule_value),
                    ("condition".to_string(), condition_value),
                ],
            ))
        }
        ToolName::CreateRuleAction => {
            let params: CreateRuleActionParams = decode(parameters)?;
            let rule = store.create_rule(rule_draft(&params.rule)?).await?;
            let action = store
                .create_action(&rule.id, action_draft(&params.action)?)
                .await
                .map_err(|error| after_partial_create(&rule.name, &rule.id, error))?;

            let rule_value = encode(&rule);
            let action_value = encode(&action);
            let summary = format!(
                "Successfully created rule '{}' (ID: {}) with {} action (ID: {})",
                rule.name,
                rule.id,
                action.action_type.as_str(),
                action.id
            );
            let value = json!({
                "success": true,
                "rule": rule_value,
                "rule_id": rule.id,
                "rule_name": rule.name,
                "action": action_value,
                "action_id": action.id,
                "action_type": action.action_type,
                "message": summary,
            });
            Ok((
                value,
                summary,
                vec![
                    ("rule".to_string(), rule_value),
                    ("action".to_string(), action_value),
                ],
            ))
        }
        ToolName::CreateRuleConditionAction => {
            let params: CreateRuleConditionActionParams = decode(parameters)?;
            let rule = store.create_rule(rule_draft(&params.rule)?).await?;
            let condition = store
                .create_condition(&rule.id, condition_draft(&params.condition)?)
                .await
                .map_err(|error| after_partial_create(&rule.name, &rule.id, error))?;
            let action = store
                .create_action(&rule.id, action_draft(&params.action)?)
                .await
                .map_err(|error| after_partial_create(&rule.name, &rule.id, error))?;

            let rule_value = encode(&rule);
            let condition_value = encode(&condition);
            let action_value = encode(&action);
            let summary = format!(
                "Successfully created rule '{}' (ID: {}) with {} condition (ID: {}) and {} action (ID: {})",
                rule.name,
                rule.id,
                condition.condition_type.as_str(),
                condition.id,
                action.action_type.as_str(),
                action.id
            );
            let value = json!({
                "success": true,
                "rule": rule_value,
                "rule_id": rule.id,
                "rule_name": rule.name,
                "condition": condition_value,
                "condition_id": condition.id,
                "condition_type": condition.condition_type,
                "action": action_value,
                "action_id": action.id,
                "action_type": action.action_type,
                "message": summary,
            });
            Ok((
                value,
                summary,
                vec![
                    ("rule".to_string(), rule_value),
                    ("condition".to_string(), condition_value),
                    ("action".to_string(), action_value),
                ],
            ))
        }
        ToolName::ActivateAutomationRule => {
            let params: RuleIdParams = decode(parameters)?;
            let outcome = store.activate_rule(&RuleId(params.rule_id)).await?;
            let summary = toggle_summary(&outcome);
            let value = encode(&outcome);
            Ok((value.clone(), summary, vec![("activation".to_string(), value)]))
        }
        ToolName::DeactivateAutomationRule => {
            let params: RuleIdParams = decode(parameters)?;
            let outcome = store.deactivate_rule(&RuleId(params.rule_id)).await?;
            let summary = toggle_summary(&outcome);
            let value = encode(&outcome);
            Ok((value.clone(), summary, vec![("deactivation".to_string(), value)]))
        }
        ToolName::UpdateCondition => {
            let params: UpdateConditionParams = decode(parameters)?;
            let patch = ConditionPatch {
                condition_id: params.condition_id,
                condition_type: params
                    .condition_type
                    .as_deref()
                    .map(ConditionType::parse)
                    .transpose()?,
                parameters: params.parameters,
                description: params.description,
            };
            let outcome =
                store.update_condition(&RuleId(params.rule_id), patch).await?;
            let summary = if outcome.updates_made.is_empty() {
                format!("No changes were made to condition {}", outcome.entity.id)
            } else {
                format!(
                    "Updated condition {}: {}",
                    outcome.entity.id,
                    outcome.updates_made.join(", ")
                )
            };
            let entity_value = encode(&outcome.entity);
            let value = json!({
                "condition": entity_value,
                "updates_made": outcome.updates_made,
            });
            Ok((value, summary, vec![("condition".to_string(), entity_value)]))
        }
        ToolName::UpdateAction => {
            let params: UpdateActionParams = decode(parameters)?;
            let patch = ActionPatch {
                action_id: params.action_id,
                action_type: params.action_type.as_deref().map(ActionType::parse).transpose()?,
                parameters: params.parameters,
                description: params.description,
            };
            let outcome = store.update_action(&RuleId(params.rule_id), patch).await?;
            let summary = if outcome.updates_made.is_empty() {
                format!("No changes were made to action {}", outcome.entity.id)
            } else {
                format!(
                    "Updated action {}: {}",
                    outcome.entity.id,
                    outcome.updates_made.join(", ")
                )
            };
            let entity_value = encode(&outcome.entity);
            let value = json!({
                "action": entity_value,
                "updates_made": outcome.updates_made,
            });
            Ok((value, summary, vec![("action".to_string(), entity_value)]))
        }
    }
}

#[derive(Deserialize)]
struct RuleIdParams {
    rule_id: String,
}

#[derive(Deserialize)]
struct CreateRuleParams {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_enabled: bool,
    #[serde(default)]
    max_executions: Option<u32>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
}

#[derive(Deserialize)]
struct ConditionParams {
    condition_type: String,
    condition_parameters: Value,
    #[serde(default)]
    condition_description: Option<String>,
}

#[derive(Deserialize)]
struct ActionParams {
    action_type: String,
    action_parameters: Value,
    #[serde(default)]
    action_description: Option<String>,
}

#[derive(Deserialize)]
struct CreateRuleConditionParams {
    #[serde(flatten)]
    rule: CreateRuleParams,
    #[serde(flatten)]
    condition: ConditionParams,
}

#[derive(Deserialize)]
struct CreateRuleActionParams {
    #[serde(flatten)]
    rule: CreateRuleParams,
    #[serde(flatten)]
    action: ActionParams,
}

#[derive(Deserialize)]
struct CreateRuleConditionActionParams {
    #[serde(flatten)]
    rule: CreateRuleParams,
    #[serde(flatten)]
    condition: ConditionParams,
    #[serde(flatten)]
    action: ActionParams,
}

#[derive(Deserialize)]
struct UpdateConditionParams {
    rule_id: String,
    #[serde(default)]
    condition_id: Option<String>,
    #[serde(default)]
    condition_type: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct UpdateActionParams {
    rule_id: String,
    #[serde(default)]
    action_id: Option<String>,
    #[serde(default)]
    action_type: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

fn decode<T: serde::de::DeserializeOwned>(parameters: &Value) -> Result<T, StoreError> {
    serde_json::from_value(parameters.clone()).map_err(|error| {
        StoreError::Constraint(DomainError::InvalidParameter {
            name: "parameters".to_string(),
            reason: error.to_string(),
        })
    })
}

fn encode<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn rule_draft(params: &CreateRuleParams) -> Result<RuleDraft, StoreError> {
    let start_time = params.start_time.as_deref().map(parse_datetime).transpose()?;
    let end_time = params.end_time.as_deref().map(parse_datetime).transpose()?;
    Ok(RuleDraft {
        name: params.name.clone(),
        description: params.description.clone(),
        is_enabled: params.is_enabled,
        max_executions: params.max_executions,
        start_time,
        end_time,
    })
}

fn condition_draft(params: &ConditionParams) -> Result<ConditionDraft, StoreError> {
    Ok(ConditionDraft {
        condition_type: ConditionType::parse(&params.condition_type)?,
        parameters: params.condition_parameters.clone(),
        description: params.condition_description.clone(),
    })
}

fn action_draft(params: &ActionParams) -> Result<ActionDraft, StoreError> {
    Ok(ActionDraft {
        action_type: ActionType::parse(&params.action_type)?,
        parameters: params.action_parameters.clone(),
        description: params.action_description.clone(),
    })
}

fn toggle_summary(outcome: &ToggleOutcome) -> String {
    match outcome.status {
        ToggleStatus::Activated => format!(
            "Activated rule '{}' (ID: {}); it is now monitoring for conditions",
            outcome.rule_name, outcome.rule_id
        ),
        ToggleStatus::AlreadyActive => format!(
            "Rule '{}' (ID: {}) is already activated",
            outcome.rule_name, outcome.rule_id
        ),
        ToggleStatus::Deactivated => format!(
            "Deactivated rule '{}' (ID: {}); its configuration is preserved",
            outcome.rule_name, outcome.rule_id
        ),
        ToggleStatus::AlreadyInactive => format!(
            "Rule '{}' (ID: {}) is already deactivated",
            outcome.rule_name, outcome.rule_id
        ),
    }
}

/// A combined create tool failing after the rule write leaves the rule in
/// place; the failure message must say so.
fn after_partial_create(rule_name: &str, rule_id: &RuleId, error: StoreError) -> StoreError {
    StoreError::Unavailable(format!(
        "rule '{rule_name}' (ID: {rule_id}) was created, but a follow-up write failed: {error}"
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use specwatch_core::store::InMemoryRuleStore;

    use super::invoke;
    use crate::registry::ToolName;
    use crate::state::ToolOutcome;

    #[tokio::test]
    async fn list_rules_accumulates_under_rules_role() {
        let store = InMemoryRuleStore::with_seed_data();
        let execution = invoke(&store, ToolName::ListAutomationRules, &json!({})).await;

        assert!(matches!(execution.outcome, ToolOutcome::Success(_)));
        assert_eq!(execution.summary, "Retrieved 3 rules");
        assert_eq!(execution.accumulates.len(), 1);
        assert_eq!(execution.accumulates[0].0, "rules");
    }

    #[tokio::test]
    async fn missing_rule_becomes_failure_data() {
        let store = InMemoryRuleStore::with_seed_data();
        let execution = invoke(
            &store,
            ToolName::GetAutomationRule,
            &json!({"rule_id": "rule-404"}),
        )
        .await;

        match execution.outcome {
            ToolOutcome::Failure { code, message } => {
                assert_eq!(code, "not_found");
                assert!(message.contains("rule-404"));
            }
            ToolOutcome::Success(_) => panic!("expected failure outcome"),
        }
        assert!(execution.accumulates.is_empty());
    }

    #[tokio::test]
    async fn combined_create_returns_all_three_ids() {
        let store = InMemoryRuleStore::empty();
        let execution = invoke(
            &store,
            ToolName::CreateRuleConditionAction,
            &json!({
                "name": "5G Monitor with Alert",
                "is_enabled": false,
                "condition_type": "signalDetection",
                "condition_parameters": {
                    "minFrequencyMHz": 3400.0, "maxFrequencyMHz": 3600.0, "signalType": "5G"
                },
                "action_type": "userNotification",
                "action_parameters": {"message": "Signal found!"}
            }),
        )
        .await;

        let value = match execution.outcome {
            ToolOutcome::Success(value) => value,
            ToolOutcome::Failure { message, .. } => panic!("unexpected failure: {message}"),
        };
        assert_eq!(value["success"], json!(true));
        assert!(value["rule_id"].is_string());
        assert!(value["condition_id"].is_string());
        assert!(value["action_id"].is_string());
        let roles: Vec<&str> =
            execution.accumulates.iter().map(|(role, _)| role.as_str()).collect();
        assert_eq!(roles, vec!["rule", "condition", "action"]);
    }

    #[tokio::test]
    async fn activation_summary_reflects_idempotent_status() {
        let store = InMemoryRuleStore::with_seed_data();
        let first = invoke(
            &store,
            ToolName::ActivateAutomationRule,
            &json!({"rule_id": "rule-003"}),
        )
        .await;
        assert!(first.summary.starts_with("Activated rule"));

        let second = invoke(
            &store,
            ToolName::ActivateAutomationRule,
            &json!({"rule_id": "rule-003"}),
        )
        .await;
        assert!(second.summary.contains("already activated"));
    }

    #[tokio::test]
    async fn update_condition_reports_changed_fields() {
        let store = InMemoryRuleStore::with_seed_data();
        let execution = invoke(
            &store,
            ToolName::UpdateCondition,
            &json!({"rule_id": "rule-001", "parameters": {"minFrequencyMHz": 3500}}),
        )
        .await;

        assert!(execution.summary.starts_with("Updated condition cond-001"));
        assert_eq!(execution.accumulates[0].0, "condition");
    }
}
