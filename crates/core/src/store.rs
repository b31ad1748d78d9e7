//! Rule persistence boundary.
//!
//! `RuleStore` is the backend seam the orchestration engine calls through.
//! Failures are typed so callers can record them as data (not-found versus
//! constraint-violation versus backend-unavailable) instead of surfacing raw
//! errors. `InMemoryRuleStore` is the shipped implementation, optionally
//! seeded with demo fixtures.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::action::{Action, ActionDraft, ActionPatch};
use crate::domain::condition::{Condition, ConditionDraft, ConditionPatch};
use crate::domain::rule::{AutomationRule, RuleDraft, RuleId};
use crate::errors::DomainError;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("rule `{0}` was not found")]
    RuleNotFound(RuleId),
    #[error("condition `{condition_id}` was not found for rule `{rule_id}`")]
    ConditionNotFound { rule_id: RuleId, condition_id: String },
    #[error("no conditions exist for rule `{0}`")]
    NoConditions(RuleId),
    #[error("action `{action_id}` was not found for rule `{rule_id}`")]
    ActionNotFound { rule_id: RuleId, action_id: String },
    #[error("no actions exist for rule `{0}`")]
    NoActions(RuleId),
    #[error(transparent)]
    Constraint(#[from] DomainError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable machine-readable code recorded alongside tool failures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RuleNotFound(_)
            | Self::ConditionNotFound { .. }
            | Self::NoConditions(_)
            | Self::ActionNotFound { .. }
            | Self::NoActions(_) => "not_found",
            Self::Constraint(_) => "constraint_violation",
            Self::Unavailable(_) => "backend_unavailable",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleStatus {
    Activated,
    AlreadyActive,
    Deactivated,
    AlreadyInactive,
}

/// Result of an activate/deactivate call. Toggling a rule that is already in
/// the requested state succeeds with the `Already*` status.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToggleOutcome {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub status: ToggleStatus,
}

/// Result of a partial update, listing exactly which fields changed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateOutcome<T> {
    pub entity: T,
    pub updates_made: Vec<String>,
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<AutomationRule>, StoreError>;
    async fn get_rule(&self, rule_id: &RuleId) -> Result<AutomationRule, StoreError>;
    async fn list_conditions(&self, rule_id: &RuleId) -> Result<Vec<Condition>, StoreError>;
    async fn list_actions(&self, rule_id: &RuleId) -> Result<Vec<Action>, StoreError>;
    async fn create_rule(&self, draft: RuleDraft) -> Result<AutomationRule, StoreError>;
    async fn create_condition(
        &self,
        rule_id: &RuleId,
        draft: ConditionDraft,
    ) -> Result<Condition, StoreError>;
    async fn create_action(
        &self,
        rule_id: &RuleId,
        draft: ActionDraft,
    ) -> Result<Action, StoreError>;
    async fn activate_rule(&self, rule_id: &RuleId) -> Result<ToggleOutcome, StoreError>;
    async fn deactivate_rule(&self, rule_id: &RuleId) -> Result<ToggleOutcome, StoreError>;
    async fn update_condition(
        &self,
        rule_id: &RuleId,
        patch: ConditionPatch,
    ) -> Result<UpdateOutcome<Condition>, StoreError>;
    async fn update_action(
        &self,
        rule_id: &RuleId,
        patch: ActionPatch,
    ) -> Result<UpdateOutcome<Action>, StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    rules: Vec<AutomationRule>,
    conditions: BTreeMap<String, Vec<Condition>>,
    actions: BTreeMap<String, Vec<Action>>,
}

#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    tables: Mutex<Tables>,
}

impl InMemoryRuleStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A store pre-populated with the three demo rules used by tests and the
    /// CLI demo mode.
    pub fn with_seed_data() -> Self {
        let store = Self::default();
        {
            let mut tables = store.lock();
            seed(&mut tables);
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list_rules(&self) -> Result<Vec<AutomationRule>, StoreError> {
        Ok(self.lock().rules.clone())
    }

    async fn get_rule(&self, rule_id: &RuleId) -> Result<AutomationRule, StoreError> {
        let tables = self.lock();
        tables
            .rules
            .iter()
            .find(|rule| &rule.id == rule_id)
            .cloned()
            .ok_or_else(|| StoreError::RuleNotFound(rule_id.clone()))
    }

    async fn list_conditions(&self, rule_id: &RuleId) -> Result<Vec<Condition>, StoreError> {
        Ok(self.lock().conditions.get(&rule_id.0).cloned().unwrap_or_default())
    }

    async fn list_actions(&self, rule_id: &RuleId) -> Result<Vec<Action>, StoreError> {
        Ok(self.lock().actions.get(&rule_id.0).cloned().unwrap_or_default())
    }

    async fn create_rule(&self, draft: RuleDraft) -> Result<AutomationRule, StoreError> {
        draft.validate()?;
        let now = Utc::now();
        let rule = AutomationRule {
            id: RuleId(Uuid::new_v4().to_string()),
            name: draft.name,
            description: draft.description,
            is_enabled: draft.is_enabled,
            created_at: now,
            updated_at: now,
            max_executions: draft.max_executions,
            executions_remaining: draft.max_executions,
            start_time: draft.start_time,
            end_time: draft.end_time,
        };
        self.lock().rules.push(rule.clone());
        Ok(rule)
    }

    async fn create_condition(
        &self,
        rule_id: &RuleId,
        draft: ConditionDraft,
    ) -> Result<Condition, StoreError> {
        let mut tables = self.lock();
        ensure_rule_exists(&tables, rule_id)?;
        let now = Utc::now();
        let condition = Condition {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.clone(),
            condition_type: draft.condition_type,
            parameters: draft.parameters,
            description: draft.description,
            is_satisfied: false,
            satisfied_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.conditions.entry(rule_id.0.clone()).or_default().push(condition.clone());
        Ok(condition)
    }

    async fn create_action(
        &self,
        rule_id: &RuleId,
        draft: ActionDraft,
    ) -> Result<Action, StoreError> {
        let mut tables = self.lock();
        ensure_rule_exists(&tables, rule_id)?;
        let now = Utc::now();
        let action = Action {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.clone(),
            action_type: draft.action_type,
            parameters: draft.parameters,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        tables.actions.entry(rule_id.0.clone()).or_default().push(action.clone());
        Ok(action)
    }

    async fn activate_rule(&self, rule_id: &RuleId) -> Result<ToggleOutcome, StoreError> {
        let mut tables = self.lock();
        let rule = tables
            .rules
            .iter_mut()
            .find(|rule| &rule.id == rule_id)
            .ok_or_else(|| StoreError::RuleNotFound(rule_id.clone()))?;

        if rule.is_enabled {
            return Ok(ToggleOutcome {
                rule_id: rule_id.clone(),
                rule_name: rule.name.clone(),
                status: ToggleStatus::AlreadyActive,
            });
        }

        rule.is_enabled = true;
        rule.updated_at = Utc::now();
        let rule_name = rule.name.clone();

        // Activation restarts monitoring: condition satisfaction resets.
        if let Some(conditions) = tables.conditions.get_mut(&rule_id.0) {
            for condition in conditions {
                condition.is_satisfied = false;
                condition.satisfied_at = None;
            }
        }

        Ok(ToggleOutcome {
            rule_id: rule_id.clone(),
            rule_name,
            status: ToggleStatus::Activated,
        })
    }

    async fn deactivate_rule(&self, rule_id: &RuleId) -> Result<ToggleOutcome, StoreError> {
        let mut tables = self.lock();
        let rule = tables
            .rules
            .iter_mut()
            .find(|rule| &rule.id == rule_id)
            .ok_or_else(|| StoreError::RuleNotFound(rule_id.clone()))?;

        if !rule.is_enabled {
            return Ok(ToggleOutcome {
                rule_id: rule_id.clone(),
                rule_name: rule.name.clone(),
                status: ToggleStatus::AlreadyInactive,
            });
        }

        rule.is_enabled = false;
        rule.updated_at = Utc::now();
        Ok(ToggleOutcome {
            rule_id: rule_id.clone(),
            rule_name: rule.name.clone(),
            status: ToggleStatus::Deactivated,
        })
    }

    async fn update_condition(
        &self,
        rule_id: &RuleId,
        patch: ConditionPatch,
    ) -> Result<UpdateOutcome<Condition>, StoreError> {
        let mut tables = self.lock();
        ensure_rule_exists(&tables, rule_id)?;

        let conditions = tables
            .conditions
            .get_mut(&rule_id.0)
            .filter(|conditions| !conditions.is_empty())
            .ok_or_else(|| StoreError::NoConditions(rule_id.clone()))?;

        // Without an explicit id the first condition of the rule is targeted.
        let condition = match &patch.condition_id {
            Some(condition_id) => conditions
                .iter_mut()
                .find(|condition| &condition.id == condition_id)
                .ok_or_else(|| StoreError::ConditionNotFound {
                    rule_id: rule_id.clone(),
                    condition_id: condition_id.clone(),
                })?,
            None => &mut conditions[0],
        };

        let mut updates_made = Vec::new();
        if let Some(condition_type) = patch.condition_type {
            condition.condition_type = condition_type;
            updates_made.push(format!("conditionType -> {}", condition_type.as_str()));
        }
        if let Some(Value::Object(fields)) = patch.parameters {
            let existing = condition.parameters.as_object_mut();
            match existing {
                Some(existing) => {
                    for (key, value) in fields {
                        updates_made.push(format!("{key} -> {value}"));
                        existing.insert(key, value);
                    }
                }
                None => {
                    updates_made.push("parameters replaced".to_string());
                    condition.parameters = Value::Object(fields);
                }
            }
        }
        if let Some(description) = patch.description {
            condition.description = Some(description);
            updates_made.push("description updated".to_string());
        }
        condition.updated_at = Utc::now();

        Ok(UpdateOutcome { entity: condition.clone(), updates_made })
    }

    async fn update_action(
        &self,
        rule_id: &RuleId,
        patch: ActionPatch,
    ) -> Result<UpdateOutcome<Action>, StoreError> {
        let mut tables = self.lock();
        ensure_rule_exists(&tables, rule_id)?;

        let actions = tables
            .actions
            .get_mut(&rule_id.0)
            .filter(|actions| !actions.is_empty())
            .ok_or_else(|| StoreError::NoActions(rule_id.clone()))?;

        let action = match &patch.action_id {
            Some(action_id) => actions
                .iter_mut()
                .find(|action| &action.id == action_id)
                .ok_or_else(|| StoreError::ActionNotFound {
                    rule_id: rule_id.clone(),
                    action_id: action_id.clone(),
                })?,
            None => &mut actions[0],
        };

        let mut updates_made = Vec::new();
        if let Some(action_type) = patch.action_type {
            action.action_type = action_type;
            updates_made.push(format!("actionType -> {}", action_type.as_str()));
        }
        if let Some(Value::Object(fields)) = patch.parameters {
            let existing = action.parameters.as_object_mut();
            match existing {
                Some(existing) => {
                    for (key, value) in fields {
                        updates_made.push(format!("{key} -> {value}"));
                        existing.insert(key, value);
                    }
                }
                None => {
                    updates_made.push("parameters replaced".to_string());
                    action.parameters = Value::Object(fields);
                }
            }
        }
        if let Some(description) = patch.description {
            action.description = Some(description);
            updates_made.push("description updated".to_string());
        }
        action.updated_at = Utc::now();

        Ok(UpdateOutcome { entity: action.clone(), updates_made })
    }
}

fn ensure_rule_exists(tables: &Tables, rule_id: &RuleId) -> Result<(), StoreError> {
    if tables.rules.iter().any(|rule| &rule.id == rule_id) {
        Ok(())
    } else {
        Err(StoreError::RuleNotFound(rule_id.clone()))
    }
}

fn seed(tables: &mut Tables) {
    use crate::domain::action::ActionType;
    use crate::domain::condition::ConditionType;
    use serde_json::json;

    let now = Utc::now();
    let mut push_rule = |id: &str, name: &str, description: &str, is_enabled: bool| {
        tables.rules.push(AutomationRule {
            id: RuleId(id.to_string()),
            name: name.to_string(),
            description: Some(description.to_string()),
            is_enabled,
            created_at: now,
            updated_at: now,
            max_executions: None,
            executions_remaining: None,
            start_time: None,
            end_time: None,
        });
    };

    push_rule("rule-001", "5G Monitor", "Monitors 5G signals in mid-band", true);
    push_rule("rule-002", "LTE Detector", "Detects LTE signals", true);
    push_rule(
        "rule-003",
        "Energy Threshold Alert",
        "Alerts when energy exceeds threshold",
        false,
    );

    let mut push_condition =
        |id: &str, rule_id: &str, condition_type: ConditionType, parameters: Value| {
            tables.conditions.entry(rule_id.to_string()).or_default().push(Condition {
                id: id.to_string(),
                rule_id: RuleId(rule_id.to_string()),
                condition_type,
                parameters,
                description: None,
                is_satisfied: false,
                satisfied_at: None,
                created_at: now,
                updated_at: now,
            });
        };

    push_condition(
        "cond-001",
        "rule-001",
        ConditionType::SignalDetection,
        json!({"minFrequencyMHz": 3400, "maxFrequencyMHz": 3600, "signalType": "5G"}),
    );
    push_condition(
        "cond-002",
        "rule-002",
        ConditionType::SignalDetection,
        json!({"minFrequencyMHz": 1800, "maxFrequencyMHz": 2100, "signalType": "LTE"}),
    );
    push_condition(
        "cond-003",
        "rule-003",
        ConditionType::SpectralEnergy,
        json!({"minFrequencyMHz": 2400, "maxFrequencyMHz": 2500, "threshold_dBm": -70}),
    );

    let mut push_action = |id: &str, rule_id: &str, action_type: ActionType, parameters: Value| {
        tables.actions.entry(rule_id.to_string()).or_default().push(Action {
            id: id.to_string(),
            rule_id: RuleId(rule_id.to_string()),
            action_type,
            parameters,
            description: None,
            created_at: now,
            updated_at: now,
        });
    };

    push_action(
        "act-001",
        "rule-001",
        ActionType::UserNotification,
        json!({"message": "5G signal detected in mid-band"}),
    );
    push_action(
        "act-002",
        "rule-002",
        ActionType::FrequencyScanRequest,
        json!({"sensorIds": ["sensor-01", "sensor-02"]}),
    );
    push_action(
        "act-003",
        "rule-003",
        ActionType::GeolocationRequest,
        json!({"algorithm": "TDOA", "sensorIds": ["sensor-01", "sensor-02", "sensor-03"]}),
    );
}
