pub mod config;
pub mod domain;
pub mod errors;
pub mod knowledge;
pub mod store;

pub use config::{AppConfig, ConfigError, EngineConfig, LlmConfig, LoadOptions, LogFormat};
pub use domain::action::{Action, ActionDraft, ActionPatch, ActionType, GeoAlgorithm};
pub use domain::condition::{
    Condition, ConditionDraft, ConditionPatch, ConditionType, SignalType,
};
pub use domain::rule::{AutomationRule, RuleDraft, RuleId};
pub use errors::DomainError;
pub use store::{
    InMemoryRuleStore, RuleStore, StoreError, ToggleOutcome, ToggleStatus, UpdateOutcome,
};
