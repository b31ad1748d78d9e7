use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A monitoring rule as stored and returned by the backend.
///
/// Field names serialize to the wire form the rest of the system exchanges
/// (`isEnabled`, `createdAt`, ...), matching the store's persisted shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_executions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executions_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Input for creating a rule. Rules are created disabled unless the draft
/// explicitly enables them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleDraft {
    pub name: String,
    pub description: Option<String>,
    pub is_enabled: bool,
    pub max_executions: Option<u32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl RuleDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::EmptyRuleName);
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                return Err(DomainError::InvalidTimeWindow);
            }
        }
        Ok(())
    }
}

/// Parses an ISO-8601 / RFC 3339 datetime, accepting a trailing `Z`.
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| DomainError::InvalidDatetime(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::{parse_datetime, RuleDraft};
    use crate::errors::DomainError;

    #[test]
    fn draft_with_blank_name_is_rejected() {
        let draft = RuleDraft { name: "   ".to_string(), ..RuleDraft::default() };
        assert_eq!(draft.validate(), Err(DomainError::EmptyRuleName));
    }

    #[test]
    fn inverted_time_window_is_rejected() {
        let draft = RuleDraft {
            name: "Band Watch".to_string(),
            start_time: Some(chrono::Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
            end_time: Some(chrono::Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
            ..RuleDraft::default()
        };
        assert_eq!(draft.validate(), Err(DomainError::InvalidTimeWindow));
    }

    #[test]
    fn datetime_parsing_accepts_zulu_suffix() {
        let parsed = parse_datetime("2026-01-15T10:30:00Z").expect("valid datetime");
        assert_eq!(parsed.timestamp(), 1_768_473_000);
    }

    #[test]
    fn datetime_parsing_rejects_garbage() {
        assert!(matches!(parse_datetime("next tuesday"), Err(DomainError::InvalidDatetime(_))));
    }
}
