use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::rule::RuleId;
use crate::errors::DomainError;

pub const MIN_GEOLOCATION_SENSORS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    FrequencyScanRequest,
    GeolocationRequest,
    UserNotification,
}

impl ActionType {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "frequencyScanRequest" => Ok(Self::FrequencyScanRequest),
            "geolocationRequest" => Ok(Self::GeolocationRequest),
            "userNotification" => Ok(Self::UserNotification),
            other => Err(DomainError::UnknownActionType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrequencyScanRequest => "frequencyScanRequest",
            Self::GeolocationRequest => "geolocationRequest",
            Self::UserNotification => "userNotification",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoAlgorithm {
    #[serde(rename = "TDOA")]
    Tdoa,
    #[serde(rename = "PDOA")]
    Pdoa,
}

impl GeoAlgorithm {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "TDOA" => Ok(Self::Tdoa),
            "PDOA" => Ok(Self::Pdoa),
            other => Err(DomainError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// An action executed when all of a rule's conditions are satisfied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    #[serde(rename = "rule_id")]
    pub rule_id: RuleId,
    pub action_type: ActionType,
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionDraft {
    pub action_type: ActionType,
    /// Parameter bag already normalized by [`validate_action_params`].
    pub parameters: Value,
    pub description: Option<String>,
}

/// Partial update for an existing action. `None` fields are left as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionPatch {
    pub action_id: Option<String>,
    pub action_type: Option<ActionType>,
    pub parameters: Option<Value>,
    pub description: Option<String>,
}

/// Validates a full action parameter bag and returns the normalized form.
pub fn validate_action_params(action_type: ActionType, raw: &Value) -> Result<Value, DomainError> {
    let params = as_object(raw, "action_parameters")?;

    for key in params.keys() {
        match (action_type, key.as_str()) {
            (ActionType::FrequencyScanRequest, "sensorIds") => {}
            (ActionType::GeolocationRequest, "sensorIds" | "algorithm") => {}
            (ActionType::UserNotification, "message") => {}
            (_, other) => return Err(DomainError::UnknownParameter(other.to_string())),
        }
    }

    match action_type {
        ActionType::FrequencyScanRequest => {
            sensor_ids(&params, 1)?;
        }
        ActionType::GeolocationRequest => {
            let raw_algorithm = params
                .get("algorithm")
                .and_then(Value::as_str)
                .ok_or(DomainError::MissingParameter("algorithm"))?;
            GeoAlgorithm::parse(raw_algorithm)?;
            sensor_ids(&params, MIN_GEOLOCATION_SENSORS)?;
        }
        ActionType::UserNotification => {
            message(&params)?;
        }
    }

    Ok(Value::Object(params))
}

/// Validates the provided fields of a partial action-parameter update.
pub fn validate_action_patch_params(raw: &Value) -> Result<Value, DomainError> {
    let params = as_object(raw, "parameters")?;

    for (key, value) in &params {
        match key.as_str() {
            "message" => {
                let text = value.as_str().ok_or(DomainError::EmptyNotificationMessage)?;
                if text.trim().is_empty() {
                    return Err(DomainError::EmptyNotificationMessage);
                }
            }
            "sensorIds" => {
                let sensors = value.as_array().ok_or(DomainError::EmptySensorList)?;
                if sensors.is_empty() || sensors.iter().any(|entry| !entry.is_string()) {
                    return Err(DomainError::EmptySensorList);
                }
            }
            "algorithm" => {
                let raw_algorithm = value.as_str().ok_or_else(|| {
                    DomainError::UnknownAlgorithm("(not a string)".to_string())
                })?;
                GeoAlgorithm::parse(raw_algorithm)?;
            }
            other => return Err(DomainError::UnknownParameter(other.to_string())),
        }
    }

    Ok(Value::Object(params))
}

fn as_object(raw: &Value, name: &str) -> Result<Map<String, Value>, DomainError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        _ => Err(DomainError::InvalidParameter {
            name: name.to_string(),
            reason: "expected an object".to_string(),
        }),
    }
}

fn sensor_ids(params: &Map<String, Value>, minimum: usize) -> Result<(), DomainError> {
    let sensors = params
        .get("sensorIds")
        .ok_or(DomainError::MissingParameter("sensorIds"))?
        .as_array()
        .ok_or(DomainError::EmptySensorList)?;
    if sensors.is_empty() || sensors.iter().any(|entry| !entry.is_string()) {
        return Err(DomainError::EmptySensorList);
    }
    if sensors.len() < minimum {
        return Err(DomainError::NotEnoughSensors { required: minimum });
    }
    Ok(())
}

fn message(params: &Map<String, Value>) -> Result<(), DomainError> {
    let text = params
        .get("message")
        .ok_or(DomainError::MissingParameter("message"))?
        .as_str()
        .ok_or(DomainError::EmptyNotificationMessage)?;
    if text.trim().is_empty() {
        return Err(DomainError::EmptyNotificationMessage);
    }
    Ok(())
}
