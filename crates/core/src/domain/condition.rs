use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::rule::RuleId;
use crate::errors::DomainError;

pub const MIN_FREQUENCY_MHZ: f64 = 10.0;
pub const MAX_FREQUENCY_MHZ: f64 = 6000.0;
pub const MIN_THRESHOLD_DBM: f64 = -150.0;
pub const MAX_THRESHOLD_DBM: f64 = 150.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionType {
    SignalDetection,
    SpectralEnergy,
}

impl ConditionType {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "signalDetection" => Ok(Self::SignalDetection),
            "spectralEnergy" => Ok(Self::SpectralEnergy),
            other => Err(DomainError::UnknownConditionType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignalDetection => "signalDetection",
            Self::SpectralEnergy => "spectralEnergy",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Energy,
    #[serde(rename = "5G")]
    FiveG,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "QPSK")]
    Qpsk,
    #[serde(rename = "CW")]
    Cw,
    #[serde(rename = "PCMPM")]
    Pcmpm,
    #[serde(rename = "CPM")]
    Cpm,
    #[serde(rename = "CPMFM")]
    Cpmfm,
    #[serde(rename = "BPSK")]
    Bpsk,
    #[serde(rename = "SOQPSK")]
    Soqpsk,
}

impl SignalType {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "Energy" => Ok(Self::Energy),
            "5G" => Ok(Self::FiveG),
            "LTE" => Ok(Self::Lte),
            "QPSK" => Ok(Self::Qpsk),
            "CW" => Ok(Self::Cw),
            "PCMPM" => Ok(Self::Pcmpm),
            "CPM" => Ok(Self::Cpm),
            "CPMFM" => Ok(Self::Cpmfm),
            "BPSK" => Ok(Self::Bpsk),
            "SOQPSK" => Ok(Self::Soqpsk),
            other => Err(DomainError::UnknownSignalType(other.to_string())),
        }
    }
}

/// A trigger condition attached to a rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    #[serde(rename = "rule_id")]
    pub rule_id: RuleId,
    pub condition_type: ConditionType,
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_satisfied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionDraft {
    pub condition_type: ConditionType,
    /// Parameter bag already normalized by [`validate_condition_params`].
    pub parameters: Value,
    pub description: Option<String>,
}

/// Partial update for an existing condition. `None` fields are left as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionPatch {
    pub condition_id: Option<String>,
    pub condition_type: Option<ConditionType>,
    pub parameters: Option<Value>,
    pub description: Option<String>,
}

/// Validates a full condition parameter bag and returns the normalized form.
///
/// Frequency bounds default to the supported full span (10..6000 MHz) when
/// omitted, so repeated validation of the same sparse input is idempotent.
/// Unknown keys are rejected before any side-effecting call can see them.
pub fn validate_condition_params(
    condition_type: ConditionType,
    raw: &Value,
) -> Result<Value, DomainError> {
    let mut params = as_object(raw, "condition_parameters")?;

    for key in params.keys() {
        match (condition_type, key.as_str()) {
            (_, "minFrequencyMHz" | "maxFrequencyMHz") => {}
            (ConditionType::SignalDetection, "signalType") => {}
            (ConditionType::SpectralEnergy, "threshold_dBm") => {}
            (_, other) => return Err(DomainError::UnknownParameter(other.to_string())),
        }
    }

    params
        .entry("minFrequencyMHz".to_string())
        .or_insert_with(|| Value::from(MIN_FREQUENCY_MHZ));
    params
        .entry("maxFrequencyMHz".to_string())
        .or_insert_with(|| Value::from(MAX_FREQUENCY_MHZ));

    let min = frequency(&params, "minFrequencyMHz")?;
    let max = frequency(&params, "maxFrequencyMHz")?;
    if min >= max {
        return Err(DomainError::InvertedFrequencyRange);
    }

    match condition_type {
        ConditionType::SignalDetection => {
            let raw_signal = params
                .get("signalType")
                .and_then(Value::as_str)
                .ok_or(DomainError::MissingParameter("signalType"))?;
            SignalType::parse(raw_signal)?;
        }
        ConditionType::SpectralEnergy => {
            let threshold = params
                .get("threshold_dBm")
                .ok_or(DomainError::MissingParameter("threshold_dBm"))?
                .as_f64()
                .ok_or(DomainError::ThresholdOutOfRange)?;
            if !(MIN_THRESHOLD_DBM..=MAX_THRESHOLD_DBM).contains(&threshold) {
                return Err(DomainError::ThresholdOutOfRange);
            }
        }
    }

    Ok(Value::Object(params))
}

/// Validates the provided fields of a partial condition-parameter update.
///
/// Each present key is checked in isolation; no defaults are filled and no
/// cross-field check is applied, since the unchanged half of a frequency
/// range lives in the store.
pub fn validate_condition_patch_params(raw: &Value) -> Result<Value, DomainError> {
    let params = as_object(raw, "parameters")?;

    for (key, value) in &params {
        match key.as_str() {
            "minFrequencyMHz" => in_frequency_range(value, "minFrequencyMHz")?,
            "maxFrequencyMHz" => in_frequency_range(value, "maxFrequencyMHz")?,
            "signalType" => {
                let raw_signal = value.as_str().ok_or_else(|| DomainError::InvalidParameter {
                    name: "signalType".to_string(),
                    reason: "expected a string".to_string(),
                })?;
                SignalType::parse(raw_signal)?;
            }
            "threshold_dBm" => {
                let threshold = value.as_f64().ok_or(DomainError::ThresholdOutOfRange)?;
                if !(MIN_THRESHOLD_DBM..=MAX_THRESHOLD_DBM).contains(&threshold) {
                    return Err(DomainError::ThresholdOutOfRange);
                }
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

fn frequency(params: &Map<String, Value>, field: &'static str) -> Result<f64, DomainError> {
    let value = params
        .get(field)
        .and_then(Value::as_f64)
        .ok_or(DomainError::FrequencyOutOfRange { field })?;
    if !(MIN_FREQUENCY_MHZ..=MAX_FREQUENCY_MHZ).contains(&value) {
        return Err(DomainError::FrequencyOutOfRange { field });
    }
    Ok(value)
}

fn in_frequency_range(value: &Value, field: &'static str) -> Result<(), DomainError> {
    let value = value.as_f64().ok_or(DomainError::FrequencyOutOfRange { field })?;
    if !(MIN_FREQUENCY_MHZ..=MAX_FREQUENCY_MHZ).contains(&value) {
        return Err(DomainError::FrequencyOutOfRange { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        validate_condition_params, validate_condition_patch_params, ConditionType, SignalType,
    };
    use crate::errors::DomainError;

    #[test]
    fn signal_detection_params_fill_frequency_defaults() {
        let normalized = validate_condition_params(
            ConditionType::SignalDetection,
            &json!({"signalType": "5G"}),
        )
        .expect("valid params");

        assert_eq!(normalized["minFrequencyMHz"], json!(10.0));
        assert_eq!(normalized["maxFrequencyMHz"], json!(6000.0));
        assert_eq!(normalized["signalType"], json!("5G"));
    }

    #[test]
    fn validation_is_idempotent_for_sparse_input() {
        let raw = json!({"signalType": "LTE", "minFrequencyMHz": 1800});
        let first = validate_condition_params(ConditionType::SignalDetection, &raw).unwrap();
        let second = validate_condition_params(ConditionType::SignalDetection, &raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn inverted_frequency_range_is_rejected() {
        let err = validate_condition_params(
            ConditionType::SignalDetection,
            &json!({"signalType": "CW", "minFrequencyMHz": 2400, "maxFrequencyMHz": 2000}),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::InvertedFrequencyRange);
    }

    #[test]
    fn spectral_energy_requires_threshold() {
        let err =
            validate_condition_params(ConditionType::SpectralEnergy, &json!({})).unwrap_err();
        assert_eq!(err, DomainError::MissingParameter("threshold_dBm"));
    }

    #[test]
    fn out_of_band_threshold_is_rejected() {
        let err = validate_condition_params(
            ConditionType::SpectralEnergy,
            &json!({"threshold_dBm": 400}),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::ThresholdOutOfRange);
    }

    #[test]
    fn unknown_parameter_keys_are_rejected() {
        let err = validate_condition_params(
            ConditionType::SignalDetection,
            &json!({"signalType": "5G", "bandwidth": 20}),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::UnknownParameter("bandwidth".to_string()));
    }

    #[test]
    fn patch_validates_only_provided_fields() {
        let normalized =
            validate_condition_patch_params(&json!({"minFrequencyMHz": 3500})).unwrap();
        assert_eq!(normalized, json!({"minFrequencyMHz": 3500}));

        let err = validate_condition_patch_params(&json!({"signalType": "6G"})).unwrap_err();
        assert_eq!(err, DomainError::UnknownSignalType("6G".to_string()));
    }

    #[test]
    fn signal_type_round_trips_through_wire_names() {
        for raw in ["Energy", "5G", "LTE", "QPSK", "CW", "PCMPM", "CPM", "CPMFM", "BPSK", "SOQPSK"]
        {
            let parsed = SignalType::parse(raw).expect("known signal type");
            assert_eq!(serde_json::to_value(parsed).unwrap(), serde_json::json!(raw));
        }
    }
}
