use thiserror::Error;

/// Validation failures for rule, condition, and action inputs.
///
/// These are pure data errors: they are produced by validators that never
/// touch the store, and they double as the constraint-violation payloads the
/// store reports when a write is rejected.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("rule name cannot be empty")]
    EmptyRuleName,
    #[error("start_time must be before end_time")]
    InvalidTimeWindow,
    #[error("invalid datetime format: `{0}`")]
    InvalidDatetime(String),
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("{field} must be a number between 10 and 6000 MHz")]
    FrequencyOutOfRange { field: &'static str },
    #[error("minFrequencyMHz must be less than maxFrequencyMHz")]
    InvertedFrequencyRange,
    #[error("threshold_dBm must be a number between -150 and 150")]
    ThresholdOutOfRange,
    #[error(
        "invalid signalType `{0}`; expected one of: Energy, 5G, LTE, QPSK, CW, PCMPM, CPM, CPMFM, BPSK, SOQPSK"
    )]
    UnknownSignalType(String),
    #[error("invalid conditionType `{0}`; expected signalDetection or spectralEnergy")]
    UnknownConditionType(String),
    #[error(
        "invalid actionType `{0}`; expected frequencyScanRequest, geolocationRequest, or userNotification"
    )]
    UnknownActionType(String),
    #[error("invalid algorithm `{0}`; expected TDOA or PDOA")]
    UnknownAlgorithm(String),
    #[error("sensorIds must be a non-empty list of sensor ids")]
    EmptySensorList,
    #[error("geolocationRequest requires at least {required} sensors")]
    NotEnoughSensors { required: usize },
    #[error("notification message cannot be empty")]
    EmptyNotificationMessage,
    #[error("parameter {name} is invalid: {reason}")]
    InvalidParameter { name: String, reason: String },
}
