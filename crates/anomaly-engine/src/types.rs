use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price/volume bar. Series handed to the detectors are ordered
/// chronologically (oldest first); callers own that contract, the
/// detectors never re-sort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    VolumeSpike,
    ClosingVolumeConcentration,
    ExtremeShortRatio,
    ShortInterestSurge,
    SustainedShortPressure,
    HighDarkPoolActivity,
    ElevatedDarkPoolActivity,
}

/// A single anomaly finding. Produced by exactly one detector call and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub severity: Severity,
    pub description: String,
    pub value: f64,
    pub threshold: f64,
}

/// Caller-contract violations. Insufficient data for a pattern search is
/// NOT one of these; pattern detectors report a negative result instead.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("historical volume window is empty")]
    EmptyWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}
