use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    High,
    Medium,
    Low,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    Avoid,
    Caution,
    Monitor,
    Safe,
}

/// A raw reply from one judgment source, before any validation. Sources
/// may hand back a parsed JSON document or free text with a JSON block
/// buried in prose; both shapes go through the same parse step.
#[derive(Debug, Clone)]
pub enum RawJudgment {
    Structured(serde_json::Value),
    FreeText(String),
}

/// One validated judgment. `confidence` is always finite and in [0, 1]
/// after parsing; replies that cannot be validated are rejected outright
/// rather than defaulted into a vote.
#[derive(Debug, Clone, Serialize)]
pub struct JudgmentRecord {
    pub provider: String,
    pub manipulation_likelihood: Likelihood,
    pub confidence: f64,
    pub reasoning: String,
    pub key_concerns: Vec<String>,
    pub recommended_action: RecommendedAction,
    pub risk_factors: Vec<String>,
    /// Raw trade-style action (e.g. "BUY") when the source replied in the
    /// older recommendation format instead of a likelihood.
    pub action: Option<String>,
}

/// The reply shape requested from judgment sources. The prompt builder
/// embeds this schema so sources know exactly what to emit; the parser
/// stays defensive regardless.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JudgmentReply {
    pub manipulation_likelihood: Likelihood,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub key_concerns: Vec<String>,
    pub recommended_action: RecommendedAction,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON block found in reply")]
    NoJsonFound,
    #[error("reply JSON is invalid: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("reply lacks a decision field (manipulation_likelihood or action)")]
    MissingDecisionField,
}
