//! Confidence-weighted consensus over independent judgments.
//!
//! A pure fold: every call is reproducible from the judgment set alone.
//! The engine tolerates any number of judgments from zero (no opinion)
//! up; a failed source simply does not vote.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{JudgmentRecord, Likelihood, RecommendedAction};

const TOP_MENTIONS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MentionCount {
    pub item: String,
    pub mentioned_by: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsensusReport {
    pub manipulation_likelihood: Likelihood,
    pub confidence_score: f64,
    pub agreement_level: f64,
    pub recommended_action: RecommendedAction,
    pub action_score: f64,
    pub responses_received: usize,
    pub top_concerns: Vec<MentionCount>,
    pub top_risk_factors: Vec<MentionCount>,
    pub summary: String,
}

/// Terminal "no opinion" vs a full report. Serialized with an explicit
/// `available` flag so downstream consumers can branch without knowing
/// the enum shape.
#[derive(Debug, Clone)]
pub enum ConsensusOutcome {
    Unavailable { reason: String },
    Available(ConsensusReport),
}

impl Serialize for ConsensusOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            ConsensusOutcome::Unavailable { reason } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("available", &false)?;
                map.serialize_entry("reason", reason)?;
                map.end()
            }
            ConsensusOutcome::Available(report) => {
                #[derive(Serialize)]
                struct Tagged<'a> {
                    available: bool,
                    #[serde(flatten)]
                    report: &'a ConsensusReport,
                }
                Tagged {
                    available: true,
                    report,
                }
                .serialize(serializer)
            }
        }
    }
}

fn likelihood_score(likelihood: Likelihood) -> f64 {
    match likelihood {
        Likelihood::High => 1.0,
        Likelihood::Medium => 0.6,
        Likelihood::Low => 0.3,
        Likelihood::None => 0.0,
    }
}

fn action_score(action: RecommendedAction) -> f64 {
    match action {
        RecommendedAction::Avoid => 1.0,
        RecommendedAction::Caution => 0.7,
        RecommendedAction::Monitor => 0.4,
        RecommendedAction::Safe => 0.0,
    }
}

fn likelihood_bucket(score: f64) -> Likelihood {
    if score >= 0.8 {
        Likelihood::High
    } else if score >= 0.5 {
        Likelihood::Medium
    } else if score >= 0.2 {
        Likelihood::Low
    } else {
        Likelihood::None
    }
}

fn action_bucket(score: f64) -> RecommendedAction {
    if score >= 0.8 {
        RecommendedAction::Avoid
    } else if score >= 0.5 {
        RecommendedAction::Caution
    } else if score >= 0.2 {
        RecommendedAction::Monitor
    } else {
        RecommendedAction::Safe
    }
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn weighted_average(scores: &[f64], weights: &[f64]) -> f64 {
    let weight_total: f64 = weights.iter().sum();
    if weight_total > 0.0 {
        scores
            .iter()
            .zip(weights)
            .map(|(s, w)| s * w)
            .sum::<f64>()
            / weight_total
    } else {
        // Every vote carried zero confidence; degrade to the plain mean
        // rather than dividing by zero.
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Exact-string frequency count, top entries first. Ties break
/// lexicographically so the output is deterministic. Near-duplicate
/// phrasings from different sources are intentionally not merged.
fn top_mentions<'a, I>(items: I) -> Vec<MentionCount>
where
    I: Iterator<Item = &'a String>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_MENTIONS)
        .map(|(item, mentioned_by)| MentionCount {
            item: item.to_string(),
            mentioned_by,
        })
        .collect()
}

/// Fold 0..N judgments into a single consensus decision.
pub fn compute_consensus(judgments: &[JudgmentRecord]) -> ConsensusOutcome {
    if judgments.is_empty() {
        return ConsensusOutcome::Unavailable {
            reason: "no valid judgments received".into(),
        };
    }

    let likelihood_scores: Vec<f64> = judgments
        .iter()
        .map(|j| likelihood_score(j.manipulation_likelihood))
        .collect();
    let action_scores: Vec<f64> = judgments
        .iter()
        .map(|j| action_score(j.recommended_action))
        .collect();
    let confidences: Vec<f64> = judgments.iter().map(|j| j.confidence).collect();

    let weighted_likelihood = weighted_average(&likelihood_scores, &confidences);
    let weighted_action = weighted_average(&action_scores, &confidences);

    let consensus_likelihood = likelihood_bucket(weighted_likelihood);
    let consensus_action = action_bucket(weighted_action);

    // Agreement is measured on the likelihood spread, deliberately even
    // when the action consensus is what gets reported: it tracks how
    // tightly the panel agrees on severity, independent of the weighting.
    let agreement_level = (1.0 - 2.0 * population_variance(&likelihood_scores)).max(0.0);

    let summary = render_summary(
        consensus_likelihood,
        consensus_action,
        agreement_level,
        judgments.len(),
    );

    ConsensusOutcome::Available(ConsensusReport {
        manipulation_likelihood: consensus_likelihood,
        confidence_score: weighted_likelihood,
        agreement_level,
        recommended_action: consensus_action,
        action_score: weighted_action,
        responses_received: judgments.len(),
        top_concerns: top_mentions(judgments.iter().flat_map(|j| j.key_concerns.iter())),
        top_risk_factors: top_mentions(judgments.iter().flat_map(|j| j.risk_factors.iter())),
        summary,
    })
}

fn render_summary(
    likelihood: Likelihood,
    action: RecommendedAction,
    agreement: f64,
    source_count: usize,
) -> String {
    let agreement_text = if agreement > 0.8 {
        "strong agreement"
    } else if agreement > 0.5 {
        "moderate agreement"
    } else {
        "divided opinions"
    };

    let likelihood_text = match likelihood {
        Likelihood::High => "high likelihood of manipulation",
        Likelihood::Medium => "moderate likelihood of manipulation",
        Likelihood::Low => "low likelihood of manipulation",
        Likelihood::None => "no signs of manipulation",
    };

    let action_text = match action {
        RecommendedAction::Avoid => "avoiding the name is recommended",
        RecommendedAction::Caution => "caution is warranted",
        RecommendedAction::Monitor => "continued monitoring is recommended",
        RecommendedAction::Safe => "the name currently looks safe",
    };

    format!(
        "Verdict from {} independent sources: {}. With {}, {}.",
        source_count, likelihood_text, agreement_text, action_text
    )
}
