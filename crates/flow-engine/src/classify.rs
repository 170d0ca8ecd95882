//! Institutional flow classification.
//!
//! Folds whatever summary statistics are available (13F position diffs,
//! dark-pool share, short ratio, volume ratio) into a directional flow
//! estimate and a behavior-pattern label. Every adjustment is additive
//! and gated by its own threshold, so the inputs can arrive in any
//! combination and order.

use serde::Serialize;

use crate::holdings::HoldingsChanges;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Bullish,
    Bearish,
    Mixed,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehaviorPattern {
    AggressiveAccumulation,
    AggressiveDistribution,
    Divergence,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowRisk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowRecommendation {
    Follow,
    Avoid,
    Caution,
    Wait,
}

/// Any subset of inputs may be present; absent inputs simply skip their
/// adjustment.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowInputs<'a> {
    pub holdings: Option<&'a HoldingsChanges>,
    pub dark_pool_pct: Option<f64>,
    pub short_ratio_pct: Option<f64>,
    pub volume_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowEstimate {
    pub direction: FlowDirection,
    pub strength: f64,
    pub signals: Vec<String>,
    pub confidence: f64,
    pub interpretation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehaviorProfile {
    pub pattern: BehaviorPattern,
    pub description: String,
    pub risk: FlowRisk,
    pub recommendation: FlowRecommendation,
}

/// Estimate the institutional flow direction and strength.
pub fn analyze_institutional_flow(inputs: &FlowInputs) -> FlowEstimate {
    let mut direction = FlowDirection::Neutral;
    let mut strength: f64 = 0.0;
    let mut signals = Vec::new();

    if let Some(holdings) = inputs.holdings {
        let increased = holdings.increased_positions.len();
        let decreased = holdings.decreased_positions.len();

        if increased > decreased * 2 {
            direction = FlowDirection::Bullish;
            strength += 0.3;
            signals.push("Institutional position increases dominate".to_string());
        } else if decreased > increased * 2 {
            direction = FlowDirection::Bearish;
            strength += 0.3;
            signals.push("Institutional position decreases dominate".to_string());
        }
    }

    if let Some(dark_pool_pct) = inputs.dark_pool_pct {
        if dark_pool_pct > 45.0 {
            strength += 0.3;
            signals.push(format!("Heavy dark-pool activity ({:.1}%)", dark_pool_pct));
        }
    }

    if let Some(short_ratio) = inputs.short_ratio_pct {
        if short_ratio > 40.0 {
            direction = if direction == FlowDirection::Bullish {
                FlowDirection::Mixed
            } else {
                FlowDirection::Bearish
            };
            strength += 0.2;
            signals.push(format!("High short ratio ({:.1}%)", short_ratio));
        }
    }

    if let Some(volume_ratio) = inputs.volume_ratio {
        if volume_ratio > 2.0 {
            strength += 0.2;
            signals.push(format!("Volume surge ({:.1}x average)", volume_ratio));
        }
    }

    let strength = strength.min(1.0);
    FlowEstimate {
        direction,
        strength,
        signals,
        confidence: flow_confidence(direction, strength),
        interpretation: interpret_flow(direction, strength),
    }
}

fn flow_confidence(direction: FlowDirection, strength: f64) -> f64 {
    match direction {
        FlowDirection::Neutral => 0.3,
        FlowDirection::Mixed => 0.5,
        _ => (0.5 + strength * 0.5).min(0.95),
    }
}

fn strength_label(strength: f64) -> &'static str {
    if strength > 0.7 {
        "Strong"
    } else if strength > 0.4 {
        "Moderate"
    } else {
        "Weak"
    }
}

fn interpret_flow(direction: FlowDirection, strength: f64) -> String {
    match direction {
        FlowDirection::Bullish => format!(
            "{} buying pressure, institutions actively building positions",
            strength_label(strength)
        ),
        FlowDirection::Bearish => format!(
            "{} selling pressure, institutions reducing positions",
            strength_label(strength)
        ),
        FlowDirection::Mixed => format!(
            "{} mixed signals, institutional views are split",
            strength_label(strength)
        ),
        FlowDirection::Neutral => "No clear trend, institutions on the sidelines".to_string(),
    }
}

/// Behavior-pattern decision table on (direction, strength).
pub fn classify_behavior(direction: FlowDirection, strength: f64) -> BehaviorProfile {
    if direction == FlowDirection::Bullish && strength > 0.7 {
        return BehaviorProfile {
            pattern: BehaviorPattern::AggressiveAccumulation,
            description: "Aggressive institutional accumulation".into(),
            risk: FlowRisk::Low,
            recommendation: FlowRecommendation::Follow,
        };
    }

    if direction == FlowDirection::Bearish && strength > 0.7 {
        return BehaviorProfile {
            pattern: BehaviorPattern::AggressiveDistribution,
            description: "Aggressive institutional distribution".into(),
            risk: FlowRisk::High,
            recommendation: FlowRecommendation::Avoid,
        };
    }

    if direction == FlowDirection::Mixed {
        return BehaviorProfile {
            pattern: BehaviorPattern::Divergence,
            description: "Institutional opinion divergence".into(),
            risk: FlowRisk::Medium,
            recommendation: FlowRecommendation::Caution,
        };
    }

    BehaviorProfile {
        pattern: BehaviorPattern::Neutral,
        description: "No clear institutional pattern".into(),
        risk: FlowRisk::Medium,
        recommendation: FlowRecommendation::Wait,
    }
}
