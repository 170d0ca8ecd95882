//! Signal aggregation.
//!
//! Merges per-detector outputs into one signal list and one weighted
//! manipulation score. Detector categories that produced no detection
//! contribute neither score nor weight, so the denominator shrinks
//! instead of diluting the result with zeros.

use serde::Serialize;

use crate::types::{Severity, Signal};

const VOLUME_WEIGHT: f64 = 0.25;
const PRICE_PATTERN_WEIGHT: f64 = 0.35;
const SHORT_INTEREST_WEIGHT: f64 = 0.20;
const DARK_POOL_WEIGHT: f64 = 0.20;

/// Per-category confidences; `None` means the category had no detection
/// this round and is excluded from the weighted combination entirely.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CategoryScores {
    pub volume: Option<f64>,
    pub price_pattern: Option<f64>,
    pub short_interest: Option<f64>,
    pub dark_pool: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalSummary {
    pub signals: Vec<Signal>,
    pub high_count: usize,
    pub medium_count: usize,
}

/// Weighted manipulation score in [0, 1] across detector categories.
pub fn weighted_manipulation_score(scores: &CategoryScores) -> f64 {
    let parts = [
        (scores.volume, VOLUME_WEIGHT),
        (scores.price_pattern, PRICE_PATTERN_WEIGHT),
        (scores.short_interest, SHORT_INTEREST_WEIGHT),
        (scores.dark_pool, DARK_POOL_WEIGHT),
    ];

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (score, weight) in parts {
        if let Some(score) = score {
            weighted_sum += score * weight;
            weight_total += weight;
        }
    }

    if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Category confidence for signal-list detectors (short interest, dark
/// pool) that report findings rather than a numeric score: any high
/// severity signal pins the category at 0.8, medium-only at 0.5.
pub fn severity_confidence(signals: &[Signal]) -> Option<f64> {
    if signals.is_empty() {
        return None;
    }
    if signals.iter().any(|s| s.severity == Severity::High) {
        Some(0.8)
    } else {
        Some(0.5)
    }
}

/// Merge detector signal lists into one summary, preserving order.
pub fn collect_signals(batches: Vec<Vec<Signal>>) -> SignalSummary {
    let signals: Vec<Signal> = batches.into_iter().flatten().collect();
    let high_count = signals.iter().filter(|s| s.severity == Severity::High).count();
    let medium_count = signals.len() - high_count;

    SignalSummary {
        signals,
        high_count,
        medium_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalType;

    fn signal(severity: Severity) -> Signal {
        Signal {
            signal_type: SignalType::VolumeSpike,
            severity,
            description: "test".into(),
            value: 4.0,
            threshold: 3.0,
        }
    }

    #[test]
    fn test_weighted_score_all_categories() {
        let scores = CategoryScores {
            volume: Some(0.4),
            price_pattern: Some(0.8),
            short_interest: Some(0.5),
            dark_pool: Some(0.5),
        };
        // (0.4*0.25 + 0.8*0.35 + 0.5*0.2 + 0.5*0.2) / 1.0 = 0.58
        assert!((weighted_manipulation_score(&scores) - 0.58).abs() < 1e-9);
    }

    #[test]
    fn test_denominator_shrinks_with_absent_categories() {
        let scores = CategoryScores {
            volume: None,
            price_pattern: Some(0.8),
            short_interest: None,
            dark_pool: None,
        };
        // Only price pattern present: 0.8*0.35 / 0.35 = 0.8, not diluted.
        assert!((weighted_manipulation_score(&scores) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_no_detections_scores_zero() {
        assert_eq!(weighted_manipulation_score(&CategoryScores::default()), 0.0);
    }

    #[test]
    fn test_severity_confidence_mapping() {
        assert_eq!(severity_confidence(&[]), None);
        assert_eq!(severity_confidence(&[signal(Severity::Medium)]), Some(0.5));
        assert_eq!(
            severity_confidence(&[signal(Severity::Medium), signal(Severity::High)]),
            Some(0.8)
        );
    }

    #[test]
    fn test_collect_signals_counts() {
        let summary = collect_signals(vec![
            vec![signal(Severity::High), signal(Severity::Medium)],
            vec![signal(Severity::Medium)],
        ]);
        assert_eq!(summary.signals.len(), 3);
        assert_eq!(summary.high_count, 1);
        assert_eq!(summary.medium_count, 2);
    }
}
