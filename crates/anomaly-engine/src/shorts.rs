//! Short-interest anomaly detection.
//!
//! Operates on a series of daily short-volume ratios (percent of total
//! volume sold short), ordered most-recent-first as the reporting feed
//! delivers them.

use serde::Serialize;

use crate::types::{Severity, Signal, SignalType, TrendDirection};

const EXTREME_RATIO_THRESHOLD: f64 = 50.0;
const SURGE_CHANGE_THRESHOLD: f64 = 100.0;
const SUSTAINED_RATIO_THRESHOLD: f64 = 40.0;
const SUSTAINED_MIN_DAYS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ShortAnomalyReport {
    pub detected: bool,
    pub signals: Vec<Signal>,
    pub latest_ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShortTrend {
    pub trend: TrendDirection,
    pub avg_ratio: f64,
    pub latest_ratio: f64,
    pub change_pct: f64,
    pub alert: bool,
}

/// Scan the short-ratio series for anomalies. An empty series is a
/// well-formed "nothing found", not an error.
pub fn detect_short_anomalies(ratios: &[f64]) -> ShortAnomalyReport {
    let Some(&latest_ratio) = ratios.first() else {
        return ShortAnomalyReport {
            detected: false,
            signals: Vec::new(),
            latest_ratio: 0.0,
        };
    };

    let mut signals = Vec::new();

    if latest_ratio > EXTREME_RATIO_THRESHOLD {
        signals.push(Signal {
            signal_type: SignalType::ExtremeShortRatio,
            severity: Severity::High,
            description: format!("Short ratio at an extreme {:.1}%", latest_ratio),
            value: latest_ratio,
            threshold: EXTREME_RATIO_THRESHOLD,
        });
    }

    if ratios.len() >= 2 {
        let previous = ratios[1];
        if previous > 0.0 {
            let change = (latest_ratio - previous) / previous * 100.0;
            if change > SURGE_CHANGE_THRESHOLD {
                signals.push(Signal {
                    signal_type: SignalType::ShortInterestSurge,
                    severity: Severity::High,
                    description: format!("Short ratio surged {:.0}% day over day", change),
                    value: change,
                    threshold: SURGE_CHANGE_THRESHOLD,
                });
            }
        }
    }

    let high_ratio_days = ratios
        .iter()
        .filter(|&&r| r > SUSTAINED_RATIO_THRESHOLD)
        .count();
    if high_ratio_days >= SUSTAINED_MIN_DAYS {
        signals.push(Signal {
            signal_type: SignalType::SustainedShortPressure,
            severity: Severity::Medium,
            description: format!(
                "Short ratio above {:.0}% on {} recent sessions",
                SUSTAINED_RATIO_THRESHOLD, high_ratio_days
            ),
            value: high_ratio_days as f64,
            threshold: SUSTAINED_MIN_DAYS as f64,
        });
    }

    ShortAnomalyReport {
        detected: !signals.is_empty(),
        signals,
        latest_ratio,
    }
}

/// Classify the short-ratio trend over the series: percent change of the
/// latest observation against the oldest, with a ±20% stability band.
pub fn analyze_short_trend(ratios: &[f64]) -> ShortTrend {
    if ratios.len() < 2 {
        return ShortTrend {
            trend: TrendDirection::InsufficientData,
            avg_ratio: 0.0,
            latest_ratio: ratios.first().copied().unwrap_or(0.0),
            change_pct: 0.0,
            alert: false,
        };
    }

    let avg_ratio = ratios.iter().sum::<f64>() / ratios.len() as f64;
    let latest = ratios[0];
    let oldest = ratios[ratios.len() - 1];
    let change_pct = if oldest != 0.0 {
        (latest - oldest) / oldest * 100.0
    } else {
        0.0
    };

    let trend = if change_pct > 20.0 {
        TrendDirection::Increasing
    } else if change_pct < -20.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    ShortTrend {
        trend,
        avg_ratio,
        latest_ratio: latest,
        change_pct,
        alert: latest > SUSTAINED_RATIO_THRESHOLD || change_pct.abs() > 50.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series_is_negative() {
        let report = detect_short_anomalies(&[]);
        assert!(!report.detected);
        assert!(report.signals.is_empty());
    }

    #[test]
    fn test_extreme_ratio_signal() {
        let report = detect_short_anomalies(&[55.0, 30.0, 28.0]);
        assert!(report.detected);
        assert!(report
            .signals
            .iter()
            .any(|s| s.signal_type == SignalType::ExtremeShortRatio
                && s.severity == Severity::High));
    }

    #[test]
    fn test_surge_signal_on_day_over_day_doubling() {
        // 10% -> 25% overnight: +150% change.
        let report = detect_short_anomalies(&[25.0, 10.0]);
        let surge = report
            .signals
            .iter()
            .find(|s| s.signal_type == SignalType::ShortInterestSurge)
            .expect("surge should fire");
        assert!((surge.value - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_sustained_pressure_needs_three_high_days() {
        let report = detect_short_anomalies(&[45.0, 42.0, 30.0, 41.0, 20.0]);
        assert!(report
            .signals
            .iter()
            .any(|s| s.signal_type == SignalType::SustainedShortPressure
                && s.severity == Severity::Medium));

        let report = detect_short_anomalies(&[45.0, 42.0, 30.0, 20.0]);
        assert!(!report
            .signals
            .iter()
            .any(|s| s.signal_type == SignalType::SustainedShortPressure));
    }

    #[test]
    fn test_trend_classification() {
        let trend = analyze_short_trend(&[30.0, 25.0, 22.0, 20.0]);
        assert_eq!(trend.trend, TrendDirection::Increasing);
        assert!((trend.change_pct - 50.0).abs() < 1e-9);

        let trend = analyze_short_trend(&[20.0, 21.0, 19.0, 20.5]);
        assert_eq!(trend.trend, TrendDirection::Stable);
        assert!(!trend.alert);

        let trend = analyze_short_trend(&[42.0]);
        assert_eq!(trend.trend, TrendDirection::InsufficientData);
    }
}
