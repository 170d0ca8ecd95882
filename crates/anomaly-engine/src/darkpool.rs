//! Dark-pool activity detection.
//!
//! Works from the weekly off-exchange percentage-of-volume figures.
//! Series are ordered most-recent-first as the venue feed delivers them.

use serde::Serialize;

use crate::types::{Severity, Signal, SignalType, TrendDirection};

const HIGH_ACTIVITY_THRESHOLD: f64 = 50.0;
const ELEVATED_ACTIVITY_THRESHOLD: f64 = 45.0;
const LOW_ACTIVITY_THRESHOLD: f64 = 25.0;
const TREND_CHANGE_POINTS: f64 = 10.0;

/// Off-exchange share of volume assumed when no venue history exists.
pub const DEFAULT_HISTORICAL_AVERAGE: f64 = 35.0;

#[derive(Debug, Clone, Serialize)]
pub struct DarkPoolAnomalyReport {
    pub detected: bool,
    pub signals: Vec<Signal>,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DarkPoolTrend {
    pub trend: TrendDirection,
    pub avg_percentage: f64,
    pub latest_percentage: f64,
    pub change_points: f64,
    pub alert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DarkPoolLevel {
    ExtremelyHigh,
    Elevated,
    Normal,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct DarkPoolAssessment {
    pub percentage: f64,
    pub historical_average: f64,
    pub deviation: f64,
    pub level: DarkPoolLevel,
    pub alert: bool,
    pub interpretation: String,
}

/// Flag abnormal dark-pool share of total volume. The two thresholds are
/// mutually exclusive: above 50% only the high-severity signal fires.
pub fn detect_dark_pool_anomalies(percentage: f64) -> DarkPoolAnomalyReport {
    let mut signals = Vec::new();

    if percentage > HIGH_ACTIVITY_THRESHOLD {
        signals.push(Signal {
            signal_type: SignalType::HighDarkPoolActivity,
            severity: Severity::High,
            description: format!(
                "Dark pools account for {:.1}% of total volume",
                percentage
            ),
            value: percentage,
            threshold: HIGH_ACTIVITY_THRESHOLD,
        });
    } else if percentage > ELEVATED_ACTIVITY_THRESHOLD {
        signals.push(Signal {
            signal_type: SignalType::ElevatedDarkPoolActivity,
            severity: Severity::Medium,
            description: format!("Dark-pool share elevated at {:.1}%", percentage),
            value: percentage,
            threshold: ELEVATED_ACTIVITY_THRESHOLD,
        });
    }

    DarkPoolAnomalyReport {
        detected: !signals.is_empty(),
        signals,
        percentage,
    }
}

/// Trend over the rolling window: latest minus oldest in percentage
/// points, with a ±10 point stability band.
pub fn analyze_dark_pool_trend(percentages: &[f64]) -> DarkPoolTrend {
    if percentages.len() < 2 {
        return DarkPoolTrend {
            trend: TrendDirection::InsufficientData,
            avg_percentage: 0.0,
            latest_percentage: percentages.first().copied().unwrap_or(0.0),
            change_points: 0.0,
            alert: false,
        };
    }

    let avg_percentage = percentages.iter().sum::<f64>() / percentages.len() as f64;
    let latest = percentages[0];
    let oldest = percentages[percentages.len() - 1];
    let change_points = latest - oldest;

    let trend = if change_points > TREND_CHANGE_POINTS {
        TrendDirection::Increasing
    } else if change_points < -TREND_CHANGE_POINTS {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    DarkPoolTrend {
        trend,
        avg_percentage,
        latest_percentage: latest,
        change_points,
        alert: latest > HIGH_ACTIVITY_THRESHOLD,
    }
}

/// Qualify the current dark-pool share against a historical baseline.
pub fn assess_dark_pool_activity(percentage: f64, historical_average: f64) -> DarkPoolAssessment {
    let deviation = percentage - historical_average;

    let (level, alert) = if percentage > HIGH_ACTIVITY_THRESHOLD {
        (DarkPoolLevel::ExtremelyHigh, true)
    } else if percentage > ELEVATED_ACTIVITY_THRESHOLD {
        (DarkPoolLevel::Elevated, true)
    } else if percentage < LOW_ACTIVITY_THRESHOLD {
        (DarkPoolLevel::Low, false)
    } else {
        (DarkPoolLevel::Normal, false)
    };

    let interpretation = match level {
        DarkPoolLevel::ExtremelyHigh => format!(
            "Dark-pool share of {:.1}% is abnormally high, consistent with heavy block activity",
            percentage
        ),
        DarkPoolLevel::Elevated => format!(
            "Dark-pool share of {:.1}% is elevated, institutional activity is brisk",
            percentage
        ),
        DarkPoolLevel::Normal => format!("Dark-pool share of {:.1}% is within normal range", percentage),
        DarkPoolLevel::Low => format!(
            "Dark-pool share of {:.1}% is low, trading is mostly lit",
            percentage
        ),
    };

    DarkPoolAssessment {
        percentage,
        historical_average,
        deviation,
        level,
        alert,
        interpretation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_activity_signal() {
        let report = detect_dark_pool_anomalies(55.0);
        assert!(report.detected);
        assert_eq!(report.signals.len(), 1);
        assert_eq!(report.signals[0].signal_type, SignalType::HighDarkPoolActivity);
        assert_eq!(report.signals[0].severity, Severity::High);
    }

    #[test]
    fn test_elevated_activity_signal() {
        let report = detect_dark_pool_anomalies(47.0);
        assert_eq!(
            report.signals[0].signal_type,
            SignalType::ElevatedDarkPoolActivity
        );
        assert_eq!(report.signals[0].severity, Severity::Medium);
    }

    #[test]
    fn test_normal_activity_is_quiet() {
        let report = detect_dark_pool_anomalies(38.0);
        assert!(!report.detected);
        assert!(report.signals.is_empty());
    }

    #[test]
    fn test_trend_bands() {
        let trend = analyze_dark_pool_trend(&[48.0, 40.0, 36.0]);
        assert_eq!(trend.trend, TrendDirection::Increasing);
        assert!((trend.change_points - 12.0).abs() < 1e-9);

        let trend = analyze_dark_pool_trend(&[30.0, 36.0, 42.0]);
        assert_eq!(trend.trend, TrendDirection::Decreasing);

        let trend = analyze_dark_pool_trend(&[40.0, 38.0, 35.0]);
        assert_eq!(trend.trend, TrendDirection::Stable);

        let trend = analyze_dark_pool_trend(&[40.0]);
        assert_eq!(trend.trend, TrendDirection::InsufficientData);
    }

    #[test]
    fn test_assessment_levels() {
        assert_eq!(
            assess_dark_pool_activity(52.0, DEFAULT_HISTORICAL_AVERAGE).level,
            DarkPoolLevel::ExtremelyHigh
        );
        assert_eq!(
            assess_dark_pool_activity(46.0, DEFAULT_HISTORICAL_AVERAGE).level,
            DarkPoolLevel::Elevated
        );
        assert_eq!(
            assess_dark_pool_activity(30.0, DEFAULT_HISTORICAL_AVERAGE).level,
            DarkPoolLevel::Normal
        );
        let low = assess_dark_pool_activity(20.0, DEFAULT_HISTORICAL_AVERAGE);
        assert_eq!(low.level, DarkPoolLevel::Low);
        assert!((low.deviation + 15.0).abs() < 1e-9);
        assert!(!low.alert);
    }
}
