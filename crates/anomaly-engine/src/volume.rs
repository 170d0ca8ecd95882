//! Volume anomaly detection.
//!
//! Compares the current session's volume against a trailing daily average
//! and measures how much of the intraday volume piles up just before the
//! close. Both excesses feed a bounded two-bucket anomaly score.

use serde::Serialize;

use crate::types::{Bar, DetectError, Severity, Signal, SignalType, TrendDirection};

/// Current volume above this multiple of the trailing average is a spike.
pub const VOLUME_SPIKE_THRESHOLD: f64 = 3.0;
/// Bars counted as the "closing window" for concentration checks.
pub const CLOSING_WINDOW_BARS: usize = 15;

const CLOSING_CONCENTRATION_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClosingConcentration {
    pub ratio: f64,
    pub closing_volume: f64,
    pub total_volume: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VolumeMetrics {
    pub avg_volume: f64,
    pub current_volume: f64,
    pub volume_ratio: f64,
    pub closing_volume_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeAnomalyReport {
    pub anomaly_detected: bool,
    pub anomaly_score: f64,
    pub signals: Vec<Signal>,
    pub metrics: VolumeMetrics,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VolumePattern {
    pub pattern: TrendDirection,
    pub confidence: f64,
    pub trend: f64,
}

/// Mean volume over the trailing daily window.
///
/// An empty window is a caller-contract violation, not a "nothing found"
/// outcome; the caller is responsible for fetching enough history.
pub fn average_volume(historical: &[Bar]) -> Result<f64, DetectError> {
    if historical.is_empty() {
        return Err(DetectError::EmptyWindow);
    }
    let sum: f64 = historical.iter().map(|b| b.volume).sum();
    Ok(sum / historical.len() as f64)
}

/// Fraction of total intraday volume traded in the last
/// [`CLOSING_WINDOW_BARS`] bars. Zero volume or an empty series yields a
/// zero ratio.
pub fn closing_volume_concentration(intraday: &[Bar]) -> ClosingConcentration {
    let total_volume: f64 = intraday.iter().map(|b| b.volume).sum();
    let start = intraday.len().saturating_sub(CLOSING_WINDOW_BARS);
    let closing_volume: f64 = intraday[start..].iter().map(|b| b.volume).sum();

    let ratio = if total_volume > 0.0 {
        closing_volume / total_volume
    } else {
        0.0
    };

    ClosingConcentration {
        ratio,
        closing_volume,
        total_volume,
    }
}

/// Bounded anomaly score in [0, 1].
///
/// Volume excess and closing concentration each contribute at most 0.5,
/// and only once their own threshold is exceeded. The buckets stay
/// separate so one dominant factor cannot mask the other.
pub fn anomaly_score(volume_ratio: f64, closing_ratio: f64) -> f64 {
    let mut score: f64 = 0.0;

    if volume_ratio >= VOLUME_SPIKE_THRESHOLD {
        score += ((volume_ratio - VOLUME_SPIKE_THRESHOLD) / 7.0).min(0.5);
    }

    if closing_ratio > CLOSING_CONCENTRATION_THRESHOLD {
        score += ((closing_ratio - CLOSING_CONCENTRATION_THRESHOLD) / 0.7).min(0.5);
    }

    score.min(1.0)
}

/// Run the volume anomaly checks for one session.
///
/// `historical` is the trailing daily window used for the average (must be
/// non-empty), `current_volume` the session volume under test, and
/// `intraday` the minute bars for the session when available.
pub fn detect_volume_anomaly(
    historical: &[Bar],
    current_volume: f64,
    intraday: Option<&[Bar]>,
) -> Result<VolumeAnomalyReport, DetectError> {
    let avg_volume = average_volume(historical)?;
    let volume_ratio = current_volume / avg_volume;

    let closing_volume_ratio = match intraday {
        Some(bars) if !bars.is_empty() => closing_volume_concentration(bars).ratio,
        _ => 0.0,
    };

    let mut signals = Vec::new();

    if volume_ratio > VOLUME_SPIKE_THRESHOLD {
        signals.push(Signal {
            signal_type: SignalType::VolumeSpike,
            severity: if volume_ratio > 5.0 {
                Severity::High
            } else {
                Severity::Medium
            },
            description: format!("Volume surged to {:.1}x the trailing average", volume_ratio),
            value: volume_ratio,
            threshold: VOLUME_SPIKE_THRESHOLD,
        });
    }

    if closing_volume_ratio > CLOSING_CONCENTRATION_THRESHOLD {
        signals.push(Signal {
            signal_type: SignalType::ClosingVolumeConcentration,
            severity: if closing_volume_ratio > 0.5 {
                Severity::High
            } else {
                Severity::Medium
            },
            description: format!(
                "{:.0}% of the session's volume concentrated in the last {} bars",
                closing_volume_ratio * 100.0,
                CLOSING_WINDOW_BARS
            ),
            value: closing_volume_ratio,
            threshold: CLOSING_CONCENTRATION_THRESHOLD,
        });
    }

    Ok(VolumeAnomalyReport {
        anomaly_detected: !signals.is_empty(),
        anomaly_score: anomaly_score(volume_ratio, closing_volume_ratio),
        signals,
        metrics: VolumeMetrics {
            avg_volume,
            current_volume,
            volume_ratio,
            closing_volume_ratio,
        },
    })
}

/// Classify the recent volume trend: mean of the last 5 sessions against
/// the mean of everything before them, with a ±50% band for stability.
pub fn analyze_volume_pattern(historical: &[Bar]) -> VolumePattern {
    if historical.len() < 6 {
        return VolumePattern {
            pattern: TrendDirection::InsufficientData,
            confidence: 0.0,
            trend: 0.0,
        };
    }

    let split = historical.len() - 5;
    let older = &historical[..split];
    let recent = &historical[split..];

    let avg_recent: f64 = recent.iter().map(|b| b.volume).sum::<f64>() / recent.len() as f64;
    let avg_older: f64 = older.iter().map(|b| b.volume).sum::<f64>() / older.len() as f64;

    if avg_older <= 0.0 {
        return VolumePattern {
            pattern: TrendDirection::InsufficientData,
            confidence: 0.0,
            trend: 0.0,
        };
    }

    let trend = (avg_recent - avg_older) / avg_older;

    let (pattern, confidence) = if trend > 0.5 {
        (TrendDirection::Increasing, trend.min(1.0))
    } else if trend < -0.5 {
        (TrendDirection::Decreasing, trend.abs().min(1.0))
    } else {
        (TrendDirection::Stable, 1.0 - trend.abs())
    };

    VolumePattern {
        pattern,
        confidence,
        trend,
    }
}
