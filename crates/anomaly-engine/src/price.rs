//! Intraday price-pattern detectors.
//!
//! Three pattern searches over minute bars: a late-session price push,
//! runs of small prints meant to paint the tape, and trade clustering at
//! a single price consistent with wash activity. Too few bars for a
//! pattern search is a valid negative result, never an error.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Bar;

/// Bars inspected for a closing push when the caller does not override.
pub const DEFAULT_CLOSING_WINDOW: usize = 15;

const PAINTING_MIN_BARS: usize = 30;
const PAINTING_RUN_THRESHOLD: usize = 10;
const SMALL_PRINT_FRACTION: f64 = 0.2;
const WASH_MIN_BARS: usize = 10;
const WASH_CONCENTRATION_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Serialize)]
pub struct ClosingManipulation {
    pub detected: bool,
    pub confidence: f64,
    pub closing_change: f64,
    pub avg_volatility: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaintingTheTape {
    pub detected: bool,
    pub confidence: f64,
    pub max_consecutive_small_trades: usize,
    pub threshold: usize,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WashTrading {
    pub detected: bool,
    pub confidence: f64,
    pub suspicious_price: Option<f64>,
    pub concentration: f64,
    pub occurrences: usize,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternSet {
    pub closing_manipulation: ClosingManipulation,
    pub painting_the_tape: PaintingTheTape,
    pub wash_trading: WashTrading,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternAssessment {
    pub manipulation_detected: bool,
    pub manipulation_score: f64,
    pub patterns_detected: usize,
    pub patterns: PatternSet,
}

fn negative_closing() -> ClosingManipulation {
    ClosingManipulation {
        detected: false,
        confidence: 0.0,
        closing_change: 0.0,
        avg_volatility: 0.0,
        description: "Insufficient intraday data".into(),
    }
}

/// Compare the price move over the final `window_minutes` bars against the
/// average per-bar move of everything before the window. A closing move
/// larger than 3x the prior volatility is flagged.
pub fn detect_closing_manipulation(intraday: &[Bar], window_minutes: usize) -> ClosingManipulation {
    if window_minutes == 0 || intraday.len() < window_minutes {
        return negative_closing();
    }

    let split = intraday.len() - window_minutes;
    let last_window = &intraday[split..];
    let before_window = &intraday[..split];

    let window_open = last_window[0].close;
    if window_open == 0.0 {
        return negative_closing();
    }
    let closing_change =
        (last_window[last_window.len() - 1].close - window_open) / window_open;

    let avg_volatility = average_volatility(before_window);
    let anomaly_threshold = avg_volatility * 3.0;

    let detected = closing_change.abs() > anomaly_threshold;
    let confidence = if anomaly_threshold > 0.0 {
        (closing_change.abs() / anomaly_threshold).min(1.0)
    } else if detected {
        // Flat session before the window: any closing move stands out.
        1.0
    } else {
        0.0
    };

    let description = if detected {
        format!(
            "Abnormal {:.2}% move in the final {} bars",
            closing_change * 100.0,
            window_minutes
        )
    } else {
        "Normal closing activity".into()
    };

    ClosingManipulation {
        detected,
        confidence,
        closing_change,
        avg_volatility,
        description,
    }
}

/// Longest run of consecutive bars whose volume is below 20% of the
/// series mean. Ten or more small prints in a row is flagged.
pub fn detect_painting_the_tape(intraday: &[Bar]) -> PaintingTheTape {
    if intraday.len() < PAINTING_MIN_BARS {
        return PaintingTheTape {
            detected: false,
            confidence: 0.0,
            max_consecutive_small_trades: 0,
            threshold: PAINTING_RUN_THRESHOLD,
            description: "Insufficient intraday data".into(),
        };
    }

    let avg_volume: f64 =
        intraday.iter().map(|b| b.volume).sum::<f64>() / intraday.len() as f64;
    let small_threshold = avg_volume * SMALL_PRINT_FRACTION;

    let mut run = 0usize;
    let mut max_run = 0usize;
    for bar in intraday {
        if bar.volume < small_threshold {
            run += 1;
            max_run = max_run.max(run);
        } else {
            run = 0;
        }
    }

    let detected = max_run >= PAINTING_RUN_THRESHOLD;
    PaintingTheTape {
        detected,
        confidence: (max_run as f64 / 20.0).min(1.0),
        max_consecutive_small_trades: max_run,
        threshold: PAINTING_RUN_THRESHOLD,
        description: if detected {
            format!("{} consecutive small prints detected", max_run)
        } else {
            "Normal trading pattern".into()
        },
    }
}

/// Bucket bars by close price rounded to cents and measure how much of
/// the session clusters at the single busiest price.
pub fn detect_wash_trading(intraday: &[Bar]) -> WashTrading {
    if intraday.len() < WASH_MIN_BARS {
        return WashTrading {
            detected: false,
            confidence: 0.0,
            suspicious_price: None,
            concentration: 0.0,
            occurrences: 0,
            description: "Insufficient intraday data".into(),
        };
    }

    // BTreeMap keeps the max-bucket choice deterministic on count ties.
    let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
    for bar in intraday {
        *buckets.entry((bar.close * 100.0).round() as i64).or_insert(0) += 1;
    }

    let (price_key, occurrences) = buckets
        .iter()
        .max_by(|a, b| a.1.cmp(b.1))
        .map(|(k, v)| (*k, *v))
        .unwrap_or((0, 0));

    let concentration = occurrences as f64 / intraday.len() as f64;
    let detected = concentration > WASH_CONCENTRATION_THRESHOLD;
    let suspicious_price = price_key as f64 / 100.0;

    WashTrading {
        detected,
        confidence: concentration.min(1.0),
        suspicious_price: Some(suspicious_price),
        concentration,
        occurrences,
        description: if detected {
            format!(
                "{} bars ({:.1}%) clustered at {:.2}",
                occurrences,
                concentration * 100.0,
                suspicious_price
            )
        } else {
            "Normal price distribution".into()
        },
    }
}

/// Run all three pattern searches and fold them into one assessment.
/// The score is the mean confidence over detected patterns only; patterns
/// that did not fire contribute no weight.
pub fn analyze_manipulation_patterns(
    intraday: &[Bar],
    window_minutes: usize,
) -> PatternAssessment {
    let patterns = PatternSet {
        closing_manipulation: detect_closing_manipulation(intraday, window_minutes),
        painting_the_tape: detect_painting_the_tape(intraday),
        wash_trading: detect_wash_trading(intraday),
    };

    let detected_confidences: Vec<f64> = [
        (patterns.closing_manipulation.detected, patterns.closing_manipulation.confidence),
        (patterns.painting_the_tape.detected, patterns.painting_the_tape.confidence),
        (patterns.wash_trading.detected, patterns.wash_trading.confidence),
    ]
    .iter()
    .filter(|(detected, _)| *detected)
    .map(|(_, confidence)| *confidence)
    .collect();

    let patterns_detected = detected_confidences.len();
    let manipulation_score = if patterns_detected > 0 {
        detected_confidences.iter().sum::<f64>() / patterns_detected as f64
    } else {
        0.0
    };

    PatternAssessment {
        manipulation_detected: patterns_detected > 0,
        manipulation_score,
        patterns_detected,
        patterns,
    }
}

fn average_volatility(bars: &[Bar]) -> f64 {
    if bars.len() < 2 {
        return 0.0;
    }

    let mut total_change = 0.0;
    for pair in bars.windows(2) {
        let prev = pair[0].close;
        if prev != 0.0 {
            total_change += ((pair[1].close - prev) / prev).abs();
        }
    }

    total_change / (bars.len() - 1) as f64
}
