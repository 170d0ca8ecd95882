//! Manipulation-analysis prompt rendering.
//!
//! Turns the deterministic findings into the structured context handed
//! to every judgment source, with the expected reply schema embedded so
//! sources know exactly what to emit.

use anomaly_engine::{
    PatternAssessment, ShortAnomalyReport, ShortTrend, Signal, VolumeAnomalyReport,
};
use chrono::Utc;
use consensus_engine::JudgmentReply;

pub struct PromptContext<'a> {
    pub symbol: &'a str,
    pub signals: &'a [Signal],
    pub volume: &'a VolumeAnomalyReport,
    pub patterns: &'a PatternAssessment,
    pub shorts: &'a ShortAnomalyReport,
    pub short_trend: &'a ShortTrend,
    pub dark_pool_pct: Option<f64>,
    pub current_price: Option<f64>,
    pub intraday_points: usize,
}

pub fn build_manipulation_prompt(ctx: &PromptContext) -> String {
    let schema = schemars::schema_for!(JudgmentReply);
    let schema_json =
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());

    let mut signal_lines = String::new();
    for (i, signal) in ctx.signals.iter().enumerate() {
        signal_lines.push_str(&format!(
            "{}. [{:?}] {:?}: {}\n",
            i + 1,
            signal.severity,
            signal.signal_type,
            signal.description
        ));
    }
    if ctx.signals.is_empty() {
        signal_lines.push_str("(none)\n");
    }

    let pattern_details = if ctx.patterns.manipulation_detected {
        let mut parts = Vec::new();
        let p = &ctx.patterns.patterns;
        if p.closing_manipulation.detected {
            parts.push(format!(
                "closing_manipulation (confidence {:.2})",
                p.closing_manipulation.confidence
            ));
        }
        if p.painting_the_tape.detected {
            parts.push(format!(
                "painting_the_tape (confidence {:.2})",
                p.painting_the_tape.confidence
            ));
        }
        if p.wash_trading.detected {
            parts.push(format!(
                "wash_trading (confidence {:.2})",
                p.wash_trading.confidence
            ));
        }
        format!("- Details: {}\n", parts.join(", "))
    } else {
        String::new()
    };

    format!(
        r#"You are an expert in detecting institutional stock-price manipulation.

Analyze the data below and assess the likelihood of manipulation.

[Symbol] {symbol}
[As of] {as_of}

[Detected signals] ({signal_count})
{signal_lines}
[Volume]
- Session volume: {current_volume:.0}
- Trailing average: {avg_volume:.0}
- Volume ratio: {volume_ratio:.2}x
- Anomaly detected: {volume_detected}
- Anomaly score: {anomaly_score:.2}

[Price patterns]
- Manipulation detected: {patterns_detected_flag}
- Pattern score: {pattern_score:.2}
- Patterns detected: {patterns_count}
{pattern_details}
[Short interest]
- Latest short ratio: {latest_short:.1}%
- Trend: {short_trend:?}
- Average ratio: {avg_short:.1}%
- Change: {short_change:.1}%

[Dark pool]
- Dark-pool share of volume: {dark_pool}

[Market data]
- Current price: {price}
- Intraday data points: {intraday_points}

Reply with strictly valid JSON conforming to this schema, and nothing else:

{schema_json}
"#,
        symbol = ctx.symbol,
        as_of = Utc::now().to_rfc3339(),
        signal_count = ctx.signals.len(),
        signal_lines = signal_lines,
        current_volume = ctx.volume.metrics.current_volume,
        avg_volume = ctx.volume.metrics.avg_volume,
        volume_ratio = ctx.volume.metrics.volume_ratio,
        volume_detected = if ctx.volume.anomaly_detected { "YES" } else { "NO" },
        anomaly_score = ctx.volume.anomaly_score,
        patterns_detected_flag =
            if ctx.patterns.manipulation_detected { "YES" } else { "NO" },
        pattern_score = ctx.patterns.manipulation_score,
        patterns_count = ctx.patterns.patterns_detected,
        pattern_details = pattern_details,
        latest_short = ctx.shorts.latest_ratio,
        short_trend = ctx.short_trend.trend,
        avg_short = ctx.short_trend.avg_ratio,
        short_change = ctx.short_trend.change_pct,
        dark_pool = ctx
            .dark_pool_pct
            .map(|p| format!("{:.1}%", p))
            .unwrap_or_else(|| "unavailable".into()),
        price = ctx
            .current_price
            .map(|p| format!("${:.2}", p))
            .unwrap_or_else(|| "unavailable".into()),
        intraday_points = ctx.intraday_points,
        schema_json = schema_json,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_engine::{analyze_manipulation_patterns, analyze_short_trend, detect_short_anomalies};

    #[test]
    fn test_prompt_contains_schema_and_context() {
        let volume = VolumeAnomalyReport {
            anomaly_detected: true,
            anomaly_score: 0.25,
            signals: Vec::new(),
            metrics: anomaly_engine::VolumeMetrics {
                avg_volume: 10_000_000.0,
                current_volume: 35_000_000.0,
                volume_ratio: 3.5,
                closing_volume_ratio: 0.1,
            },
        };
        let patterns = analyze_manipulation_patterns(&[], 15);
        let shorts = detect_short_anomalies(&[55.0, 40.0]);
        let short_trend = analyze_short_trend(&[55.0, 40.0]);

        let prompt = build_manipulation_prompt(&PromptContext {
            symbol: "ACME",
            signals: &[],
            volume: &volume,
            patterns: &patterns,
            shorts: &shorts,
            short_trend: &short_trend,
            dark_pool_pct: Some(48.0),
            current_price: Some(12.34),
            intraday_points: 390,
        });

        assert!(prompt.contains("ACME"));
        assert!(prompt.contains("3.50x"));
        assert!(prompt.contains("48.0%"));
        assert!(prompt.contains("manipulation_likelihood"));
        assert!(prompt.contains("recommended_action"));
    }
}
