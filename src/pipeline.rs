//! The full analysis pipeline for one symbol.
//!
//! Deterministic detectors run first and always produce a best-effort
//! structured result; the judgment fan-out and consensus ride on top and
//! degrade gracefully when sources fail. Only a caller-contract
//! violation in the detectors (missing required base data) aborts the
//! analysis.

use std::sync::Arc;
use std::time::Duration;

use anomaly_engine::{
    analyze_dark_pool_trend, analyze_manipulation_patterns, analyze_short_trend,
    analyze_volume_pattern, assess_dark_pool_activity, collect_signals, detect_dark_pool_anomalies,
    detect_short_anomalies, detect_volume_anomaly, severity_confidence,
    weighted_manipulation_score, Bar, CategoryScores, DarkPoolAnomalyReport, DarkPoolAssessment,
    DarkPoolTrend, PatternAssessment, ShortAnomalyReport, ShortTrend, SignalSummary,
    VolumeAnomalyReport, VolumePattern,
};
use chrono::{DateTime, Utc};
use consensus_engine::{compute_consensus, ConsensusOutcome};
use flow_engine::{
    analyze_13f_changes, analyze_institutional_flow, classify_behavior, BehaviorProfile,
    FlowEstimate, FlowInputs, Holding, HoldingsChanges,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{AnalysisConfig, JudgmentConfig};
use crate::prompt::{build_manipulation_prompt, PromptContext};
use crate::sources::{gather_judgments, JudgmentSource, SourceFailure};

/// Everything the external collectors hand us for one analysis call.
/// Bar series are chronological (oldest first); ratio series are
/// most-recent-first as the reporting feeds deliver them.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub daily_bars: Vec<Bar>,
    pub current_volume: f64,
    #[serde(default)]
    pub intraday_bars: Vec<Bar>,
    #[serde(default)]
    pub short_ratios: Vec<f64>,
    #[serde(default)]
    pub dark_pool_percentages: Vec<f64>,
    #[serde(default)]
    pub holdings_current: Vec<Holding>,
    #[serde(default)]
    pub holdings_previous: Option<Vec<Holding>>,
    #[serde(default)]
    pub current_price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub manipulation_score: f64,
    pub category_scores: CategoryScores,
    pub signals: SignalSummary,
    pub volume: VolumeAnomalyReport,
    pub volume_pattern: VolumePattern,
    pub patterns: PatternAssessment,
    pub short_interest: ShortAnomalyReport,
    pub short_trend: ShortTrend,
    pub dark_pool_activity: Option<DarkPoolAnomalyReport>,
    pub dark_pool_trend: DarkPoolTrend,
    pub dark_pool: Option<DarkPoolAssessment>,
    pub institutional_flow: FlowEstimate,
    pub institutional_behavior: BehaviorProfile,
    pub holdings_changes: Option<HoldingsChanges>,
    pub consensus: ConsensusOutcome,
    pub judgment_failures: Vec<SourceFailure>,
}

pub struct Analyzer {
    config: AnalysisConfig,
    judgment: JudgmentConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig, judgment: JudgmentConfig) -> Self {
        Self { config, judgment }
    }

    pub async fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        sources: &[Arc<dyn JudgmentSource>],
    ) -> anyhow::Result<AnalysisReport> {
        info!(symbol = %snapshot.symbol, "starting analysis");

        // Detector stage. The volume average needs real history; its
        // absence is caller misuse and aborts here.
        let volume = detect_volume_anomaly(
            &snapshot.daily_bars,
            snapshot.current_volume,
            Some(&snapshot.intraday_bars),
        )?;
        let volume_pattern = analyze_volume_pattern(&snapshot.daily_bars);
        let patterns = analyze_manipulation_patterns(
            &snapshot.intraday_bars,
            self.config.closing_window_minutes,
        );
        let short_interest = detect_short_anomalies(&snapshot.short_ratios);
        let short_trend = analyze_short_trend(&snapshot.short_ratios);

        let dark_pool_pct = snapshot.dark_pool_percentages.first().copied();
        let dark_pool_report = dark_pool_pct.map(detect_dark_pool_anomalies);
        let dark_pool_trend = analyze_dark_pool_trend(&snapshot.dark_pool_percentages);
        let dark_pool = dark_pool_pct
            .map(|p| assess_dark_pool_activity(p, self.config.dark_pool_historical_average));

        // Aggregation stage.
        let category_scores = CategoryScores {
            volume: volume.anomaly_detected.then_some(volume.anomaly_score),
            price_pattern: patterns
                .manipulation_detected
                .then_some(patterns.manipulation_score),
            short_interest: severity_confidence(&short_interest.signals),
            dark_pool: dark_pool_report
                .as_ref()
                .and_then(|r| severity_confidence(&r.signals)),
        };
        let manipulation_score = weighted_manipulation_score(&category_scores);

        let signals = collect_signals(vec![
            volume.signals.clone(),
            short_interest.signals.clone(),
            dark_pool_report
                .as_ref()
                .map(|r| r.signals.clone())
                .unwrap_or_default(),
        ]);

        // Institutional flow stage.
        let holdings_changes = (!snapshot.holdings_current.is_empty()).then(|| {
            analyze_13f_changes(
                &snapshot.holdings_current,
                snapshot.holdings_previous.as_deref(),
            )
        });
        let institutional_flow = analyze_institutional_flow(&FlowInputs {
            holdings: holdings_changes.as_ref(),
            dark_pool_pct,
            short_ratio_pct: snapshot.short_ratios.first().copied(),
            volume_ratio: Some(volume.metrics.volume_ratio),
        });
        let institutional_behavior =
            classify_behavior(institutional_flow.direction, institutional_flow.strength);

        // Judgment stage: parallel fan-out, then the pure consensus fold.
        let prompt = build_manipulation_prompt(&PromptContext {
            symbol: &snapshot.symbol,
            signals: &signals.signals,
            volume: &volume,
            patterns: &patterns,
            shorts: &short_interest,
            short_trend: &short_trend,
            dark_pool_pct,
            current_price: snapshot.current_price,
            intraday_points: snapshot.intraday_bars.len(),
        });
        let batch = gather_judgments(
            sources,
            &prompt,
            Duration::from_millis(self.judgment.timeout_ms),
        )
        .await;
        debug!(
            symbol = %snapshot.symbol,
            judgments = batch.records.len(),
            failures = batch.failures.len(),
            "judgment stage complete"
        );
        let consensus = compute_consensus(&batch.records);

        Ok(AnalysisReport {
            analysis_id: Uuid::new_v4(),
            symbol: snapshot.symbol.clone(),
            generated_at: Utc::now(),
            manipulation_score,
            category_scores,
            signals,
            volume,
            volume_pattern,
            patterns,
            short_interest,
            short_trend,
            dark_pool_activity: dark_pool_report,
            dark_pool_trend,
            dark_pool,
            institutional_flow,
            institutional_behavior,
            holdings_changes,
            consensus,
            judgment_failures: batch.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceFuture;
    use chrono::TimeZone;
    use consensus_engine::{Likelihood, RawJudgment};
    use serde_json::json;

    fn bar(close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    fn spiky_snapshot() -> MarketSnapshot {
        // 20 quiet days, a 4x volume session, and a wash-heavy tape.
        let daily_bars: Vec<Bar> = (0..20).map(|_| bar(10.0, 1_000_000.0)).collect();
        let mut intraday: Vec<Bar> = (0..35).map(|_| bar(10.0, 2_000.0)).collect();
        intraday.extend((0..10).map(|i| bar(10.0 + (i % 3) as f64 * 0.1, 2_000.0)));

        MarketSnapshot {
            symbol: "ACME".into(),
            daily_bars,
            current_volume: 4_000_000.0,
            intraday_bars: intraday,
            short_ratios: vec![55.0, 45.0, 42.0, 30.0],
            dark_pool_percentages: vec![52.0, 44.0, 40.0],
            holdings_current: Vec::new(),
            holdings_previous: None,
            current_price: Some(10.0),
        }
    }

    struct FixedSource(&'static str, serde_json::Value);

    impl JudgmentSource for FixedSource {
        fn name(&self) -> &str {
            self.0
        }

        fn request(&self, _prompt: String) -> SourceFuture<'_> {
            let value = self.1.clone();
            Box::pin(async move { Ok(RawJudgment::Structured(value)) })
        }
    }

    fn analyzer() -> Analyzer {
        Analyzer::new(AnalysisConfig::default(), JudgmentConfig::default())
    }

    #[tokio::test]
    async fn test_deterministic_only_analysis_has_no_consensus() {
        let report = analyzer().analyze(&spiky_snapshot(), &[]).await.unwrap();

        assert!(report.manipulation_score > 0.0);
        assert!(report.signals.high_count >= 2);
        assert!(matches!(
            report.consensus,
            ConsensusOutcome::Unavailable { .. }
        ));
        assert!(report.judgment_failures.is_empty());
    }

    #[tokio::test]
    async fn test_full_pipeline_with_judgment_sources() {
        let analyzer = analyzer();
        let sources: Vec<Arc<dyn JudgmentSource>> = vec![
            Arc::new(FixedSource(
                "alpha",
                json!({"manipulation_likelihood": "high", "confidence": 0.9,
                       "recommended_action": "AVOID"}),
            )),
            Arc::new(FixedSource(
                "beta",
                json!({"manipulation_likelihood": "high", "confidence": 0.8,
                       "recommended_action": "AVOID"}),
            )),
        ];

        let report = analyzer
            .analyze(&spiky_snapshot(), &sources)
            .await
            .unwrap();

        let ConsensusOutcome::Available(consensus) = &report.consensus else {
            panic!("expected consensus");
        };
        assert_eq!(consensus.responses_received, 2);
        assert_eq!(consensus.manipulation_likelihood, Likelihood::High);
        assert!((consensus.agreement_level - 1.0).abs() < 1e-9);
        assert!(report.judgment_failures.is_empty());
    }

    #[tokio::test]
    async fn test_failing_source_is_reported_on_the_analysis() {
        struct BrokenSource;

        impl JudgmentSource for BrokenSource {
            fn name(&self) -> &str {
                "broken"
            }

            fn request(&self, _prompt: String) -> SourceFuture<'_> {
                Box::pin(async { Err(anyhow::anyhow!("connection refused")) })
            }
        }

        let sources: Vec<Arc<dyn JudgmentSource>> = vec![Arc::new(BrokenSource)];
        let report = analyzer()
            .analyze(&spiky_snapshot(), &sources)
            .await
            .unwrap();

        assert!(matches!(
            report.consensus,
            ConsensusOutcome::Unavailable { .. }
        ));
        assert_eq!(report.judgment_failures.len(), 1);
        assert_eq!(report.judgment_failures[0].source, "broken");
    }

    #[tokio::test]
    async fn test_empty_daily_history_aborts() {
        let mut snapshot = spiky_snapshot();
        snapshot.daily_bars.clear();

        assert!(analyzer().analyze(&snapshot, &[]).await.is_err());
    }
}
