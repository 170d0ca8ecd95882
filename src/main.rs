mod alerts;
mod config;
mod journal;
mod pipeline;
mod prompt;
mod sources;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::alerts::AlertStore;
use crate::config::AppConfig;
use crate::journal::{resolve_journal_dir, AnalysisJournal};
use crate::pipeline::{Analyzer, MarketSnapshot};
use crate::sources::JudgmentSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = match AppConfig::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            warn!("config.toml not loaded ({}), using defaults", e);
            AppConfig::default()
        }
    };

    let snapshot_path = std::env::args()
        .nth(1)
        .context("usage: surveillance-bot <snapshot.json>")?;
    let raw = std::fs::read_to_string(&snapshot_path)
        .with_context(|| format!("reading snapshot {}", snapshot_path))?;
    let snapshot: MarketSnapshot =
        serde_json::from_str(&raw).context("parsing market snapshot")?;

    let mut journal = AnalysisJournal::open(resolve_journal_dir())?;
    info!(dir = %journal.dir().display(), "journal open");

    // Judgment providers are wired in by deployments; with none
    // configured the run is deterministic-only and consensus reports
    // unavailable.
    let sources: Vec<Arc<dyn JudgmentSource>> = Vec::new();
    if sources.len() < config.judgment.min_sources {
        warn!(
            configured = sources.len(),
            min = config.judgment.min_sources,
            "fewer judgment sources than configured minimum"
        );
    }

    journal.analysis_started(&snapshot.symbol);

    let analyzer = Analyzer::new(config.analysis.clone(), config.judgment.clone());
    let report = analyzer.analyze(&snapshot, &sources).await?;

    for failure in &report.judgment_failures {
        journal.judgment_failure(&report.symbol, failure);
    }

    let mut alert_store = AlertStore::new(config.alerts.clone());
    let mut recorded = Vec::new();
    for alert in alert_store.check_conditions(&report) {
        let kept = alert_store.record(alert.clone());
        if kept {
            journal.alert_recorded(&alert);
            recorded.push(alert);
        }
    }

    journal.analysis_complete(
        report.analysis_id,
        &report.symbol,
        report.manipulation_score,
        report.signals.high_count,
        recorded.len(),
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !recorded.is_empty() {
        println!("{}", serde_json::to_string_pretty(&recorded)?);
    }

    Ok(())
}
