//! Alert evaluation and in-memory alert store.
//!
//! `check_conditions` is a pure read of one analysis report; the store
//! owns deduplication and retention. Alerts are keyed by symbol and
//! kind, so a condition that keeps firing re-alerts only after the
//! dedup window has passed.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::AlertConfig;
use crate::pipeline::AnalysisReport;
use flow_engine::FlowDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    ManipulationRisk,
    MultipleHighSignals,
    InstitutionalSellOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub symbol: String,
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}

pub struct AlertStore {
    config: AlertConfig,
    alerts: Vec<Alert>,
}

impl AlertStore {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            alerts: Vec::new(),
        }
    }

    /// Evaluate the alert conditions against one report. Pure; nothing
    /// is recorded until [`AlertStore::record`].
    pub fn check_conditions(&self, report: &AnalysisReport) -> Vec<Alert> {
        let now = Utc::now();
        let mut candidates = Vec::new();

        if report.manipulation_score >= self.config.high_risk_threshold {
            candidates.push(Alert {
                symbol: report.symbol.clone(),
                kind: AlertKind::ManipulationRisk,
                priority: AlertPriority::High,
                message: format!(
                    "Manipulation score {:.2} at or above the high-risk threshold",
                    report.manipulation_score
                ),
                triggered_at: now,
            });
        } else if report.manipulation_score >= self.config.medium_risk_threshold {
            candidates.push(Alert {
                symbol: report.symbol.clone(),
                kind: AlertKind::ManipulationRisk,
                priority: AlertPriority::Medium,
                message: format!(
                    "Manipulation score {:.2} at or above the medium-risk threshold",
                    report.manipulation_score
                ),
                triggered_at: now,
            });
        }

        if report.signals.high_count >= self.config.high_severity_signal_count {
            candidates.push(Alert {
                symbol: report.symbol.clone(),
                kind: AlertKind::MultipleHighSignals,
                priority: AlertPriority::High,
                message: format!(
                    "{} high-severity signals in one analysis",
                    report.signals.high_count
                ),
                triggered_at: now,
            });
        }

        if report.institutional_flow.direction == FlowDirection::Bearish
            && report.institutional_flow.strength > 0.7
        {
            candidates.push(Alert {
                symbol: report.symbol.clone(),
                kind: AlertKind::InstitutionalSellOff,
                priority: AlertPriority::High,
                message: format!(
                    "Strong institutional selling pressure (strength {:.2})",
                    report.institutional_flow.strength
                ),
                triggered_at: now,
            });
        }

        candidates
    }

    /// Record an alert unless the same (symbol, kind) fired within the
    /// dedup window. Returns whether the alert was kept.
    pub fn record(&mut self, alert: Alert) -> bool {
        self.record_at(alert, Utc::now())
    }

    fn record_at(&mut self, alert: Alert, now: DateTime<Utc>) -> bool {
        self.prune_at(now);

        let dedup_window = Duration::seconds(self.config.dedup_window_secs);
        let duplicate = self.alerts.iter().any(|existing| {
            existing.symbol == alert.symbol
                && existing.kind == alert.kind
                && now - existing.triggered_at < dedup_window
        });
        if duplicate {
            return false;
        }

        info!(
            symbol = %alert.symbol,
            kind = ?alert.kind,
            priority = ?alert.priority,
            "alert: {}", alert.message
        );
        self.alerts.push(alert);
        true
    }

    fn prune_at(&mut self, now: DateTime<Utc>) {
        let retention = Duration::seconds(self.config.retention_secs);
        self.alerts
            .retain(|alert| now - alert.triggered_at < retention);
    }

    /// Alerts still within the retention window.
    pub fn active(&mut self) -> &[Alert] {
        self.prune_at(Utc::now());
        &self.alerts
    }

    pub fn summary(&mut self) -> AlertSummary {
        self.prune_at(Utc::now());
        let high = self
            .alerts
            .iter()
            .filter(|a| a.priority == AlertPriority::High)
            .count();
        AlertSummary {
            total: self.alerts.len(),
            high_priority: high,
            medium_priority: self.alerts.len() - high,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AlertSummary {
    pub total: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
}
