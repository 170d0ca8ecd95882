use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub judgment: JudgmentConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgmentConfig {
    /// Per-source call timeout, enforced by the judgment fan-out.
    pub timeout_ms: u64,
    /// Below this many valid judgments the consensus is flagged thin in
    /// the journal (it is still computed).
    pub min_sources: usize,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 20_000,
            min_sources: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub closing_window_minutes: usize,
    pub dark_pool_historical_average: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            closing_window_minutes: 15,
            dark_pool_historical_average: 35.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    pub high_risk_threshold: f64,
    pub medium_risk_threshold: f64,
    pub high_severity_signal_count: usize,
    pub dedup_window_secs: i64,
    pub retention_secs: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 0.7,
            medium_risk_threshold: 0.4,
            high_severity_signal_count: 3,
            dedup_window_secs: 300,
            retention_secs: 3_600,
        }
    }
}

impl AppConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
