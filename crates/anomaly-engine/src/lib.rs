pub mod aggregate;
pub mod darkpool;
pub mod price;
pub mod shorts;
pub mod types;
pub mod volume;

pub use aggregate::{
    collect_signals, severity_confidence, weighted_manipulation_score, CategoryScores,
    SignalSummary,
};
pub use darkpool::{
    analyze_dark_pool_trend, assess_dark_pool_activity, detect_dark_pool_anomalies,
    DarkPoolAnomalyReport, DarkPoolAssessment, DarkPoolLevel, DarkPoolTrend,
};
pub use price::{
    analyze_manipulation_patterns, detect_closing_manipulation, detect_painting_the_tape,
    detect_wash_trading, ClosingManipulation, PaintingTheTape, PatternAssessment, PatternSet,
    WashTrading, DEFAULT_CLOSING_WINDOW,
};
pub use shorts::{analyze_short_trend, detect_short_anomalies, ShortAnomalyReport, ShortTrend};
pub use types::{Bar, DetectError, Severity, Signal, SignalType, TrendDirection};
pub use volume::{
    analyze_volume_pattern, anomaly_score, average_volume, closing_volume_concentration,
    detect_volume_anomaly, ClosingConcentration, VolumeAnomalyReport, VolumeMetrics, VolumePattern,
};
