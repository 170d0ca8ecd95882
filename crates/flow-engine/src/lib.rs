pub mod classify;
pub mod holdings;

pub use classify::{
    analyze_institutional_flow, classify_behavior, BehaviorPattern, BehaviorProfile,
    FlowDirection, FlowEstimate, FlowInputs, FlowRecommendation, FlowRisk,
};
pub use holdings::{
    analyze_13f_changes, Holding, HoldingsChanges, PositionChange, PositionSnapshot,
    UnusualActivity, UnusualActivityKind,
};
