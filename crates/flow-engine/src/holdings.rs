//! Quarter-over-quarter 13F holdings comparison.

use anomaly_engine::Severity;
use serde::{Deserialize, Serialize};

const UNUSUAL_CHANGE_PCT: f64 = 50.0;
const EXTREME_INCREASE_PCT: f64 = 100.0;
const EXTREME_DECREASE_PCT: f64 = 80.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub institution: String,
    pub shares: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionSnapshot {
    pub institution: String,
    pub shares: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionChange {
    pub institution: String,
    pub share_change: f64,
    pub percent_change: f64,
    pub current_shares: f64,
    pub previous_shares: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnusualActivityKind {
    LargeIncrease,
    LargeDecrease,
    CompleteExit,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnusualActivity {
    pub institution: String,
    pub kind: UnusualActivityKind,
    pub percent_change: Option<f64>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HoldingsChanges {
    pub new_positions: Vec<PositionSnapshot>,
    pub increased_positions: Vec<PositionChange>,
    pub decreased_positions: Vec<PositionChange>,
    pub exited_positions: Vec<PositionSnapshot>,
    pub unusual_activity: Vec<UnusualActivity>,
}

fn snapshot(holding: &Holding) -> PositionSnapshot {
    PositionSnapshot {
        institution: holding.institution.clone(),
        shares: holding.shares,
        value: holding.value,
    }
}

/// Diff the current quarter's institutional holdings against the prior
/// quarter. Without a prior snapshot every filer is a new position and no
/// change analysis is possible.
pub fn analyze_13f_changes(
    current: &[Holding],
    previous: Option<&[Holding]>,
) -> HoldingsChanges {
    let mut changes = HoldingsChanges::default();
    if current.is_empty() && previous.is_none() {
        return changes;
    }

    let Some(previous) = previous else {
        changes.new_positions = current.iter().map(snapshot).collect();
        return changes;
    };

    for holding in current {
        let prior = previous
            .iter()
            .find(|p| p.institution == holding.institution);

        let Some(prior) = prior else {
            changes.new_positions.push(snapshot(holding));
            continue;
        };

        // A zero-share prior filing carries no baseline for a percent
        // change; treat the filer as newly positioned.
        if prior.shares <= 0.0 {
            changes.new_positions.push(snapshot(holding));
            continue;
        }

        let share_change = holding.shares - prior.shares;
        let percent_change = share_change / prior.shares * 100.0;
        let change = PositionChange {
            institution: holding.institution.clone(),
            share_change,
            percent_change,
            current_shares: holding.shares,
            previous_shares: prior.shares,
        };

        if share_change > 0.0 {
            if percent_change > UNUSUAL_CHANGE_PCT {
                changes.unusual_activity.push(UnusualActivity {
                    institution: holding.institution.clone(),
                    kind: UnusualActivityKind::LargeIncrease,
                    percent_change: Some(percent_change),
                    severity: if percent_change > EXTREME_INCREASE_PCT {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                });
            }
            changes.increased_positions.push(change);
        } else if share_change < 0.0 {
            if percent_change.abs() > UNUSUAL_CHANGE_PCT {
                changes.unusual_activity.push(UnusualActivity {
                    institution: holding.institution.clone(),
                    kind: UnusualActivityKind::LargeDecrease,
                    percent_change: Some(percent_change),
                    severity: if percent_change.abs() > EXTREME_DECREASE_PCT {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                });
            }
            changes.decreased_positions.push(change);
        }
    }

    for prior in previous {
        let still_held = current
            .iter()
            .any(|c| c.institution == prior.institution);
        if !still_held {
            changes.exited_positions.push(snapshot(prior));
            changes.unusual_activity.push(UnusualActivity {
                institution: prior.institution.clone(),
                kind: UnusualActivityKind::CompleteExit,
                percent_change: None,
                severity: Severity::High,
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(institution: &str, shares: f64) -> Holding {
        Holding {
            institution: institution.into(),
            shares,
            value: shares * 10.0,
        }
    }

    #[test]
    fn test_no_prior_snapshot_everything_is_new() {
        let current = vec![holding("Alpha Capital", 1_000.0)];
        let changes = analyze_13f_changes(&current, None);
        assert_eq!(changes.new_positions.len(), 1);
        assert!(changes.increased_positions.is_empty());
        assert!(changes.unusual_activity.is_empty());
    }

    #[test]
    fn test_increase_decrease_and_exit_classification() {
        let previous = vec![
            holding("Alpha Capital", 1_000.0),
            holding("Beta Partners", 2_000.0),
            holding("Gamma Fund", 500.0),
        ];
        let current = vec![
            holding("Alpha Capital", 1_300.0),  // +30%
            holding("Beta Partners", 1_500.0),  // -25%
            holding("Delta Advisors", 800.0),   // new
        ];

        let changes = analyze_13f_changes(&current, Some(&previous));
        assert_eq!(changes.increased_positions.len(), 1);
        assert_eq!(changes.decreased_positions.len(), 1);
        assert_eq!(changes.new_positions.len(), 1);
        assert_eq!(changes.exited_positions.len(), 1);
        assert_eq!(changes.exited_positions[0].institution, "Gamma Fund");

        // Only the exit is unusual here; the size changes are below 50%.
        assert_eq!(changes.unusual_activity.len(), 1);
        assert_eq!(
            changes.unusual_activity[0].kind,
            UnusualActivityKind::CompleteExit
        );
        assert_eq!(changes.unusual_activity[0].severity, Severity::High);
    }

    #[test]
    fn test_unusual_activity_severity_grading() {
        let previous = vec![
            holding("Alpha Capital", 1_000.0),
            holding("Beta Partners", 1_000.0),
            holding("Gamma Fund", 1_000.0),
        ];
        let current = vec![
            holding("Alpha Capital", 2_500.0), // +150%: high
            holding("Beta Partners", 1_600.0), // +60%: medium
            holding("Gamma Fund", 100.0),      // -90%: high
        ];

        let changes = analyze_13f_changes(&current, Some(&previous));
        let by_name = |name: &str| {
            changes
                .unusual_activity
                .iter()
                .find(|u| u.institution == name)
                .unwrap()
        };
        assert_eq!(by_name("Alpha Capital").severity, Severity::High);
        assert_eq!(by_name("Beta Partners").severity, Severity::Medium);
        assert_eq!(by_name("Gamma Fund").severity, Severity::High);
        assert_eq!(by_name("Gamma Fund").kind, UnusualActivityKind::LargeDecrease);
    }
}
