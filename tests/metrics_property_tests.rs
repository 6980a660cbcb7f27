//! Property tests for the aggregation invariants.
//! Testing library/framework: proptest over the pure calculator functions.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use proptest::prelude::*;

use delivery_pulse::adapters::types::{BuildStatus, Card, DeployEvent, StatusEvent};
use delivery_pulse::cycletime::engine::floor_percentage;
use delivery_pulse::cycletime::{ColumnStateMapping, CycleTimeEngine, ReworkPolicy, WorkflowState};
use delivery_pulse::dora::{change_failure_rate, mean_time_to_recovery, IncidentRule, PipelineDeploys};

const COLUMNS: [&str; 5] = ["Todo", "In Dev", "Testing", "Done", "Limbo"];

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

fn mapping() -> ColumnStateMapping {
    // "Limbo" is deliberately unmapped.
    ColumnStateMapping::new()
        .with_column("Todo", WorkflowState::Todo)
        .with_column("In Dev", WorkflowState::InDev)
        .with_column("Testing", WorkflowState::Testing)
        .with_column("Done", WorkflowState::Done)
}

fn engine() -> CycleTimeEngine {
    CycleTimeEngine::new(mapping(), ReworkPolicy::default())
}

fn history(steps: &[(u32, bool, usize)]) -> Vec<StatusEvent> {
    let mut at = base();
    steps
        .iter()
        .map(|(delta_minutes, flagged, column)| {
            at += ChronoDuration::minutes(i64::from(*delta_minutes));
            StatusEvent {
                at,
                to_column: COLUMNS[column % COLUMNS.len()].to_string(),
                to_status: None,
                flagged_as_blocked: *flagged,
            }
        })
        .collect()
}

fn card_with(history: Vec<StatusEvent>) -> Card {
    Card {
        key: "PROP-1".into(),
        summary: None,
        story_points: None,
        iteration: None,
        labels: Vec::new(),
        fields: Vec::new(),
        history,
    }
}

fn arb_status() -> impl Strategy<Value = BuildStatus> {
    prop_oneof![
        Just(BuildStatus::Passed),
        Just(BuildStatus::Failed),
        Just(BuildStatus::Other),
    ]
}

fn deploys(steps: &[(u32, BuildStatus)]) -> Vec<DeployEvent> {
    let mut at = base();
    steps
        .iter()
        .map(|(delta_minutes, status)| {
            at += ChronoDuration::minutes(i64::from(*delta_minutes));
            DeployEvent {
                pipeline: "api".into(),
                step: "deploy".into(),
                status: *status,
                started_at: at,
                finished_at: at,
                commit_id: None,
            }
        })
        .collect()
}

proptest! {
    /// Per-state durations (Block included) always sum to the total.
    #[test]
    fn breakdown_conserves_total(
        steps in prop::collection::vec((0u32..720, any::<bool>(), 0usize..5), 0..40)
    ) {
        let card = card_with(history(&steps));
        let breakdown = engine().breakdown(&card, base() + ChronoDuration::days(60)).unwrap();
        let sum: i64 = breakdown.time_in_state_ms.values().sum();
        prop_assert!((sum - breakdown.total_ms).abs() <= 1);
    }

    /// Flagging one mapped, non-final event moves exactly its interval from
    /// the column's bucket into Block, leaving the total unchanged.
    #[test]
    fn flagging_is_conservative(
        steps in prop::collection::vec((1u32..720, 0usize..4), 2..20),
        pick in any::<prop::sample::Index>(),
    ) {
        let plain: Vec<(u32, bool, usize)> =
            steps.iter().map(|(delta, column)| (*delta, false, *column)).collect();
        let index = pick.index(plain.len() - 1); // never the last event
        let mut flagged = plain.clone();
        flagged[index].1 = true;

        let window_end = base() + ChronoDuration::days(60);
        let before = engine().breakdown(&card_with(history(&plain)), window_end).unwrap();
        let after = engine().breakdown(&card_with(history(&flagged)), window_end).unwrap();

        let interval_ms = i64::from(plain[index + 1].0) * 60_000;
        let state = mapping()
            .resolve(COLUMNS[plain[index].2 % COLUMNS.len()], None)
            .unwrap();
        prop_assert_eq!(after.blocked_ms() - before.blocked_ms(), interval_ms);
        if state != WorkflowState::Block {
            prop_assert_eq!(before.state_ms(state) - after.state_ms(state), interval_ms);
        }
        prop_assert_eq!(before.total_ms, after.total_ms);
    }

    /// The pipeline calculators are invariant to adapter return order.
    #[test]
    fn pipeline_calculators_are_order_invariant(
        steps in prop::collection::vec((0u32..10_000, arb_status()), 0..50)
    ) {
        let forward = deploys(&steps);
        let mut reversed = forward.clone();
        reversed.reverse();

        prop_assert_eq!(
            change_failure_rate(&[PipelineDeploys::new("api", forward.clone())]),
            change_failure_rate(&[PipelineDeploys::new("api", reversed.clone())])
        );
        prop_assert_eq!(
            mean_time_to_recovery(
                &[PipelineDeploys::new("api", forward)],
                IncidentRule::RunOfFailures
            ),
            mean_time_to_recovery(
                &[PipelineDeploys::new("api", reversed)],
                IncidentRule::RunOfFailures
            )
        );
    }

    /// Floored percentages stay inside [0, 100] and never go NaN.
    #[test]
    fn floor_percentage_is_bounded(part in 0i64..1_000_000, total in 0i64..1_000_000) {
        let value = floor_percentage(part.min(total), total);
        prop_assert!(value.is_finite());
        prop_assert!((0.0..=100.0).contains(&value));
    }
}
