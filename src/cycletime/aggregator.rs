//! Grouped cycle-time statistics over a card set.
//!
//! Runs the engine per card, groups by iteration, and averages the results.
//! Per-card failures (malformed histories) are absorbed into a skipped-cards
//! diagnostic rather than aborting the whole board.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::{floor2, floor_percentage, CycleTimeEngine};
use super::state::WorkflowState;
use crate::adapters::types::{Card, Iteration};

/// Averaged statistics for one grouping key (iteration/sprint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCycleStats {
    pub group: String,
    pub cards: u64,
    pub story_points: f64,
    pub avg_cycle_time_ms_per_card: f64,
    pub avg_cycle_time_ms_per_point: f64,
    /// Share of total cycle time spent in each state, floored at hundredths.
    pub state_percentages: BTreeMap<WorkflowState, f64>,
    pub blocked_percentage: f64,
    pub developing_percentage: f64,
    pub reworked_cards: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupVelocity {
    pub group: String,
    pub completed_cards: u64,
    pub completed_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocitySummary {
    pub groups: Vec<GroupVelocity>,
    pub total_completed_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReworkSummary {
    pub total_cards: u64,
    pub reworked_cards: u64,
    /// Reworked cards as a share of considered cards, floored at hundredths.
    pub rework_percentage: f64,
    pub by_state: BTreeMap<WorkflowState, u32>,
}

/// One distinct card-field value. Keyed by identity `id`, not display name:
/// two fields sharing a name but not an id stay separate entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEntry {
    pub id: String,
    pub name: String,
    pub cards: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleTimeSummary {
    /// Ordered by iteration start date where known, then by name.
    pub groups: Vec<GroupCycleStats>,
    pub total_cards: u64,
    /// Cards excluded for malformed histories.
    pub skipped_cards: Vec<String>,
    pub classification: Vec<ClassificationEntry>,
}

/// Everything the board domain produces in one pass over the card set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardMetrics {
    pub cycle_time: CycleTimeSummary,
    pub velocity: VelocitySummary,
    pub rework: ReworkSummary,
}

const UNGROUPED: &str = "(no iteration)";

#[derive(Default)]
struct GroupAccumulator {
    cards: u64,
    story_points: f64,
    total_ms: i64,
    per_state_ms: BTreeMap<WorkflowState, i64>,
    reworked_cards: u64,
    completed_cards: u64,
    completed_points: f64,
}

pub struct CycleTimeAggregator {
    engine: CycleTimeEngine,
}

impl CycleTimeAggregator {
    pub fn new(engine: CycleTimeEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &CycleTimeEngine {
        &self.engine
    }

    /// Aggregate a card snapshot. Zero cards produce empty summaries, not an
    /// error; malformed cards are skipped and listed in the diagnostics.
    pub fn aggregate(
        &self,
        cards: &[Card],
        iterations: &[Iteration],
        window_end: DateTime<Utc>,
    ) -> BoardMetrics {
        let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
        let mut skipped_cards: Vec<String> = Vec::new();
        let mut considered_cards: Vec<&Card> = Vec::new();
        let mut rework_by_state: BTreeMap<WorkflowState, u32> = BTreeMap::new();
        let mut reworked_cards = 0u64;
        let mut considered = 0u64;

        for card in cards {
            let breakdown = match self.engine.breakdown(card, window_end) {
                Ok(breakdown) => breakdown,
                Err(error) => {
                    tracing::warn!(card.key = %card.key, %error, "Skipping card with malformed history");
                    skipped_cards.push(card.key.clone());
                    continue;
                }
            };
            considered += 1;
            considered_cards.push(card);

            let group = groups
                .entry(
                    card.iteration
                        .clone()
                        .unwrap_or_else(|| UNGROUPED.to_string()),
                )
                .or_default();
            group.cards += 1;
            group.story_points += card.story_points.unwrap_or(0.0);
            group.total_ms += breakdown.total_ms;
            for (state, ms) in &breakdown.time_in_state_ms {
                *group.per_state_ms.entry(*state).or_insert(0) += ms;
            }

            let done = card
                .history
                .last()
                .and_then(|event| self.engine.resolve_event(event))
                .is_some_and(WorkflowState::is_done);
            if done {
                group.completed_cards += 1;
                group.completed_points += card.story_points.unwrap_or(0.0);
            }

            if breakdown.reworked() {
                group.reworked_cards += 1;
                reworked_cards += 1;
            }
            for (state, count) in &breakdown.rework {
                *rework_by_state.entry(*state).or_insert(0) += count;
            }
        }

        let order = group_order(&groups, iterations);

        let mut group_stats = Vec::with_capacity(order.len());
        let mut velocity_groups = Vec::with_capacity(order.len());
        let mut total_completed_points = 0.0;
        for name in order {
            let accumulator = &groups[&name];
            group_stats.push(group_stats_from(&name, accumulator));
            total_completed_points += accumulator.completed_points;
            velocity_groups.push(GroupVelocity {
                group: name.clone(),
                completed_cards: accumulator.completed_cards,
                completed_points: accumulator.completed_points,
            });
        }

        let rework_percentage = if considered > 0 {
            floor2(reworked_cards as f64 / considered as f64 * 100.0)
        } else {
            0.0
        };

        BoardMetrics {
            cycle_time: CycleTimeSummary {
                groups: group_stats,
                total_cards: considered,
                skipped_cards,
                classification: classify(&considered_cards, considered),
            },
            velocity: VelocitySummary {
                groups: velocity_groups,
                total_completed_points,
            },
            rework: ReworkSummary {
                total_cards: considered,
                reworked_cards,
                rework_percentage,
                by_state: rework_by_state,
            },
        }
    }
}

/// Groups ordered by iteration start date where known, unknown groups last
/// in name order.
fn group_order(
    groups: &BTreeMap<String, GroupAccumulator>,
    iterations: &[Iteration],
) -> Vec<String> {
    let starts: BTreeMap<&str, DateTime<Utc>> = iterations
        .iter()
        .map(|iteration| (iteration.name.as_str(), iteration.starts_at))
        .collect();

    let mut names: Vec<String> = groups.keys().cloned().collect();
    names.sort_by(|a, b| match (starts.get(a.as_str()), starts.get(b.as_str())) {
        (Some(sa), Some(sb)) => sa.cmp(sb).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    names
}

fn group_stats_from(name: &str, accumulator: &GroupAccumulator) -> GroupCycleStats {
    let state_percentages: BTreeMap<WorkflowState, f64> = accumulator
        .per_state_ms
        .iter()
        .map(|(state, ms)| (*state, floor_percentage(*ms, accumulator.total_ms)))
        .collect();

    let blocked_ms = accumulator
        .per_state_ms
        .get(&WorkflowState::Block)
        .copied()
        .unwrap_or(0);
    let developing_ms = accumulator
        .per_state_ms
        .get(&WorkflowState::InDev)
        .copied()
        .unwrap_or(0);

    GroupCycleStats {
        group: name.to_string(),
        cards: accumulator.cards,
        story_points: accumulator.story_points,
        avg_cycle_time_ms_per_card: if accumulator.cards > 0 {
            accumulator.total_ms as f64 / accumulator.cards as f64
        } else {
            0.0
        },
        avg_cycle_time_ms_per_point: if accumulator.story_points > 0.0 {
            accumulator.total_ms as f64 / accumulator.story_points
        } else {
            0.0
        },
        state_percentages,
        blocked_percentage: floor_percentage(blocked_ms, accumulator.total_ms),
        developing_percentage: floor_percentage(developing_ms, accumulator.total_ms),
        reworked_cards: accumulator.reworked_cards,
    }
}

/// Count cards per distinct field value, keyed by field identity so that
/// duplicate display names stay distinguishable. Only cards that survived
/// history validation participate, matching the percentage denominator.
fn classify(cards: &[&Card], considered: u64) -> Vec<ClassificationEntry> {
    let mut counts: BTreeMap<String, (String, u64)> = BTreeMap::new();
    for card in cards {
        for field in &card.fields {
            let entry = counts
                .entry(field.id.clone())
                .or_insert_with(|| (field.name.clone(), 0));
            entry.1 += 1;
        }
    }

    let mut entries: Vec<ClassificationEntry> = counts
        .into_iter()
        .map(|(id, (name, count))| ClassificationEntry {
            id,
            name,
            cards: count,
            percentage: if considered > 0 {
                floor2(count as f64 / considered as f64 * 100.0)
            } else {
                0.0
            },
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::types::{CardField, StatusEvent};
    use crate::cycletime::engine::ReworkPolicy;
    use crate::cycletime::state::ColumnStateMapping;
    use chrono::TimeZone;

    fn ts(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, h, 0, 0).unwrap()
    }

    fn event(day: u32, h: u32, column: &str) -> StatusEvent {
        StatusEvent {
            at: ts(day, h),
            to_column: column.to_string(),
            to_status: None,
            flagged_as_blocked: false,
        }
    }

    fn card(key: &str, iteration: &str, points: f64, history: Vec<StatusEvent>) -> Card {
        Card {
            key: key.to_string(),
            summary: None,
            story_points: Some(points),
            iteration: Some(iteration.to_string()),
            labels: Vec::new(),
            fields: Vec::new(),
            history,
        }
    }

    fn aggregator() -> CycleTimeAggregator {
        let mapping = ColumnStateMapping::new()
            .with_column("Todo", WorkflowState::Todo)
            .with_column("In Dev", WorkflowState::InDev)
            .with_column("Done", WorkflowState::Done);
        CycleTimeAggregator::new(CycleTimeEngine::new(mapping, ReworkPolicy::default()))
    }

    #[test]
    fn zero_cards_yield_empty_summaries() {
        let metrics = aggregator().aggregate(&[], &[], ts(30, 0));
        assert!(metrics.cycle_time.groups.is_empty());
        assert_eq!(metrics.cycle_time.total_cards, 0);
        assert_eq!(metrics.rework.rework_percentage, 0.0);
        assert_eq!(metrics.velocity.total_completed_points, 0.0);
    }

    #[test]
    fn groups_are_ordered_by_iteration_start() {
        let cards = vec![
            card("A-1", "Sprint 10", 1.0, vec![event(10, 0, "Todo"), event(10, 4, "Done")]),
            card("A-2", "Sprint 9", 1.0, vec![event(3, 0, "Todo"), event(3, 4, "Done")]),
        ];
        let iterations = vec![
            Iteration {
                name: "Sprint 9".into(),
                starts_at: ts(1, 0),
            },
            Iteration {
                name: "Sprint 10".into(),
                starts_at: ts(8, 0),
            },
        ];
        let metrics = aggregator().aggregate(&cards, &iterations, ts(30, 0));
        let names: Vec<&str> = metrics
            .cycle_time
            .groups
            .iter()
            .map(|g| g.group.as_str())
            .collect();
        assert_eq!(names, vec!["Sprint 9", "Sprint 10"]);
    }

    #[test]
    fn averages_per_card_and_per_point() {
        let cards = vec![
            card("B-1", "S1", 2.0, vec![event(1, 0, "In Dev"), event(1, 4, "Done")]),
            card("B-2", "S1", 2.0, vec![event(1, 0, "In Dev"), event(1, 8, "Done")]),
        ];
        let metrics = aggregator().aggregate(&cards, &[], ts(30, 0));
        let group = &metrics.cycle_time.groups[0];
        // 12h total across 2 cards and 4 points.
        assert_eq!(group.avg_cycle_time_ms_per_card, 6.0 * 3_600_000.0);
        assert_eq!(group.avg_cycle_time_ms_per_point, 3.0 * 3_600_000.0);
    }

    #[test]
    fn malformed_card_is_skipped_not_fatal() {
        let cards = vec![
            card("C-1", "S1", 1.0, vec![event(2, 0, "Todo"), event(1, 0, "Done")]),
            card("C-2", "S1", 1.0, vec![event(1, 0, "In Dev"), event(1, 2, "Done")]),
        ];
        let metrics = aggregator().aggregate(&cards, &[], ts(30, 0));
        assert_eq!(metrics.cycle_time.skipped_cards, vec!["C-1".to_string()]);
        assert_eq!(metrics.cycle_time.total_cards, 1);
    }

    #[test]
    fn velocity_counts_only_completed_cards() {
        let cards = vec![
            card("D-1", "S1", 3.0, vec![event(1, 0, "In Dev"), event(1, 4, "Done")]),
            card("D-2", "S1", 5.0, vec![event(1, 0, "Todo"), event(1, 2, "In Dev")]),
        ];
        let metrics = aggregator().aggregate(&cards, &[], ts(30, 0));
        assert_eq!(metrics.velocity.total_completed_points, 3.0);
        assert_eq!(metrics.velocity.groups[0].completed_cards, 1);
    }

    #[test]
    fn classification_keeps_duplicate_names_distinct() {
        let mut first = card("E-1", "S1", 1.0, vec![event(1, 0, "Todo"), event(1, 1, "Done")]);
        first.fields = vec![CardField {
            id: "epic-100".into(),
            name: "Checkout".into(),
        }];
        let mut second = card("E-2", "S1", 1.0, vec![event(1, 0, "Todo"), event(1, 1, "Done")]);
        second.fields = vec![CardField {
            id: "epic-200".into(),
            name: "Checkout".into(),
        }];

        let metrics = aggregator().aggregate(&[first, second], &[], ts(30, 0));
        let entries = &metrics.cycle_time.classification;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|entry| entry.name == "Checkout"));
        assert_eq!(entries[0].percentage, 50.0);
    }
}
