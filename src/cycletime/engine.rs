//! Per-card time-in-state engine.
//!
//! Converts one card's ordered status-event history into a per-canonical-state
//! duration breakdown plus blocked time and rework counts. Pure function of
//! (events, column mapping, rework policy): settings are threaded in as
//! values, never read from process-wide state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{ColumnStateMapping, WorkflowState};
use crate::adapters::types::Card;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("card {card}: events out of chronological order at position {position}")]
    MalformedHistory { card: String, position: usize },
}

/// Which state re-entries count as rework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReworkPolicy {
    /// Re-entry into these states is never counted as rework.
    pub excluded_states: BTreeSet<WorkflowState>,
    /// Whether re-entries after the card has left `Done` (a reopen) count
    /// as rework. Off by default: a reopen starts a new cycle.
    pub count_reopen_as_rework: bool,
}

impl Default for ReworkPolicy {
    fn default() -> Self {
        Self {
            excluded_states: BTreeSet::from([WorkflowState::Block]),
            count_reopen_as_rework: false,
        }
    }
}

/// Per-card output: total elapsed time and a map from canonical state to
/// time spent, with blocked time carried in the `Block` bucket.
///
/// Invariant: the per-state durations (including `Block`) sum to `total_ms`.
/// Intervals in unmapped columns are excluded from both, which keeps the
/// total internally consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleTimeBreakdown {
    pub card: String,
    pub total_ms: i64,
    pub time_in_state_ms: BTreeMap<WorkflowState, i64>,
    pub rework: BTreeMap<WorkflowState, u32>,
}

impl CycleTimeBreakdown {
    pub fn state_ms(&self, state: WorkflowState) -> i64 {
        self.time_in_state_ms.get(&state).copied().unwrap_or(0)
    }

    pub fn blocked_ms(&self) -> i64 {
        self.state_ms(WorkflowState::Block)
    }

    pub fn reworked(&self) -> bool {
        self.rework.values().any(|count| *count > 0)
    }

    pub fn blocked_percentage(&self) -> f64 {
        floor_percentage(self.blocked_ms(), self.total_ms)
    }

    pub fn developing_percentage(&self) -> f64 {
        floor_percentage(self.state_ms(WorkflowState::InDev), self.total_ms)
    }
}

/// Percentage of `part` in `total`, floored at the hundredths place so
/// performance is never overstated. Zero total is defined as zero, not NaN.
pub fn floor_percentage(part_ms: i64, total_ms: i64) -> f64 {
    if total_ms <= 0 {
        return 0.0;
    }
    floor2(part_ms as f64 / total_ms as f64 * 100.0)
}

/// Round down to two decimals.
pub fn floor2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

#[derive(Debug, Clone)]
pub struct CycleTimeEngine {
    mapping: ColumnStateMapping,
    policy: ReworkPolicy,
}

impl CycleTimeEngine {
    pub fn new(mapping: ColumnStateMapping, policy: ReworkPolicy) -> Self {
        Self { mapping, policy }
    }

    pub fn mapping(&self) -> &ColumnStateMapping {
        &self.mapping
    }

    /// The canonical state a card is in right after `event`: a blocked flag
    /// overrides whatever the column maps to.
    pub fn resolve_event(&self, event: &crate::adapters::types::StatusEvent) -> Option<WorkflowState> {
        if event.flagged_as_blocked {
            Some(WorkflowState::Block)
        } else {
            self.mapping
                .resolve(&event.to_column, event.to_status.as_deref())
        }
    }

    /// Compute the breakdown for one card.
    ///
    /// `window_end` bounds the open tail of a card that is not yet Done;
    /// completed cards stop accumulating at their Done transition. A card
    /// with fewer than two events yields a zero-duration breakdown.
    pub fn breakdown(
        &self,
        card: &Card,
        window_end: DateTime<Utc>,
    ) -> Result<CycleTimeBreakdown, HistoryError> {
        for (position, pair) in card.history.windows(2).enumerate() {
            if pair[1].at < pair[0].at {
                return Err(HistoryError::MalformedHistory {
                    card: card.key.clone(),
                    position: position + 1,
                });
            }
        }

        let mut breakdown = CycleTimeBreakdown {
            card: card.key.clone(),
            ..CycleTimeBreakdown::default()
        };
        if card.history.len() < 2 {
            return Ok(breakdown);
        }

        // The state active during interval [i, i+1) is the state entered at
        // event i; a blocked flag overrides whatever the column maps to.
        let resolved: Vec<Option<WorkflowState>> = card
            .history
            .iter()
            .map(|event| self.resolve_event(event))
            .collect();

        for i in 0..card.history.len() - 1 {
            let Some(state) = resolved[i] else { continue };
            let duration_ms = (card.history[i + 1].at - card.history[i].at).num_milliseconds();
            accumulate(&mut breakdown, state, duration_ms);
        }

        // Open tail up to the window end, only for cards not yet Done.
        let last = card.history.len() - 1;
        if let Some(state) = resolved[last] {
            if !state.is_done() && window_end > card.history[last].at {
                let duration_ms = (window_end - card.history[last].at).num_milliseconds();
                accumulate(&mut breakdown, state, duration_ms);
            }
        }

        self.count_rework(&resolved, &mut breakdown);
        Ok(breakdown)
    }

    /// A re-entry into a state the card has already visited and left
    /// increments that state's rework counter, subject to the policy's
    /// excluded-state set and reopen rule.
    fn count_rework(&self, resolved: &[Option<WorkflowState>], breakdown: &mut CycleTimeBreakdown) {
        let mut sequence: Vec<WorkflowState> = Vec::with_capacity(resolved.len());
        for state in resolved.iter().flatten() {
            if sequence.last() != Some(state) {
                sequence.push(*state);
            }
        }

        let mut left: BTreeSet<WorkflowState> = BTreeSet::new();
        for pair in sequence.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            left.insert(previous);
            if !left.contains(&current) {
                continue;
            }
            if self.policy.excluded_states.contains(&current) {
                continue;
            }
            if left.contains(&WorkflowState::Done) && !self.policy.count_reopen_as_rework {
                continue;
            }
            *breakdown.rework.entry(current).or_insert(0) += 1;
        }
    }
}

fn accumulate(breakdown: &mut CycleTimeBreakdown, state: WorkflowState, duration_ms: i64) {
    *breakdown.time_in_state_ms.entry(state).or_insert(0) += duration_ms;
    breakdown.total_ms += duration_ms;
}
