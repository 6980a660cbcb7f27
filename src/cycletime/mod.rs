// Per-card time-in-state computation and its aggregation into grouped
// cycle-time, velocity, and rework statistics.

pub mod aggregator;
pub mod engine;
pub mod state;

pub use aggregator::{
    BoardMetrics, ClassificationEntry, CycleTimeAggregator, CycleTimeSummary, GroupCycleStats,
    ReworkSummary, VelocitySummary,
};
pub use engine::{CycleTimeBreakdown, CycleTimeEngine, HistoryError, ReworkPolicy};
pub use state::{ColumnStateMapping, MappingEntry, WorkflowState};
