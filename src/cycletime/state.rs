//! Canonical workflow states and the board-column mapping onto them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed, closed set of canonical workflow states every board column
/// must map to for cycle-time purposes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum WorkflowState {
    Todo,
    Analysis,
    InDev,
    Block,
    WaitingForTesting,
    Testing,
    Review,
    Done,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 8] = [
        WorkflowState::Todo,
        WorkflowState::Analysis,
        WorkflowState::InDev,
        WorkflowState::Block,
        WorkflowState::WaitingForTesting,
        WorkflowState::Testing,
        WorkflowState::Review,
        WorkflowState::Done,
    ];

    pub fn is_done(self) -> bool {
        self == WorkflowState::Done
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Todo => "Todo",
            WorkflowState::Analysis => "Analysis",
            WorkflowState::InDev => "InDev",
            WorkflowState::Block => "Block",
            WorkflowState::WaitingForTesting => "WaitingForTesting",
            WorkflowState::Testing => "Testing",
            WorkflowState::Review => "Review",
            WorkflowState::Done => "Done",
        };
        write!(f, "{name}")
    }
}

/// One configured mapping row: a board column (optionally narrowed to a
/// status within it) resolves to a canonical state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub column: String,
    #[serde(default)]
    pub status: Option<String>,
    pub state: WorkflowState,
}

/// Lookup from (column, optional status) to canonical state.
///
/// Matching is case-insensitive. A (column, status) row wins over a bare
/// column row. A column absent from the mapping resolves to `None` and its
/// intervals are excluded from every bucket and from the total.
#[derive(Debug, Clone, Default)]
pub struct ColumnStateMapping {
    columns: HashMap<String, WorkflowState>,
    statuses: HashMap<(String, String), WorkflowState>,
}

impl ColumnStateMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[MappingEntry]) -> Self {
        let mut mapping = Self::new();
        for entry in entries {
            match &entry.status {
                Some(status) => {
                    mapping
                        .statuses
                        .insert((normalize(&entry.column), normalize(status)), entry.state);
                }
                None => {
                    mapping.columns.insert(normalize(&entry.column), entry.state);
                }
            }
        }
        mapping
    }

    pub fn with_column(mut self, column: &str, state: WorkflowState) -> Self {
        self.columns.insert(normalize(column), state);
        self
    }

    pub fn with_status(mut self, column: &str, status: &str, state: WorkflowState) -> Self {
        self.statuses
            .insert((normalize(column), normalize(status)), state);
        self
    }

    pub fn resolve(&self, column: &str, status: Option<&str>) -> Option<WorkflowState> {
        if let Some(status) = status {
            if let Some(state) = self.statuses.get(&(normalize(column), normalize(status))) {
                return Some(*state);
            }
        }
        self.columns.get(&normalize(column)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.statuses.is_empty()
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}
