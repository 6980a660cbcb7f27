//! Normalized records consumed by the aggregation core.
//!
//! Every adapter validates its wire payloads into these types exactly once;
//! nothing downstream inspects loosely-typed data. All entities are created
//! fresh per report request and discarded with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One status change in a card's history. Histories are ordered sequences of
/// these, unique per card, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub at: DateTime<Utc>,
    pub to_column: String,
    /// Finer-grained status within the column, when the tracker exposes one.
    #[serde(default)]
    pub to_status: Option<String>,
    /// A card visibly flagged as blocked while sitting in any column.
    #[serde(default)]
    pub flagged_as_blocked: bool,
}

/// A classification field on a card (epic, component, custom field).
/// `id` is the identity key; two fields may share a display `name` and must
/// stay distinguishable in classification output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardField {
    pub id: String,
    pub name: String,
}

/// One issue-tracker card with its full status history for the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub key: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub story_points: Option<f64>,
    /// Iteration/sprint name used as the grouping key.
    #[serde(default)]
    pub iteration: Option<String>,
    /// Flag/label metadata used for block-reason classification.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub fields: Vec<CardField>,
    #[serde(default)]
    pub history: Vec<StatusEvent>,
}

/// An iteration/sprint, used only to order grouped cycle-time output
/// chronologically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    pub name: String,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Passed,
    Failed,
    #[serde(other)]
    Other,
}

/// One CI job execution, fetched per pipeline per window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: BuildStatus,
    pub step: String,
    #[serde(default)]
    pub commit_id: Option<String>,
}

/// The subset of BuildRecords that represent a deployment to the tracked
/// step. Derived from builds, never fetched directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployEvent {
    pub pipeline: String,
    pub step: String,
    pub status: BuildStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub commit_id: Option<String>,
}

/// Commit metadata resolved through the codebase adapter. `authored_at` is
/// the change's first commit time for lead-time purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub authored_at: DateTime<Utc>,
}

/// One completed change's elapsed time from first commit to deploy finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeSample {
    pub commit_id: String,
    pub first_commit_time: DateTime<Utc>,
    pub deploy_finish_time: DateTime<Utc>,
}

impl LeadTimeSample {
    pub fn lead_time_ms(&self) -> i64 {
        (self.deploy_finish_time - self.first_commit_time).num_milliseconds()
    }
}

/// Half-open time window for one report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    /// Window length in days, the deployment-frequency denominator.
    /// Never returns zero for a non-empty window.
    pub fn days(&self) -> f64 {
        let seconds = (self.end - self.start).num_seconds().max(0);
        seconds as f64 / 86_400.0
    }
}
