//! The merged report value and its per-domain completion/error envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::types::ReportWindow;
use crate::cycletime::{CycleTimeSummary, ReworkSummary, VelocitySummary};
use crate::dora::{
    ChangeFailureRate, DeploymentFrequency, LeadTimeForChanges, MeanTimeToRecovery,
};

/// One of the three independent data sources feeding a report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Board,
    Pipeline,
    Codebase,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Board => "board",
            Domain::Pipeline => "pipeline",
            Domain::Codebase => "codebase",
        };
        write!(f, "{name}")
    }
}

/// The metrics a caller can request. Each routes to exactly one domain;
/// a domain not needed by any requested metric is never fetched.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    CycleTime,
    Velocity,
    Rework,
    DeploymentFrequency,
    ChangeFailureRate,
    LeadTimeForChanges,
    MeanTimeToRecovery,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::CycleTime,
        MetricKind::Velocity,
        MetricKind::Rework,
        MetricKind::DeploymentFrequency,
        MetricKind::ChangeFailureRate,
        MetricKind::LeadTimeForChanges,
        MetricKind::MeanTimeToRecovery,
    ];

    pub fn domain(self) -> Domain {
        match self {
            MetricKind::CycleTime | MetricKind::Velocity | MetricKind::Rework => Domain::Board,
            MetricKind::DeploymentFrequency
            | MetricKind::ChangeFailureRate
            | MetricKind::MeanTimeToRecovery => Domain::Pipeline,
            MetricKind::LeadTimeForChanges => Domain::Codebase,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::CycleTime => "cycle-time",
            MetricKind::Velocity => "velocity",
            MetricKind::Rework => "rework",
            MetricKind::DeploymentFrequency => "deployment-frequency",
            MetricKind::ChangeFailureRate => "change-failure-rate",
            MetricKind::LeadTimeForChanges => "lead-time-for-changes",
            MetricKind::MeanTimeToRecovery => "mean-time-to-recovery",
        };
        write!(f, "{name}")
    }
}

/// One sub-entity (pipeline) whose fetch failed inside a partially failed
/// domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubEntityFailure {
    pub entity: String,
    pub error: String,
    pub timed_out: bool,
}

/// Per-domain fetch state machine:
/// `NotStarted → Fetching → {Succeeded, PartialFailed, Failed, TimedOut}`.
/// Terminal states are sticky; a domain never reverts to `Fetching`, which
/// is what makes repeated polls monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DomainState {
    NotStarted,
    Fetching,
    Succeeded,
    /// Some sub-fetches succeeded; the domain's sections are populated from
    /// the successful subset and the failures are listed here.
    PartialFailed { failed: Vec<SubEntityFailure> },
    Failed { error: String },
    /// Distinguished from `Failed` so a caller can retry only the
    /// timed-out domain.
    TimedOut { deadline_ms: u64 },
}

impl DomainState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DomainState::NotStarted | DomainState::Fetching)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStatus {
    pub domain: Domain,
    pub state: DomainState,
    pub complete: bool,
}

/// The merged report. One section per metric, each independently nullable;
/// every domain writes only its own sections, so a degraded domain leaves
/// the others untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub window: ReportWindow,
    pub cycle_time: Option<CycleTimeSummary>,
    pub velocity: Option<VelocitySummary>,
    pub rework: Option<ReworkSummary>,
    pub deployment_frequency: Option<DeploymentFrequency>,
    pub change_failure_rate: Option<ChangeFailureRate>,
    pub lead_time_for_changes: Option<LeadTimeForChanges>,
    pub mean_time_to_recovery: Option<MeanTimeToRecovery>,
}

impl Report {
    pub fn new(window: ReportWindow) -> Self {
        Self {
            window,
            cycle_time: None,
            velocity: None,
            rework: None,
            deployment_frequency: None,
            change_failure_rate: None,
            lead_time_for_changes: None,
            mean_time_to_recovery: None,
        }
    }
}

/// What one poll returns: the report as currently known, plus the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub report: Report,
    pub domains: Vec<DomainStatus>,
    pub cancelled: bool,
    /// True once every requested domain reached a terminal state.
    pub complete: bool,
}

impl ReportSnapshot {
    pub fn domain(&self, domain: Domain) -> Option<&DomainStatus> {
        self.domains.iter().find(|status| status.domain == domain)
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    /// A requested metric's configuration section is absent. Fails the whole
    /// request synchronously, before any fetch starts: no partial result
    /// would be meaningful.
    #[error("metric {metric} requires the {section} configuration section")]
    ConfigurationMissing {
        metric: MetricKind,
        section: &'static str,
    },
}
