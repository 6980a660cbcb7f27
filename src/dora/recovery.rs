//! Mean time to recovery: elapsed time from a failed deploy to the next
//! subsequent passed deploy on the same pipeline.

use serde::{Deserialize, Serialize};

use super::types::PipelineDeploys;
use crate::adapters::types::BuildStatus;

/// Incident boundary when several failures occur before the next success.
///
/// `RunOfFailures` (the default) treats a run of consecutive failures as one
/// incident, clocked from the first failure of the run to the next pass.
/// `PerFailure` clocks every failure to the same next pass as its own
/// incident. The rule is part of the report configuration so the choice is
/// visible to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentRule {
    #[default]
    RunOfFailures,
    PerFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecovery {
    pub pipeline: String,
    pub incidents: u64,
    pub total_recovery_ms: i64,
    pub mean_recovery_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanTimeToRecovery {
    pub per_pipeline: Vec<PipelineRecovery>,
    pub incidents: u64,
    /// Weighted by incident count, so pipelines without failures do not
    /// distort the cross-pipeline mean. Exactly 0 when nothing recovered.
    pub mean_recovery_ms: f64,
    pub rule: IncidentRule,
}

pub fn mean_time_to_recovery(
    pipelines: &[PipelineDeploys],
    rule: IncidentRule,
) -> MeanTimeToRecovery {
    let mut per_pipeline: Vec<PipelineRecovery> = pipelines
        .iter()
        .map(|pipeline| recover_pipeline(pipeline, rule))
        .collect();
    per_pipeline.sort_by(|a, b| a.pipeline.cmp(&b.pipeline));

    let incidents: u64 = per_pipeline.iter().map(|p| p.incidents).sum();
    let total_ms: i64 = per_pipeline.iter().map(|p| p.total_recovery_ms).sum();

    MeanTimeToRecovery {
        per_pipeline,
        incidents,
        mean_recovery_ms: if incidents > 0 {
            total_ms as f64 / incidents as f64
        } else {
            0.0
        },
        rule,
    }
}

fn recover_pipeline(pipeline: &PipelineDeploys, rule: IncidentRule) -> PipelineRecovery {
    let deploys = pipeline.sorted_by_finish();

    let mut incidents = 0u64;
    let mut total_recovery_ms = 0i64;
    // Failure finish times awaiting the next pass. Under RunOfFailures only
    // the first failure of a run is kept.
    let mut pending: Vec<chrono::DateTime<chrono::Utc>> = Vec::new();

    for deploy in &deploys {
        match deploy.status {
            BuildStatus::Failed => {
                if rule == IncidentRule::PerFailure || pending.is_empty() {
                    pending.push(deploy.finished_at);
                }
            }
            BuildStatus::Passed => {
                for failed_at in pending.drain(..) {
                    incidents += 1;
                    total_recovery_ms += (deploy.finished_at - failed_at).num_milliseconds();
                }
            }
            BuildStatus::Other => {}
        }
    }
    // Failures with no pass before the window end are not recovered
    // incidents; they drop out of the mean.

    PipelineRecovery {
        pipeline: pipeline.pipeline.clone(),
        incidents,
        total_recovery_ms,
        mean_recovery_ms: if incidents > 0 {
            total_recovery_ms as f64 / incidents as f64
        } else {
            0.0
        },
    }
}
