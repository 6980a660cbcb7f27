//! Lead time for changes: elapsed time from a change's first commit to the
//! finish of the passed deploy that shipped it.
//!
//! This is the one calculator with an I/O boundary: each passed deploy's
//! commit is resolved through the codebase adapter. Commit lookups fan out
//! concurrently; a commit that cannot be resolved is excluded from the
//! average and counted as a diagnostic, never an error for the pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::adapters::error::AdapterError;
use crate::adapters::traits::{CodebaseClient, RepoSpec};
use crate::adapters::types::{BuildStatus, DeployEvent, LeadTimeSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineLeadTime {
    pub pipeline: String,
    pub samples: u64,
    pub unresolved_commits: u64,
    pub total_lead_time_ms: i64,
    pub mean_lead_time_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeForChanges {
    pub per_pipeline: Vec<PipelineLeadTime>,
    pub samples: u64,
    pub unresolved_commits: u64,
    /// Weighted across all samples, not per-pipeline means; 0 when no
    /// deploy's commit could be resolved.
    pub overall_mean_ms: f64,
}

/// Resolve one pipeline's passed deploys into lead-time samples.
///
/// Terminal adapter errors (auth, timeout, network) propagate so the caller
/// can record the pipeline as a failed sub-entity; per-commit misses are
/// absorbed into `unresolved_commits`.
pub async fn pipeline_lead_time(
    pipeline: &str,
    deploys: &[DeployEvent],
    repo: &RepoSpec,
    codebase: Arc<dyn CodebaseClient>,
) -> Result<PipelineLeadTime, AdapterError> {
    let mut unresolved = 0u64;
    let mut lookups: JoinSet<(Result<crate::adapters::types::CommitInfo, AdapterError>, chrono::DateTime<chrono::Utc>, String)> =
        JoinSet::new();

    for deploy in deploys {
        if deploy.status != BuildStatus::Passed {
            continue;
        }
        let Some(commit_id) = deploy.commit_id.clone() else {
            unresolved += 1;
            continue;
        };
        let codebase = Arc::clone(&codebase);
        let repo = repo.clone();
        let finished_at = deploy.finished_at;
        lookups.spawn(async move {
            let result = codebase.fetch_commit(&commit_id, &repo).await;
            (result, finished_at, commit_id)
        });
    }

    let mut samples = 0u64;
    let mut total_ms = 0i64;
    while let Some(joined) = lookups.join_next().await {
        let (result, deploy_finish_time, commit_id) = joined
            .map_err(|e| AdapterError::Network(format!("commit lookup task failed: {e}")))?;
        match result {
            Ok(commit) => {
                let sample = LeadTimeSample {
                    commit_id,
                    first_commit_time: commit.authored_at,
                    deploy_finish_time,
                };
                samples += 1;
                total_ms += sample.lead_time_ms();
            }
            Err(error) if error.is_per_entity() => {
                tracing::debug!(pipeline, commit.id = %commit_id, %error, "Commit not resolvable, excluding from lead time");
                unresolved += 1;
            }
            Err(error) => return Err(error),
        }
    }

    Ok(PipelineLeadTime {
        pipeline: pipeline.to_string(),
        samples,
        unresolved_commits: unresolved,
        total_lead_time_ms: total_ms,
        mean_lead_time_ms: if samples > 0 {
            total_ms as f64 / samples as f64
        } else {
            0.0
        },
    })
}

/// Merge per-pipeline results into the overall metric. Associative and
/// commutative, so sub-fetch completion order never changes the output.
pub fn combine_lead_times(mut per_pipeline: Vec<PipelineLeadTime>) -> LeadTimeForChanges {
    per_pipeline.sort_by(|a, b| a.pipeline.cmp(&b.pipeline));

    let samples: u64 = per_pipeline.iter().map(|p| p.samples).sum();
    let unresolved_commits: u64 = per_pipeline.iter().map(|p| p.unresolved_commits).sum();
    let total_ms: i64 = per_pipeline.iter().map(|p| p.total_lead_time_ms).sum();

    LeadTimeForChanges {
        per_pipeline,
        samples,
        unresolved_commits,
        overall_mean_ms: if samples > 0 {
            total_ms as f64 / samples as f64
        } else {
            0.0
        },
    }
}
