//! Change failure rate: failed deploys over all definite deploys.

use serde::{Deserialize, Serialize};

use super::types::PipelineDeploys;
use crate::adapters::types::BuildStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFailureRate {
    pub pipeline: String,
    pub failed: u64,
    pub passed: u64,
    /// failed / (failed + passed); defined as 0 when the pipeline had no
    /// deploys in the window.
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeFailureRate {
    pub per_pipeline: Vec<PipelineFailureRate>,
    pub average_rate: f64,
}

pub fn change_failure_rate(pipelines: &[PipelineDeploys]) -> ChangeFailureRate {
    let mut per_pipeline: Vec<PipelineFailureRate> = pipelines
        .iter()
        .map(|pipeline| {
            let failed = pipeline
                .deploys
                .iter()
                .filter(|d| d.status == BuildStatus::Failed)
                .count() as u64;
            let passed = pipeline
                .deploys
                .iter()
                .filter(|d| d.status == BuildStatus::Passed)
                .count() as u64;
            let total = failed + passed;
            PipelineFailureRate {
                pipeline: pipeline.pipeline.clone(),
                failed,
                passed,
                rate: if total > 0 {
                    failed as f64 / total as f64
                } else {
                    0.0
                },
            }
        })
        .collect();
    per_pipeline.sort_by(|a, b| a.pipeline.cmp(&b.pipeline));

    let average_rate = if per_pipeline.is_empty() {
        0.0
    } else {
        per_pipeline.iter().map(|p| p.rate).sum::<f64>() / per_pipeline.len() as f64
    };

    ChangeFailureRate {
        per_pipeline,
        average_rate,
    }
}
