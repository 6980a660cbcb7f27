//! Deployment frequency: passed deploys per pipeline per day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::PipelineDeploys;
use crate::adapters::types::{BuildStatus, ReportWindow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDeployFrequency {
    pub pipeline: String,
    pub deploys: u64,
    /// Deploys per day over the window length.
    pub per_day: f64,
    pub by_day: BTreeMap<NaiveDate, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentFrequency {
    pub per_pipeline: Vec<PipelineDeployFrequency>,
    pub total_deploys: u64,
    /// Average of the per-pipeline daily rates; exactly 0 when there are no
    /// pipelines or no deploys, never NaN.
    pub average_per_day: f64,
}

pub fn deployment_frequency(
    pipelines: &[PipelineDeploys],
    window: &ReportWindow,
) -> DeploymentFrequency {
    let days = window.days();
    let mut per_pipeline: Vec<PipelineDeployFrequency> = pipelines
        .iter()
        .map(|pipeline| {
            let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
            for deploy in &pipeline.deploys {
                if deploy.status == BuildStatus::Passed {
                    *by_day.entry(deploy.finished_at.date_naive()).or_insert(0) += 1;
                }
            }
            let deploys: u64 = by_day.values().sum();
            PipelineDeployFrequency {
                pipeline: pipeline.pipeline.clone(),
                deploys,
                per_day: if days > 0.0 { deploys as f64 / days } else { 0.0 },
                by_day,
            }
        })
        .collect();
    per_pipeline.sort_by(|a, b| a.pipeline.cmp(&b.pipeline));

    let total_deploys = per_pipeline.iter().map(|p| p.deploys).sum();
    let average_per_day = if per_pipeline.is_empty() {
        0.0
    } else {
        per_pipeline.iter().map(|p| p.per_day).sum::<f64>() / per_pipeline.len() as f64
    };

    DeploymentFrequency {
        per_pipeline,
        total_deploys,
        average_per_day,
    }
}
