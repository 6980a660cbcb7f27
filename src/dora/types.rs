use serde::{Deserialize, Serialize};

use crate::adapters::types::DeployEvent;

/// One pipeline's deploy events for the report window: the common input
/// shape of the calculators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDeploys {
    pub pipeline: String,
    pub deploys: Vec<DeployEvent>,
}

impl PipelineDeploys {
    pub fn new(pipeline: impl Into<String>, deploys: Vec<DeployEvent>) -> Self {
        Self {
            pipeline: pipeline.into(),
            deploys,
        }
    }

    /// Deploys sorted by finish time, so calculators are invariant to the
    /// order the adapter returned records in.
    pub fn sorted_by_finish(&self) -> Vec<DeployEvent> {
        let mut deploys = self.deploys.clone();
        deploys.sort_by_key(|deploy| deploy.finished_at);
        deploys
    }
}
