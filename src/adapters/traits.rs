//! Client contracts for the three data domains.
//!
//! Trait-based abstractions in the dependency-injection style used across
//! the codebase: the orchestrator holds `Arc<dyn ...>` handles and never
//! knows which provider sits behind them.

use async_trait::async_trait;

use super::error::AdapterError;
use super::types::{
    BuildRecord, BuildStatus, Card, CommitInfo, DeployEvent, Iteration, ReportWindow,
};
use crate::cycletime::state::ColumnStateMapping;

/// Which board to read cards from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSpec {
    pub board_id: String,
}

/// One pipeline plus the build step that counts as a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub id: String,
    pub deploy_step: String,
}

/// Which repository to resolve commits against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub repo_id: String,
}

/// Board domain: cards with status histories, plus iteration ordering data.
#[async_trait]
pub trait IssueTrackerClient: Send + Sync {
    /// Fetch the cards active in `window`. The column mapping is passed so
    /// an adapter may prune columns it knows resolve to the ignored state.
    async fn fetch_cards(
        &self,
        board: &BoardSpec,
        window: &ReportWindow,
        mapping: &ColumnStateMapping,
    ) -> Result<Vec<Card>, AdapterError>;

    /// Iterations are used only to order grouped cycle-time output.
    async fn fetch_iterations(&self, board: &BoardSpec) -> Result<Vec<Iteration>, AdapterError>;
}

/// Pipeline domain: raw build records per pipeline per window.
#[async_trait]
pub trait PipelineClient: Send + Sync {
    async fn fetch_builds(
        &self,
        pipeline: &PipelineSpec,
        window: &ReportWindow,
    ) -> Result<Vec<BuildRecord>, AdapterError>;

    /// Derive the deploy events from a build list: builds on the configured
    /// deploy step with a definite pass/fail outcome.
    fn deploys(&self, pipeline: &PipelineSpec, builds: &[BuildRecord]) -> Vec<DeployEvent> {
        builds
            .iter()
            .filter(|b| b.step == pipeline.deploy_step && b.status != BuildStatus::Other)
            .map(|b| DeployEvent {
                pipeline: pipeline.id.clone(),
                step: b.step.clone(),
                status: b.status,
                started_at: b.started_at,
                finished_at: b.finished_at,
                commit_id: b.commit_id.clone(),
            })
            .collect()
    }
}

/// Codebase domain: commit lookups for lead-time resolution.
#[async_trait]
pub trait CodebaseClient: Send + Sync {
    async fn fetch_commit(
        &self,
        commit_id: &str,
        repo: &RepoSpec,
    ) -> Result<CommitInfo, AdapterError>;
}
