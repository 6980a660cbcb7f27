//! Programmable in-memory clients for tests.
//!
//! Hand-rolled doubles with per-call failure and delay injection, used by
//! the orchestrator tests to drive every domain outcome without touching a
//! real provider.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::error::AdapterError;
use super::traits::{
    BoardSpec, CodebaseClient, IssueTrackerClient, PipelineClient, PipelineSpec, RepoSpec,
};
use super::types::{BuildRecord, Card, CommitInfo, Iteration, ReportWindow};
use crate::cycletime::state::ColumnStateMapping;

/// Failure to raise instead of returning data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Auth,
    Timeout,
    Network,
}

impl InjectedFailure {
    fn to_error(self, operation: &str) -> AdapterError {
        match self {
            InjectedFailure::Auth => AdapterError::Auth("injected authorization failure".into()),
            InjectedFailure::Timeout => AdapterError::Timeout {
                operation: operation.to_string(),
                duration_ms: 0,
            },
            InjectedFailure::Network => AdapterError::Network("injected network failure".into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockIssueTracker {
    cards: Vec<Card>,
    iterations: Vec<Iteration>,
    failure: Option<InjectedFailure>,
    delay: Option<Duration>,
}

impl MockIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    pub fn with_iterations(mut self, iterations: Vec<Iteration>) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn failing_with(mut self, failure: InjectedFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn failing_with_auth(self) -> Self {
        self.failing_with(InjectedFailure::Auth)
    }

    /// Delay every call, for deadline tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn gate(&self, operation: &str) -> Result<(), AdapterError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(failure) => Err(failure.to_error(operation)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IssueTrackerClient for MockIssueTracker {
    async fn fetch_cards(
        &self,
        _board: &BoardSpec,
        _window: &ReportWindow,
        _mapping: &ColumnStateMapping,
    ) -> Result<Vec<Card>, AdapterError> {
        self.gate("fetch_cards").await?;
        Ok(self.cards.clone())
    }

    async fn fetch_iterations(&self, _board: &BoardSpec) -> Result<Vec<Iteration>, AdapterError> {
        self.gate("fetch_iterations").await?;
        Ok(self.iterations.clone())
    }
}

#[derive(Debug, Default)]
pub struct MockPipeline {
    builds: HashMap<String, Vec<BuildRecord>>,
    failing_pipelines: HashMap<String, InjectedFailure>,
    failure: Option<InjectedFailure>,
    delay: Option<Duration>,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builds(mut self, pipeline: &str, builds: Vec<BuildRecord>) -> Self {
        self.builds.insert(pipeline.to_string(), builds);
        self
    }

    /// Fail only the named pipeline's sub-fetch, leaving the others healthy.
    pub fn failing_pipeline(mut self, pipeline: &str, failure: InjectedFailure) -> Self {
        self.failing_pipelines
            .insert(pipeline.to_string(), failure);
        self
    }

    pub fn failing_with(mut self, failure: InjectedFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PipelineClient for MockPipeline {
    async fn fetch_builds(
        &self,
        pipeline: &PipelineSpec,
        _window: &ReportWindow,
    ) -> Result<Vec<BuildRecord>, AdapterError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.failure {
            return Err(failure.to_error("fetch_builds"));
        }
        if let Some(failure) = self.failing_pipelines.get(&pipeline.id) {
            return Err(failure.to_error("fetch_builds"));
        }
        Ok(self.builds.get(&pipeline.id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct MockCodebase {
    commits: HashMap<String, CommitInfo>,
    failure: Option<InjectedFailure>,
    delay: Option<Duration>,
}

impl MockCodebase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commit(mut self, commit: CommitInfo) -> Self {
        self.commits.insert(commit.id.clone(), commit);
        self
    }

    pub fn failing_with(mut self, failure: InjectedFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn failing_with_auth(self) -> Self {
        self.failing_with(InjectedFailure::Auth)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl CodebaseClient for MockCodebase {
    async fn fetch_commit(
        &self,
        commit_id: &str,
        _repo: &RepoSpec,
    ) -> Result<CommitInfo, AdapterError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.failure {
            return Err(failure.to_error("fetch_commit"));
        }
        self.commits
            .get(commit_id)
            .cloned()
            .ok_or_else(|| AdapterError::NotFound(format!("commit {commit_id}")))
    }
}
