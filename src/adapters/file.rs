//! JSON-file-backed adapters.
//!
//! The one provider kind that ships in-tree: normalized records read from a
//! data directory, used by the CLI and integration tests. Wire-API adapters
//! for real trackers and CI systems implement the same traits externally.
//!
//! Layout under the data directory:
//!   cards.json           Vec<Card>
//!   iterations.json      Vec<Iteration>
//!   builds-<pipeline>.json  Vec<BuildRecord>
//!   commits.json         Vec<CommitInfo>
//!
//! A missing list file reads as empty: "no data because nothing happened".

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::error::AdapterError;
use super::traits::{
    BoardSpec, CodebaseClient, IssueTrackerClient, PipelineClient, PipelineSpec, RepoSpec,
};
use super::types::{BuildRecord, Card, CommitInfo, Iteration, ReportWindow};
use crate::cycletime::state::ColumnStateMapping;
use crate::observability::adapter_metrics;

async fn read_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, AdapterError> {
    adapter_metrics().record_request();
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            adapter_metrics().record_error();
            AdapterError::MalformedPayload(format!("{}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => {
            adapter_metrics().record_error();
            Err(AdapterError::from(e))
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileIssueTracker {
    data_dir: PathBuf,
}

impl JsonFileIssueTracker {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl IssueTrackerClient for JsonFileIssueTracker {
    async fn fetch_cards(
        &self,
        _board: &BoardSpec,
        window: &ReportWindow,
        _mapping: &ColumnStateMapping,
    ) -> Result<Vec<Card>, AdapterError> {
        let cards: Vec<Card> = read_list(&self.data_dir.join("cards.json")).await?;
        // A card is active in the window if any of its events fall inside it.
        Ok(cards
            .into_iter()
            .filter(|card| card.history.iter().any(|event| window.contains(event.at)))
            .collect())
    }

    async fn fetch_iterations(&self, _board: &BoardSpec) -> Result<Vec<Iteration>, AdapterError> {
        read_list(&self.data_dir.join("iterations.json")).await
    }
}

#[derive(Debug, Clone)]
pub struct JsonFilePipeline {
    data_dir: PathBuf,
}

impl JsonFilePipeline {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl PipelineClient for JsonFilePipeline {
    async fn fetch_builds(
        &self,
        pipeline: &PipelineSpec,
        window: &ReportWindow,
    ) -> Result<Vec<BuildRecord>, AdapterError> {
        let path = self.data_dir.join(format!("builds-{}.json", pipeline.id));
        let builds: Vec<BuildRecord> = read_list(&path).await?;
        Ok(builds
            .into_iter()
            .filter(|build| window.contains(build.finished_at))
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileCodebase {
    data_dir: PathBuf,
}

impl JsonFileCodebase {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl CodebaseClient for JsonFileCodebase {
    async fn fetch_commit(
        &self,
        commit_id: &str,
        _repo: &RepoSpec,
    ) -> Result<CommitInfo, AdapterError> {
        let commits: Vec<CommitInfo> = read_list(&self.data_dir.join("commits.json")).await?;
        commits
            .into_iter()
            .find(|commit| commit.id == commit_id)
            .ok_or_else(|| AdapterError::NotFound(format!("commit {commit_id}")))
    }
}
