//! Provider dispatch: a closed enumeration of supported external-system
//! kinds mapped to constructors.
//!
//! Replaces string-typed "instantiate the right adapter" reflection with a
//! tagged-variant lookup: adding a provider means adding an enum variant and
//! a match arm, and the compiler points at every site that must handle it.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::file::{JsonFileCodebase, JsonFileIssueTracker, JsonFilePipeline};
use super::traits::{CodebaseClient, IssueTrackerClient, PipelineClient};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueTrackerKind {
    #[default]
    JsonFile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    #[default]
    JsonFile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodebaseKind {
    #[default]
    JsonFile,
}

pub fn issue_tracker_client(
    kind: IssueTrackerKind,
    data_dir: &Path,
) -> Arc<dyn IssueTrackerClient> {
    match kind {
        IssueTrackerKind::JsonFile => Arc::new(JsonFileIssueTracker::new(data_dir)),
    }
}

pub fn pipeline_client(kind: PipelineKind, data_dir: &Path) -> Arc<dyn PipelineClient> {
    match kind {
        PipelineKind::JsonFile => Arc::new(JsonFilePipeline::new(data_dir)),
    }
}

pub fn codebase_client(kind: CodebaseKind, data_dir: &Path) -> Arc<dyn CodebaseClient> {
    match kind {
        CodebaseKind::JsonFile => Arc::new(JsonFileCodebase::new(data_dir)),
    }
}
