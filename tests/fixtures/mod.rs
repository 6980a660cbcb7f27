//! Shared builders for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use delivery_pulse::adapters::types::{
    BuildRecord, BuildStatus, Card, CommitInfo, Iteration, ReportWindow, StatusEvent,
};
use delivery_pulse::cycletime::{ColumnStateMapping, WorkflowState};

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

pub fn window() -> ReportWindow {
    ReportWindow::new(ts(1, 0), ts(15, 0))
}

pub fn event(day: u32, hour: u32, column: &str) -> StatusEvent {
    StatusEvent {
        at: ts(day, hour),
        to_column: column.to_string(),
        to_status: None,
        flagged_as_blocked: false,
    }
}

pub fn blocked_event(day: u32, hour: u32, column: &str) -> StatusEvent {
    StatusEvent {
        flagged_as_blocked: true,
        ..event(day, hour, column)
    }
}

pub fn card(key: &str, iteration: &str, points: f64, history: Vec<StatusEvent>) -> Card {
    Card {
        key: key.to_string(),
        summary: None,
        story_points: Some(points),
        iteration: Some(iteration.to_string()),
        labels: Vec::new(),
        fields: Vec::new(),
        history,
    }
}

pub fn build(
    day: u32,
    hour: u32,
    step: &str,
    status: BuildStatus,
    commit: Option<&str>,
) -> BuildRecord {
    BuildRecord {
        started_at: ts(day, hour),
        finished_at: ts(day, hour),
        status,
        step: step.to_string(),
        commit_id: commit.map(str::to_string),
    }
}

pub fn commit(id: &str, day: u32, hour: u32) -> CommitInfo {
    CommitInfo {
        id: id.to_string(),
        authored_at: ts(day, hour),
    }
}

pub fn iteration(name: &str, day: u32) -> Iteration {
    Iteration {
        name: name.to_string(),
        starts_at: ts(day, 0),
    }
}

pub fn standard_mapping() -> ColumnStateMapping {
    ColumnStateMapping::new()
        .with_column("Todo", WorkflowState::Todo)
        .with_column("Analysis", WorkflowState::Analysis)
        .with_column("In Dev", WorkflowState::InDev)
        .with_column("Waiting For Testing", WorkflowState::WaitingForTesting)
        .with_column("Testing", WorkflowState::Testing)
        .with_column("Review", WorkflowState::Review)
        .with_column("Done", WorkflowState::Done)
}
