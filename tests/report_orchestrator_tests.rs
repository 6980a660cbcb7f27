//! Tests for the report orchestrator: fan-out, partial failure, timeouts,
//! the polling contract, and cancellation.
//! Testing library/framework: Rust built-in test framework with Tokio async
//! runtime (#[tokio::test]).

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use delivery_pulse::adapters::mocks::{
    InjectedFailure, MockCodebase, MockIssueTracker, MockPipeline,
};
use delivery_pulse::adapters::traits::{BoardSpec, PipelineSpec, RepoSpec};
use delivery_pulse::adapters::types::BuildStatus;
use delivery_pulse::cycletime::ReworkPolicy;
use delivery_pulse::dora::IncidentRule;
use delivery_pulse::report::{
    BoardRequest, CodebaseRequest, Domain, DomainClients, DomainDeadlines, DomainState,
    MetricKind, ReportError, ReportOrchestrator, ReportRequest,
};
use fixtures::{build, card, commit, event, standard_mapping, window};

fn pipeline_spec(id: &str) -> PipelineSpec {
    PipelineSpec {
        id: id.into(),
        deploy_step: "deploy".into(),
    }
}

fn base_request(metrics: &[MetricKind]) -> ReportRequest {
    ReportRequest {
        metrics: metrics.iter().copied().collect(),
        window: window(),
        board: Some(BoardRequest {
            board: BoardSpec {
                board_id: "main".into(),
            },
            mapping: standard_mapping(),
            rework_policy: ReworkPolicy::default(),
        }),
        pipelines: vec![pipeline_spec("api")],
        codebase: Some(CodebaseRequest {
            repo: RepoSpec {
                repo_id: "org/app".into(),
            },
        }),
        deadlines: DomainDeadlines::default(),
        incident_rule: IncidentRule::RunOfFailures,
    }
}

fn clients(
    issue_tracker: MockIssueTracker,
    pipeline: MockPipeline,
    codebase: MockCodebase,
) -> DomainClients {
    DomainClients {
        issue_tracker: Arc::new(issue_tracker),
        pipeline: Arc::new(pipeline),
        codebase: Arc::new(codebase),
    }
}

fn healthy_clients() -> DomainClients {
    let issue_tracker = MockIssueTracker::new().with_cards(vec![card(
        "CARD-1",
        "Sprint 1",
        3.0,
        vec![event(2, 9, "In Dev"), event(3, 9, "Done")],
    )]);
    let pipeline = MockPipeline::new().with_builds(
        "api",
        vec![
            build(1, 10, "deploy", BuildStatus::Passed, Some("c1")),
            build(1, 11, "deploy", BuildStatus::Failed, Some("c2")),
            build(1, 14, "deploy", BuildStatus::Passed, Some("c3")),
        ],
    );
    let codebase = MockCodebase::new()
        .with_commit(commit("c1", 1, 8))
        .with_commit(commit("c3", 1, 9));
    clients(issue_tracker, pipeline, codebase)
}

#[tokio::test]
async fn full_report_happy_path() {
    let orchestrator =
        ReportOrchestrator::start_fetch(base_request(&MetricKind::ALL), healthy_clients())
            .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    assert!(snapshot.complete);
    for domain in [Domain::Board, Domain::Pipeline, Domain::Codebase] {
        assert_eq!(
            snapshot.domain(domain).unwrap().state,
            DomainState::Succeeded,
            "{domain} should succeed"
        );
    }
    assert!(snapshot.report.cycle_time.is_some());
    assert!(snapshot.report.velocity.is_some());
    assert!(snapshot.report.rework.is_some());
    assert!(snapshot.report.deployment_frequency.is_some());
    assert!(snapshot.report.change_failure_rate.is_some());
    assert!(snapshot.report.lead_time_for_changes.is_some());
    assert!(snapshot.report.mean_time_to_recovery.is_some());
}

#[tokio::test]
async fn board_auth_failure_leaves_other_domains_untouched() {
    let issue_tracker = MockIssueTracker::new().failing_with_auth();
    let pipeline = MockPipeline::new().with_builds(
        "api",
        vec![build(1, 10, "deploy", BuildStatus::Passed, None)],
    );
    let orchestrator = ReportOrchestrator::start_fetch(
        base_request(&[MetricKind::CycleTime, MetricKind::DeploymentFrequency]),
        clients(issue_tracker, pipeline, MockCodebase::new()),
    )
    .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    assert!(snapshot.complete);
    assert!(matches!(
        snapshot.domain(Domain::Board).unwrap().state,
        DomainState::Failed { .. }
    ));
    assert_eq!(
        snapshot.domain(Domain::Pipeline).unwrap().state,
        DomainState::Succeeded
    );
    // The failed domain's section stays null; the healthy one is populated.
    assert!(snapshot.report.cycle_time.is_none());
    assert!(snapshot.report.deployment_frequency.is_some());
}

#[tokio::test(start_paused = true)]
async fn slow_domain_times_out_and_is_distinguished_from_failure() {
    let issue_tracker = MockIssueTracker::new().with_delay(Duration::from_secs(300));
    let pipeline = MockPipeline::new().with_builds(
        "api",
        vec![build(1, 10, "deploy", BuildStatus::Passed, None)],
    );
    let mut request = base_request(&[MetricKind::CycleTime, MetricKind::DeploymentFrequency]);
    request.deadlines.board = Duration::from_secs(2);

    let orchestrator = ReportOrchestrator::start_fetch(
        request,
        clients(issue_tracker, pipeline, MockCodebase::new()),
    )
    .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    assert!(snapshot.complete);
    assert_eq!(
        snapshot.domain(Domain::Board).unwrap().state,
        DomainState::TimedOut { deadline_ms: 2000 }
    );
    assert_eq!(
        snapshot.domain(Domain::Pipeline).unwrap().state,
        DomainState::Succeeded
    );
}

#[tokio::test]
async fn mixed_pipeline_outcomes_produce_partial_failure() {
    let pipeline = MockPipeline::new()
        .with_builds(
            "api",
            vec![
                build(1, 10, "deploy", BuildStatus::Passed, None),
                build(2, 10, "deploy", BuildStatus::Passed, None),
            ],
        )
        .failing_pipeline("web", InjectedFailure::Network);
    let mut request = base_request(&[MetricKind::DeploymentFrequency]);
    request.pipelines = vec![pipeline_spec("api"), pipeline_spec("web")];

    let orchestrator = ReportOrchestrator::start_fetch(
        request,
        clients(MockIssueTracker::new(), pipeline, MockCodebase::new()),
    )
    .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    match &snapshot.domain(Domain::Pipeline).unwrap().state {
        DomainState::PartialFailed { failed } => {
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].entity, "web");
            assert!(!failed[0].timed_out);
        }
        other => panic!("expected PartialFailed, got {other:?}"),
    }
    // The section is populated from the successful subset.
    let frequency = snapshot.report.deployment_frequency.unwrap();
    assert_eq!(frequency.total_deploys, 2);
    assert_eq!(frequency.per_pipeline.len(), 1);
}

#[tokio::test]
async fn every_pipeline_failing_fails_the_domain() {
    let pipeline = MockPipeline::new().failing_with(InjectedFailure::Auth);
    let orchestrator = ReportOrchestrator::start_fetch(
        base_request(&[MetricKind::ChangeFailureRate]),
        clients(MockIssueTracker::new(), pipeline, MockCodebase::new()),
    )
    .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    assert!(matches!(
        snapshot.domain(Domain::Pipeline).unwrap().state,
        DomainState::Failed { .. }
    ));
    assert!(snapshot.report.change_failure_rate.is_none());
}

#[tokio::test]
async fn polling_is_idempotent_and_never_regresses() {
    let orchestrator =
        ReportOrchestrator::start_fetch(base_request(&MetricKind::ALL), healthy_clients())
            .unwrap();
    let settled = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;
    assert!(settled.complete);

    let first = orchestrator.poll();
    let second = orchestrator.poll();
    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);

    for status in &second.domains {
        assert_ne!(
            status.state,
            DomainState::Fetching,
            "{} regressed to Fetching after completing",
            status.domain
        );
    }
}

#[tokio::test]
async fn concurrent_pollers_observe_monotonic_completion() {
    let orchestrator = Arc::new(
        ReportOrchestrator::start_fetch(base_request(&MetricKind::ALL), healthy_clients())
            .unwrap(),
    );

    let pollers: Vec<_> = (0..2)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let mut last_complete = 0usize;
                loop {
                    let snapshot = orchestrator.poll();
                    let complete = snapshot
                        .domains
                        .iter()
                        .filter(|status| status.complete)
                        .count();
                    assert!(
                        complete >= last_complete,
                        "domain completion regressed from {last_complete} to {complete}"
                    );
                    last_complete = complete;
                    if snapshot.complete {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
        })
        .collect();

    for poller in futures::future::join_all(pollers).await {
        poller.unwrap();
    }
}

#[tokio::test]
async fn unneeded_domains_never_leave_not_started() {
    let orchestrator = ReportOrchestrator::start_fetch(
        base_request(&[MetricKind::MeanTimeToRecovery]),
        healthy_clients(),
    )
    .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    assert!(snapshot.complete);
    assert_eq!(
        snapshot.domain(Domain::Board).unwrap().state,
        DomainState::NotStarted
    );
    assert_eq!(
        snapshot.domain(Domain::Codebase).unwrap().state,
        DomainState::NotStarted
    );
    assert!(snapshot.report.cycle_time.is_none());
    assert!(snapshot.report.mean_time_to_recovery.is_some());
}

#[tokio::test]
async fn missing_configuration_fails_before_any_fetch() {
    let mut request = base_request(&[MetricKind::CycleTime]);
    request.board = None;
    let result = ReportOrchestrator::start_fetch(request, healthy_clients());
    assert!(matches!(
        result.err(),
        Some(ReportError::ConfigurationMissing {
            metric: MetricKind::CycleTime,
            section: "board",
        })
    ));

    // Lead time needs pipelines too, not just the codebase section.
    let mut request = base_request(&[MetricKind::LeadTimeForChanges]);
    request.pipelines.clear();
    let result = ReportOrchestrator::start_fetch(request, healthy_clients());
    assert!(matches!(
        result.err(),
        Some(ReportError::ConfigurationMissing {
            metric: MetricKind::LeadTimeForChanges,
            section: "pipelines",
        })
    ));
}

#[tokio::test]
async fn cancel_keeps_finished_sections_and_leaves_the_rest_null() {
    let issue_tracker = MockIssueTracker::new().with_delay(Duration::from_secs(60));
    let pipeline = MockPipeline::new().with_builds(
        "api",
        vec![build(1, 10, "deploy", BuildStatus::Passed, None)],
    );
    let orchestrator = ReportOrchestrator::start_fetch(
        base_request(&[MetricKind::CycleTime, MetricKind::DeploymentFrequency]),
        clients(issue_tracker, pipeline, MockCodebase::new()),
    )
    .unwrap();

    // Wait for the fast pipeline domain to settle, then cancel the rest.
    for _ in 0..200 {
        if orchestrator
            .poll()
            .domain(Domain::Pipeline)
            .map(|status| status.complete)
            .unwrap_or(false)
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    orchestrator.cancel();

    let snapshot = orchestrator.poll();
    assert!(snapshot.cancelled);
    assert_eq!(
        snapshot.domain(Domain::Pipeline).unwrap().state,
        DomainState::Succeeded
    );
    assert!(snapshot.report.deployment_frequency.is_some());
    // The cancelled board fetch wrote nothing.
    assert_eq!(
        snapshot.domain(Domain::Board).unwrap().state,
        DomainState::Fetching
    );
    assert!(snapshot.report.cycle_time.is_none());
}

#[tokio::test]
async fn unresolved_commits_degrade_lead_time_without_failing_the_domain() {
    let pipeline = MockPipeline::new().with_builds(
        "api",
        vec![
            build(1, 10, "deploy", BuildStatus::Passed, Some("c1")),
            build(1, 14, "deploy", BuildStatus::Passed, Some("ghost")),
        ],
    );
    let codebase = MockCodebase::new().with_commit(commit("c1", 1, 8));
    let orchestrator = ReportOrchestrator::start_fetch(
        base_request(&[MetricKind::LeadTimeForChanges]),
        clients(MockIssueTracker::new(), pipeline, codebase),
    )
    .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    assert_eq!(
        snapshot.domain(Domain::Codebase).unwrap().state,
        DomainState::Succeeded
    );
    let lead_time = snapshot.report.lead_time_for_changes.unwrap();
    assert_eq!(lead_time.samples, 1);
    assert_eq!(lead_time.unresolved_commits, 1);
}

#[tokio::test]
async fn codebase_auth_failure_fails_only_the_codebase_domain() {
    let pipeline = MockPipeline::new().with_builds(
        "api",
        vec![build(1, 10, "deploy", BuildStatus::Passed, Some("c1"))],
    );
    let codebase = MockCodebase::new().failing_with_auth();
    let orchestrator = ReportOrchestrator::start_fetch(
        base_request(&[MetricKind::DeploymentFrequency, MetricKind::LeadTimeForChanges]),
        clients(MockIssueTracker::new(), pipeline, codebase),
    )
    .unwrap();
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(5))
        .await;

    assert!(matches!(
        snapshot.domain(Domain::Codebase).unwrap().state,
        DomainState::Failed { .. }
    ));
    assert_eq!(
        snapshot.domain(Domain::Pipeline).unwrap().state,
        DomainState::Succeeded
    );
    assert!(snapshot.report.lead_time_for_changes.is_none());
    assert!(snapshot.report.deployment_frequency.is_some());
}
