//! The top-level report coordinator.
//!
//! Dispatches the three domain fetches concurrently, feeds results into the
//! aggregators, merges outputs into one report value, and tracks per-domain
//! completion state behind a non-blocking poll. Domains fail independently:
//! an auth failure or deadline on one leaves the others untouched, and the
//! caller always gets a report value back.
//!
//! The orchestrator never retries a Failed or TimedOut domain on its own -
//! retrying automatically could re-trigger the same authorization or
//! rate-limit failure, so retry is an explicit caller action.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;

use super::build_cache::BuildCache;
use super::types::{
    Domain, DomainState, DomainStatus, MetricKind, Report, ReportError, ReportSnapshot,
    SubEntityFailure,
};
use crate::adapters::error::AdapterError;
use crate::adapters::traits::{
    BoardSpec, CodebaseClient, IssueTrackerClient, PipelineClient, PipelineSpec, RepoSpec,
};
use crate::adapters::types::ReportWindow;
use crate::cycletime::{
    BoardMetrics, ColumnStateMapping, CycleTimeAggregator, CycleTimeEngine, ReworkPolicy,
};
use crate::dora::{
    change_failure_rate, combine_lead_times, deployment_frequency, mean_time_to_recovery,
    pipeline_lead_time, IncidentRule, PipelineDeploys, PipelineLeadTime,
};
use crate::observability::adapter_metrics;
use crate::telemetry::generate_correlation_id;

/// The adapter clients one report request runs against.
#[derive(Clone)]
pub struct DomainClients {
    pub issue_tracker: Arc<dyn IssueTrackerClient>,
    pub pipeline: Arc<dyn PipelineClient>,
    pub codebase: Arc<dyn CodebaseClient>,
}

/// Independent per-domain fetch deadlines.
#[derive(Debug, Clone)]
pub struct DomainDeadlines {
    pub board: Duration,
    pub pipeline: Duration,
    pub codebase: Duration,
}

impl Default for DomainDeadlines {
    fn default() -> Self {
        Self {
            board: Duration::from_secs(30),
            pipeline: Duration::from_secs(30),
            codebase: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct BoardRequest {
    pub board: BoardSpec,
    pub mapping: ColumnStateMapping,
    pub rework_policy: ReworkPolicy,
}

#[derive(Debug, Clone)]
pub struct CodebaseRequest {
    pub repo: RepoSpec,
}

/// Everything one report run needs, threaded in as values so the same
/// engines can serve concurrent requests with different settings.
#[derive(Clone)]
pub struct ReportRequest {
    pub metrics: BTreeSet<MetricKind>,
    pub window: ReportWindow,
    pub board: Option<BoardRequest>,
    pub pipelines: Vec<PipelineSpec>,
    pub codebase: Option<CodebaseRequest>,
    pub deadlines: DomainDeadlines,
    pub incident_rule: IncidentRule,
}

struct SharedState {
    report: Report,
    domains: BTreeMap<Domain, DomainState>,
    cancelled: bool,
}

pub struct ReportOrchestrator {
    shared: Arc<Mutex<SharedState>>,
    requested: BTreeSet<Domain>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    correlation_id: String,
}

impl ReportOrchestrator {
    /// Validate the request and dispatch the domain fetches.
    ///
    /// Fails synchronously with `ConfigurationMissing` when a requested
    /// metric's configuration section is absent: no fetch is started in
    /// that case. Must be called from within a tokio runtime.
    pub fn start_fetch(
        request: ReportRequest,
        clients: DomainClients,
    ) -> Result<Self, ReportError> {
        validate(&request)?;

        let requested: BTreeSet<Domain> =
            request.metrics.iter().map(|metric| metric.domain()).collect();

        let mut domains = BTreeMap::new();
        for domain in [Domain::Board, Domain::Pipeline, Domain::Codebase] {
            let state = if requested.contains(&domain) {
                DomainState::Fetching
            } else {
                DomainState::NotStarted
            };
            domains.insert(domain, state);
        }

        let shared = Arc::new(Mutex::new(SharedState {
            report: Report::new(request.window),
            domains,
            cancelled: false,
        }));
        let correlation_id = generate_correlation_id();
        let cache = BuildCache::new();
        let mut tasks = Vec::new();

        tracing::info!(
            correlation.id = %correlation_id,
            metrics = ?request.metrics,
            domains = ?requested,
            "Report fetch dispatched"
        );

        if requested.contains(&Domain::Board) {
            if let Some(board) = request.board.clone() {
                tasks.push(spawn_board_domain(
                    board,
                    &request,
                    &clients,
                    &shared,
                    &correlation_id,
                ));
            }
        }
        if requested.contains(&Domain::Pipeline) {
            tasks.push(spawn_pipeline_domain(
                &request,
                &clients,
                &shared,
                &cache,
                &correlation_id,
            ));
        }
        if requested.contains(&Domain::Codebase) {
            if let Some(codebase) = request.codebase.clone() {
                tasks.push(spawn_codebase_domain(
                    codebase.repo,
                    &request,
                    &clients,
                    &shared,
                    &cache,
                    &correlation_id,
                ));
            }
        }

        Ok(Self {
            shared,
            requested,
            tasks: Mutex::new(tasks),
            correlation_id,
        })
    }

    /// Current merged report plus per-domain statuses. Idempotent and
    /// non-blocking: returns immediately with whatever is known, and a
    /// domain that has reached a terminal state never regresses.
    pub fn poll(&self) -> ReportSnapshot {
        let guard = lock(&self.shared);
        let domains: Vec<DomainStatus> = guard
            .domains
            .iter()
            .map(|(domain, state)| DomainStatus {
                domain: *domain,
                state: state.clone(),
                complete: state.is_terminal(),
            })
            .collect();
        let complete = self
            .requested
            .iter()
            .all(|domain| guard.domains[domain].is_terminal());

        ReportSnapshot {
            report: guard.report.clone(),
            domains,
            cancelled: guard.cancelled,
            complete,
        }
    }

    /// Stop further adapter calls. Sections already written stay; sections
    /// not yet complete simply remain null.
    pub fn cancel(&self) {
        {
            let mut guard = lock(&self.shared);
            guard.cancelled = true;
        }
        let mut tasks = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for task in tasks.drain(..) {
            task.abort();
        }
        tracing::info!(correlation.id = %self.correlation_id, "Report fetch cancelled");
    }

    /// Poll until every requested domain is terminal (or the run was
    /// cancelled). Convenience loop for callers without their own scheduler.
    pub async fn run_to_completion(&self, poll_interval: Duration) -> ReportSnapshot {
        loop {
            let snapshot = self.poll();
            if snapshot.complete || snapshot.cancelled {
                return snapshot;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

fn validate(request: &ReportRequest) -> Result<(), ReportError> {
    for metric in &request.metrics {
        match metric.domain() {
            Domain::Board => {
                if request.board.is_none() {
                    return Err(ReportError::ConfigurationMissing {
                        metric: *metric,
                        section: "board",
                    });
                }
            }
            Domain::Pipeline => {
                if request.pipelines.is_empty() {
                    return Err(ReportError::ConfigurationMissing {
                        metric: *metric,
                        section: "pipelines",
                    });
                }
            }
            Domain::Codebase => {
                if request.codebase.is_none() {
                    return Err(ReportError::ConfigurationMissing {
                        metric: *metric,
                        section: "codebase",
                    });
                }
                // Lead time reads builds too, so it also needs pipelines.
                if request.pipelines.is_empty() {
                    return Err(ReportError::ConfigurationMissing {
                        metric: *metric,
                        section: "pipelines",
                    });
                }
            }
        }
    }
    Ok(())
}

fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Apply a domain's terminal outcome. Terminal states are sticky: once a
/// domain has settled, later writes are refused, which is what makes the
/// polling contract monotonic. The lock is only ever held synchronously.
fn complete_domain<F>(shared: &Arc<Mutex<SharedState>>, domain: Domain, state: DomainState, write: F)
where
    F: FnOnce(&mut Report),
{
    let mut guard = lock(shared);
    if guard
        .domains
        .get(&domain)
        .map(DomainState::is_terminal)
        .unwrap_or(false)
    {
        return;
    }
    write(&mut guard.report);
    tracing::info!(domain = %domain, state = ?state, "Domain reached terminal state");
    guard.domains.insert(domain, state);
}

fn terminal_state_for(error: &AdapterError, deadline: Duration) -> DomainState {
    if error.is_timeout() {
        DomainState::TimedOut {
            deadline_ms: deadline.as_millis() as u64,
        }
    } else {
        DomainState::Failed {
            error: error.to_string(),
        }
    }
}

/// Split sub-fetch outcomes into successes and the envelope's failure list,
/// both in deterministic entity order.
fn split_outcomes<T>(
    mut results: Vec<(String, Result<T, (String, bool)>)>,
) -> (Vec<T>, Vec<SubEntityFailure>) {
    results.sort_by(|a, b| a.0.cmp(&b.0));
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for (entity, result) in results {
        match result {
            Ok(value) => successes.push(value),
            Err((error, timed_out)) => failures.push(SubEntityFailure {
                entity,
                error,
                timed_out,
            }),
        }
    }
    (successes, failures)
}

fn spawn_board_domain(
    board: BoardRequest,
    request: &ReportRequest,
    clients: &DomainClients,
    shared: &Arc<Mutex<SharedState>>,
    correlation_id: &str,
) -> JoinHandle<()> {
    let client = Arc::clone(&clients.issue_tracker);
    let window = request.window;
    let metrics = request.metrics.clone();
    let deadline = request.deadlines.board;
    let shared = Arc::clone(shared);
    let correlation_id = correlation_id.to_string();

    tokio::spawn(async move {
        tracing::info!(domain = %Domain::Board, correlation.id = %correlation_id, "Domain fetch started");
        match timeout(deadline, fetch_board(client, board, window)).await {
            Err(_) => {
                adapter_metrics().record_timeout();
                complete_domain(
                    &shared,
                    Domain::Board,
                    DomainState::TimedOut {
                        deadline_ms: deadline.as_millis() as u64,
                    },
                    |_| {},
                );
            }
            Ok(Err(error)) => {
                adapter_metrics().record_error();
                tracing::warn!(domain = %Domain::Board, %error, "Domain fetch failed");
                complete_domain(&shared, Domain::Board, terminal_state_for(&error, deadline), |_| {});
            }
            Ok(Ok(board_metrics)) => {
                complete_domain(&shared, Domain::Board, DomainState::Succeeded, move |report| {
                    if metrics.contains(&MetricKind::CycleTime) {
                        report.cycle_time = Some(board_metrics.cycle_time);
                    }
                    if metrics.contains(&MetricKind::Velocity) {
                        report.velocity = Some(board_metrics.velocity);
                    }
                    if metrics.contains(&MetricKind::Rework) {
                        report.rework = Some(board_metrics.rework);
                    }
                });
            }
        }
    })
}

async fn fetch_board(
    client: Arc<dyn IssueTrackerClient>,
    board: BoardRequest,
    window: ReportWindow,
) -> Result<BoardMetrics, AdapterError> {
    let iterations = client.fetch_iterations(&board.board).await?;
    let cards = client
        .fetch_cards(&board.board, &window, &board.mapping)
        .await?;
    tracing::info!(
        cards.count = cards.len(),
        iterations.count = iterations.len(),
        "Board data fetched"
    );

    let engine = CycleTimeEngine::new(board.mapping, board.rework_policy);
    let aggregator = CycleTimeAggregator::new(engine);
    Ok(aggregator.aggregate(&cards, &iterations, window.end))
}

fn spawn_pipeline_domain(
    request: &ReportRequest,
    clients: &DomainClients,
    shared: &Arc<Mutex<SharedState>>,
    cache: &BuildCache,
    correlation_id: &str,
) -> JoinHandle<()> {
    let client = Arc::clone(&clients.pipeline);
    let specs = request.pipelines.clone();
    let window = request.window;
    let metrics = request.metrics.clone();
    let incident_rule = request.incident_rule;
    let deadline = request.deadlines.pipeline;
    let shared = Arc::clone(shared);
    let cache = cache.clone();
    let correlation_id = correlation_id.to_string();

    tokio::spawn(async move {
        tracing::info!(domain = %Domain::Pipeline, correlation.id = %correlation_id, "Domain fetch started");
        match timeout(deadline, collect_deploys(client, cache, specs, window)).await {
            Err(_) => {
                adapter_metrics().record_timeout();
                complete_domain(
                    &shared,
                    Domain::Pipeline,
                    DomainState::TimedOut {
                        deadline_ms: deadline.as_millis() as u64,
                    },
                    |_| {},
                );
            }
            Ok(results) => {
                let (deploys, failed) = split_outcomes(results);
                if deploys.is_empty() && !failed.is_empty() {
                    // Nothing was populated, so this is a plain failure.
                    let error = failed[0].error.clone();
                    complete_domain(&shared, Domain::Pipeline, DomainState::Failed { error }, |_| {});
                    return;
                }

                let state = if failed.is_empty() {
                    DomainState::Succeeded
                } else {
                    DomainState::PartialFailed { failed }
                };
                let frequency = metrics
                    .contains(&MetricKind::DeploymentFrequency)
                    .then(|| deployment_frequency(&deploys, &window));
                let failure_rate = metrics
                    .contains(&MetricKind::ChangeFailureRate)
                    .then(|| change_failure_rate(&deploys));
                let recovery = metrics
                    .contains(&MetricKind::MeanTimeToRecovery)
                    .then(|| mean_time_to_recovery(&deploys, incident_rule));

                complete_domain(&shared, Domain::Pipeline, state, move |report| {
                    if let Some(frequency) = frequency {
                        report.deployment_frequency = Some(frequency);
                    }
                    if let Some(failure_rate) = failure_rate {
                        report.change_failure_rate = Some(failure_rate);
                    }
                    if let Some(recovery) = recovery {
                        report.mean_time_to_recovery = Some(recovery);
                    }
                });
            }
        }
    })
}

/// Per-pipeline sub-fetches fan out concurrently; each failure stays scoped
/// to its pipeline.
async fn collect_deploys(
    client: Arc<dyn PipelineClient>,
    cache: BuildCache,
    specs: Vec<PipelineSpec>,
    window: ReportWindow,
) -> Vec<(String, Result<PipelineDeploys, (String, bool)>)> {
    let mut fetches: JoinSet<(String, Result<PipelineDeploys, (String, bool)>)> = JoinSet::new();
    for spec in specs {
        let client = Arc::clone(&client);
        let cache = cache.clone();
        fetches.spawn(async move {
            let result = match cache.get_or_fetch(Arc::clone(&client), &spec, &window).await {
                Ok(builds) => Ok(PipelineDeploys::new(
                    spec.id.clone(),
                    client.deploys(&spec, &builds),
                )),
                Err(error) => Err((error.to_string(), error.is_timeout())),
            };
            (spec.id, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok(entry) => results.push(entry),
            Err(join_error) => {
                tracing::error!(%join_error, "Pipeline sub-fetch task failed");
            }
        }
    }
    results
}

fn spawn_codebase_domain(
    repo: RepoSpec,
    request: &ReportRequest,
    clients: &DomainClients,
    shared: &Arc<Mutex<SharedState>>,
    cache: &BuildCache,
    correlation_id: &str,
) -> JoinHandle<()> {
    let pipeline_client = Arc::clone(&clients.pipeline);
    let codebase_client = Arc::clone(&clients.codebase);
    let specs = request.pipelines.clone();
    let window = request.window;
    let wanted = request.metrics.contains(&MetricKind::LeadTimeForChanges);
    let deadline = request.deadlines.codebase;
    let shared = Arc::clone(shared);
    let cache = cache.clone();
    let correlation_id = correlation_id.to_string();

    tokio::spawn(async move {
        tracing::info!(domain = %Domain::Codebase, correlation.id = %correlation_id, "Domain fetch started");
        let fetch = collect_lead_times(pipeline_client, codebase_client, cache, specs, repo, window);
        match timeout(deadline, fetch).await {
            Err(_) => {
                adapter_metrics().record_timeout();
                complete_domain(
                    &shared,
                    Domain::Codebase,
                    DomainState::TimedOut {
                        deadline_ms: deadline.as_millis() as u64,
                    },
                    |_| {},
                );
            }
            Ok(results) => {
                let (lead_times, failed) = split_outcomes(results);
                if lead_times.is_empty() && !failed.is_empty() {
                    let error = failed[0].error.clone();
                    complete_domain(&shared, Domain::Codebase, DomainState::Failed { error }, |_| {});
                    return;
                }

                let state = if failed.is_empty() {
                    DomainState::Succeeded
                } else {
                    DomainState::PartialFailed { failed }
                };
                let lead_time = wanted.then(|| combine_lead_times(lead_times));
                complete_domain(&shared, Domain::Codebase, state, move |report| {
                    if let Some(lead_time) = lead_time {
                        report.lead_time_for_changes = Some(lead_time);
                    }
                });
            }
        }
    })
}

async fn collect_lead_times(
    pipeline_client: Arc<dyn PipelineClient>,
    codebase_client: Arc<dyn CodebaseClient>,
    cache: BuildCache,
    specs: Vec<PipelineSpec>,
    repo: RepoSpec,
    window: ReportWindow,
) -> Vec<(String, Result<PipelineLeadTime, (String, bool)>)> {
    let mut fetches: JoinSet<(String, Result<PipelineLeadTime, (String, bool)>)> = JoinSet::new();
    for spec in specs {
        let pipeline_client = Arc::clone(&pipeline_client);
        let codebase_client = Arc::clone(&codebase_client);
        let cache = cache.clone();
        let repo = repo.clone();
        fetches.spawn(async move {
            let result = match cache
                .get_or_fetch(Arc::clone(&pipeline_client), &spec, &window)
                .await
            {
                Ok(builds) => {
                    let deploys = pipeline_client.deploys(&spec, &builds);
                    pipeline_lead_time(&spec.id, &deploys, &repo, codebase_client)
                        .await
                        .map_err(|error| (error.to_string(), error.is_timeout()))
                }
                Err(error) => Err((error.to_string(), error.is_timeout())),
            };
            (spec.id, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok(entry) => results.push(entry),
            Err(join_error) => {
                tracing::error!(%join_error, "Commit resolution sub-fetch task failed");
            }
        }
    }
    results
}
