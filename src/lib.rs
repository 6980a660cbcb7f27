// Delivery Pulse Library - Engineering Delivery Metrics
// This exposes the core components for testing and integration

pub mod adapters;
pub mod config;
pub mod cycletime;
pub mod dora;
pub mod observability;
pub mod report;
pub mod telemetry;

// Re-export key types for easy access
pub use adapters::{
    AdapterError, BuildRecord, BuildStatus, Card, CardField, CodebaseClient, CommitInfo,
    DeployEvent, IssueTrackerClient, Iteration, PipelineClient, ReportWindow, StatusEvent,
};
pub use config::{config, init_config, DeliveryPulseConfig};
pub use cycletime::{
    BoardMetrics, ColumnStateMapping, CycleTimeAggregator, CycleTimeBreakdown, CycleTimeEngine,
    HistoryError, ReworkPolicy, WorkflowState,
};
pub use dora::{
    change_failure_rate, deployment_frequency, mean_time_to_recovery, ChangeFailureRate,
    DeploymentFrequency, IncidentRule, LeadTimeForChanges, MeanTimeToRecovery, PipelineDeploys,
};
pub use observability::{adapter_metrics, create_domain_span, AdapterApiMetrics, OperationTimer};
pub use report::{
    format_report, BoardRequest, BuildCache, CodebaseRequest, Domain, DomainClients,
    DomainDeadlines, DomainState, DomainStatus, MetricKind, Report, ReportError,
    ReportOrchestrator, ReportRequest, ReportSnapshot,
};
pub use telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};
