// The four DORA calculators. Each is a pure aggregation over normalized
// deploy events for one or more pipelines and one time window: same input,
// same output, no shared mutable state between pipelines.

pub mod change_failure_rate;
pub mod deployment_frequency;
pub mod lead_time;
pub mod recovery;
pub mod types;

pub use change_failure_rate::{change_failure_rate, ChangeFailureRate, PipelineFailureRate};
pub use deployment_frequency::{
    deployment_frequency, DeploymentFrequency, PipelineDeployFrequency,
};
pub use lead_time::{combine_lead_times, pipeline_lead_time, LeadTimeForChanges, PipelineLeadTime};
pub use recovery::{mean_time_to_recovery, IncidentRule, MeanTimeToRecovery, PipelineRecovery};
pub use types::PipelineDeploys;
