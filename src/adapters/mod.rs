// Adapter boundary: normalized records, client traits, and provider dispatch.
// The aggregation core only ever sees the types defined here: wire formats
// of the external systems stay inside their adapter implementations.

pub mod error;
pub mod file;
pub mod mocks;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::AdapterError;
pub use registry::{CodebaseKind, IssueTrackerKind, PipelineKind};
pub use traits::{CodebaseClient, IssueTrackerClient, PipelineClient};
pub use types::{
    BuildRecord, BuildStatus, Card, CardField, CommitInfo, DeployEvent, Iteration,
    LeadTimeSample, ReportWindow, StatusEvent,
};
