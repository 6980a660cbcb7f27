// Report assembly: the merged report value, the per-domain status envelope,
// the shared build cache, and the orchestrator that fans fetches out across
// the three domains.

pub mod build_cache;
pub mod format;
pub mod orchestrator;
pub mod types;

pub use build_cache::BuildCache;
pub use format::format_report;
pub use orchestrator::{
    BoardRequest, CodebaseRequest, DomainClients, DomainDeadlines, ReportOrchestrator,
    ReportRequest,
};
pub use types::{
    Domain, DomainState, DomainStatus, MetricKind, Report, ReportError, ReportSnapshot,
    SubEntityFailure,
};
