use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::adapters::registry::{self, CodebaseKind, IssueTrackerKind, PipelineKind};
use crate::adapters::traits::{BoardSpec, PipelineSpec, RepoSpec};
use crate::adapters::types::ReportWindow;
use crate::cycletime::{ColumnStateMapping, MappingEntry, ReworkPolicy, WorkflowState};
use crate::dora::IncidentRule;
use crate::report::{
    BoardRequest, CodebaseRequest, DomainClients, DomainDeadlines, MetricKind, ReportRequest,
};

/// Main configuration structure for delivery-pulse
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryPulseConfig {
    /// Which provider backs each client family
    pub providers: ProvidersConfig,
    /// Board/issue-tracker settings (absent when no board metrics are used)
    pub board: Option<BoardConfig>,
    /// Tracked pipelines
    #[serde(default)]
    pub pipelines: Vec<PipelineConfig>,
    /// Codebase settings for lead-time commit resolution
    pub codebase: Option<CodebaseConfig>,
    /// Report orchestration settings
    pub report: ReportSettings,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub issue_tracker: IssueTrackerKind,
    pub pipeline: PipelineKind,
    pub codebase: CodebaseKind,
    /// Data directory for the json_file provider kind
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    pub board_id: String,
    /// Column → canonical state mapping rows
    #[serde(default)]
    pub columns: Vec<MappingEntry>,
    #[serde(default)]
    pub rework: ReworkConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReworkConfig {
    /// Re-entries into these states are not counted as rework
    #[serde(default)]
    pub excluded_states: Vec<WorkflowState>,
    /// Whether re-entries after leaving Done count as rework
    #[serde(default)]
    pub count_reopen_as_rework: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub id: String,
    /// The build step that counts as a deployment
    pub deploy_step: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodebaseConfig {
    pub repo_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportSettings {
    /// Per-domain fetch deadlines in seconds
    pub board_deadline_seconds: u64,
    pub pipeline_deadline_seconds: u64,
    pub codebase_deadline_seconds: u64,
    /// MTTR incident boundary rule
    #[serde(default)]
    pub incident_rule: IncidentRule,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Enable tracing init at startup
    pub tracing_enabled: bool,
    /// Log level
    pub log_level: String,
    /// Enable adapter metrics collection
    pub metrics_enabled: bool,
}

impl Default for DeliveryPulseConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig {
                issue_tracker: IssueTrackerKind::JsonFile,
                pipeline: PipelineKind::JsonFile,
                codebase: CodebaseKind::JsonFile,
                data_dir: ".delivery-pulse/data".to_string(),
            },
            board: Some(BoardConfig {
                board_id: "main".to_string(),
                columns: vec![
                    MappingEntry {
                        column: "To Do".into(),
                        status: None,
                        state: WorkflowState::Todo,
                    },
                    MappingEntry {
                        column: "Analysis".into(),
                        status: None,
                        state: WorkflowState::Analysis,
                    },
                    MappingEntry {
                        column: "In Progress".into(),
                        status: None,
                        state: WorkflowState::InDev,
                    },
                    MappingEntry {
                        column: "Waiting For Testing".into(),
                        status: None,
                        state: WorkflowState::WaitingForTesting,
                    },
                    MappingEntry {
                        column: "Testing".into(),
                        status: None,
                        state: WorkflowState::Testing,
                    },
                    MappingEntry {
                        column: "Review".into(),
                        status: None,
                        state: WorkflowState::Review,
                    },
                    MappingEntry {
                        column: "Done".into(),
                        status: None,
                        state: WorkflowState::Done,
                    },
                ],
                rework: ReworkConfig {
                    excluded_states: vec![WorkflowState::Block],
                    count_reopen_as_rework: false,
                },
            }),
            pipelines: vec![PipelineConfig {
                id: "main".to_string(),
                deploy_step: "deploy".to_string(),
            }],
            codebase: Some(CodebaseConfig {
                repo_id: "main".to_string(),
            }),
            report: ReportSettings {
                board_deadline_seconds: 30,
                pipeline_deadline_seconds: 30,
                codebase_deadline_seconds: 60,
                incident_rule: IncidentRule::RunOfFailures,
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                log_level: "info".to_string(),
                metrics_enabled: true,
            },
        }
    }
}

impl DeliveryPulseConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (delivery-pulse.toml, .delivery-pulse-rc)
    /// 3. Environment variables (prefixed with DELIVERY_PULSE_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("delivery-pulse.toml").exists() {
            builder = builder.add_source(File::with_name("delivery-pulse"));
        }

        if Path::new(".delivery-pulse-rc").exists() {
            builder = builder.add_source(File::with_name(".delivery-pulse-rc"));
        }

        builder = builder.add_source(
            Environment::with_prefix("DELIVERY_PULSE")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load configuration from one explicit file over the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// The metrics this configuration can serve.
    pub fn available_metrics(&self) -> BTreeSet<MetricKind> {
        MetricKind::ALL
            .into_iter()
            .filter(|metric| match metric.domain() {
                crate::report::Domain::Board => self.board.is_some(),
                crate::report::Domain::Pipeline => !self.pipelines.is_empty(),
                crate::report::Domain::Codebase => {
                    self.codebase.is_some() && !self.pipelines.is_empty()
                }
            })
            .collect()
    }

    /// Build a report request. Settings are copied into the request so the
    /// orchestrator never reads process-wide state mid-run.
    pub fn to_request(&self, metrics: BTreeSet<MetricKind>, window: ReportWindow) -> ReportRequest {
        ReportRequest {
            metrics,
            window,
            board: self.board.as_ref().map(|board| BoardRequest {
                board: BoardSpec {
                    board_id: board.board_id.clone(),
                },
                mapping: ColumnStateMapping::from_entries(&board.columns),
                rework_policy: ReworkPolicy {
                    excluded_states: board.rework.excluded_states.iter().copied().collect(),
                    count_reopen_as_rework: board.rework.count_reopen_as_rework,
                },
            }),
            pipelines: self
                .pipelines
                .iter()
                .map(|pipeline| PipelineSpec {
                    id: pipeline.id.clone(),
                    deploy_step: pipeline.deploy_step.clone(),
                })
                .collect(),
            codebase: self.codebase.as_ref().map(|codebase| CodebaseRequest {
                repo: RepoSpec {
                    repo_id: codebase.repo_id.clone(),
                },
            }),
            deadlines: DomainDeadlines {
                board: Duration::from_secs(self.report.board_deadline_seconds),
                pipeline: Duration::from_secs(self.report.pipeline_deadline_seconds),
                codebase: Duration::from_secs(self.report.codebase_deadline_seconds),
            },
            incident_rule: self.report.incident_rule,
        }
    }

    /// Construct the configured adapter clients through the provider
    /// registry.
    pub fn clients(&self) -> DomainClients {
        let data_dir = Path::new(&self.providers.data_dir);
        DomainClients {
            issue_tracker: registry::issue_tracker_client(self.providers.issue_tracker, data_dir),
            pipeline: registry::pipeline_client(self.providers.pipeline, data_dir),
            codebase: registry::codebase_client(self.providers.codebase, data_dir),
        }
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<DeliveryPulseConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = DeliveryPulseConfig::load_env_file();
        DeliveryPulseConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static DeliveryPulseConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serves_every_metric() {
        let config = DeliveryPulseConfig::default();
        assert_eq!(config.available_metrics().len(), MetricKind::ALL.len());
    }

    #[test]
    fn missing_codebase_section_removes_lead_time() {
        let config = DeliveryPulseConfig {
            codebase: None,
            ..DeliveryPulseConfig::default()
        };
        let available = config.available_metrics();
        assert!(!available.contains(&MetricKind::LeadTimeForChanges));
        assert!(available.contains(&MetricKind::DeploymentFrequency));
    }

    #[test]
    fn request_carries_rework_policy_from_config() {
        let config = DeliveryPulseConfig::default();
        let window = ReportWindow::new(
            chrono::Utc::now() - chrono::Duration::days(14),
            chrono::Utc::now(),
        );
        let request = config.to_request(BTreeSet::from([MetricKind::CycleTime]), window);
        let board = request.board.expect("default config has a board");
        assert!(!board.rework_policy.count_reopen_as_rework);
        assert!(board
            .rework_policy
            .excluded_states
            .contains(&WorkflowState::Block));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = DeliveryPulseConfig::default();
        let toml_content = toml::to_string_pretty(&config).unwrap();
        let parsed: DeliveryPulseConfig = toml::from_str(&toml_content).unwrap();
        assert_eq!(parsed.providers.data_dir, config.providers.data_dir);
        assert_eq!(parsed.pipelines.len(), config.pipelines.len());
    }
}
