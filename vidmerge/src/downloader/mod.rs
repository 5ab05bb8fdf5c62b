//! Request-level download orchestration.

pub mod orchestrator;

pub use orchestrator::{
    DownloadOrchestrator, OrchestratorConfig, ResolvedArtifact, validate_source_url,
};
