//! Temporary artifact storage and its cleanup paths.

pub mod retention;
pub mod temp_store;

pub use retention::ExpiryRegistry;
pub use temp_store::{ArtifactRole, RequestArtifacts, TempStore, validate_artifact_name};
