use super::*;
use crate::model::*;
use crate::artifact::ArtifactError;
use std::path::PathBuf;

/// Why a single load strategy gave up. Recoverable: the next strategy runs.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("cannot read artifact: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("artifact stores no model configuration")]
    MissingConfig,
    #[error("malformed model configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Weights(#[from] WeightError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("reconstructed model produces non-finite output")]
    Unstable,
}

/// Fatal outcomes of the recovery flow.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("all {} load strategies failed", .attempts.len())]
    Exhausted { attempts: Vec<Attempt> },
    #[error("cannot save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        source: ArtifactError,
    },
}
