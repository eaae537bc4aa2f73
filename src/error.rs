use std::path::PathBuf;

use thiserror::Error;

use crate::state_machine::UnknownState;

#[derive(Debug, Error)]
pub enum EpicflowError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Runtime stopped: the state machine task is no longer running")]
    RuntimeStopped,

    #[error("Snapshot not found at {}", .0.display())]
    SnapshotMissing(PathBuf),

    #[error("Runtime task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    UnknownState(#[from] UnknownState),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = EpicflowError> = std::result::Result<T, E>;
