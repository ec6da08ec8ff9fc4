// ABOUTME: Application-wide error types for bgctl.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::promotion::{Outcome, PromotionError};
use crate::supervisor::SupervisorError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown application: {0}")]
    UnknownApplication(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Promotion(#[from] PromotionError),

    #[error("promotion ended {0}")]
    PromotionFailed(Outcome),

    #[error("process supervisor: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("{0} hook failed")]
    HookFailed(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
