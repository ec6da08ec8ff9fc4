// ABOUTME: Error types for process supervisor operations.
// ABOUTME: Covers unit file writes, command spawning and failing commands.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to write unit file {path}: {source}")]
    WriteUnit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {}: {stderr}", .code.map_or("signal".to_string(), |c| c.to_string()))]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}
