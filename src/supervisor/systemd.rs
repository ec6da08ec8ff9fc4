// ABOUTME: Process supervisor seam and its systemd implementation.
// ABOUTME: Units are written to a unit directory and driven through systemctl.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::SupervisorConfig;

use super::error::SupervisorError;
use super::unit::{UnitSpec, UnitStatus};

/// Installs and controls long-running application processes.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Write (or overwrite) the unit and make the supervisor reload it.
    async fn install_unit(&self, spec: &UnitSpec) -> Result<(), SupervisorError>;

    async fn enable(&self, name: &str) -> Result<(), SupervisorError>;

    async fn start(&self, name: &str) -> Result<(), SupervisorError>;

    async fn stop(&self, name: &str) -> Result<(), SupervisorError>;

    async fn status(&self, name: &str) -> Result<UnitStatus, SupervisorError>;
}

/// Replace a running unit: stop the old process, install the new unit,
/// enable and start it, then report its status.
///
/// A failing stop is tolerated because the unit may not exist yet.
pub async fn replace_unit(
    supervisor: &dyn ProcessSupervisor,
    spec: &UnitSpec,
) -> Result<UnitStatus, SupervisorError> {
    tracing::info!("Stopping old unit {}", spec.name);
    if let Err(e) = supervisor.stop(&spec.name).await {
        tracing::debug!("stop of {} failed (ignored): {}", spec.name, e);
    }

    supervisor.install_unit(spec).await?;
    supervisor.enable(&spec.name).await?;
    supervisor.start(&spec.name).await?;

    let status = supervisor.status(&spec.name).await?;
    tracing::info!("Unit {} is {}", spec.name, status);
    Ok(status)
}

/// systemd through the `systemctl` binary.
#[derive(Debug, Clone)]
pub struct SystemdSupervisor {
    unit_dir: PathBuf,
    systemctl: PathBuf,
}

impl SystemdSupervisor {
    pub fn new(unit_dir: impl Into<PathBuf>, systemctl: impl Into<PathBuf>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            systemctl: systemctl.into(),
        }
    }

    pub fn from_config(settings: &SupervisorConfig) -> Self {
        Self::new(settings.unit_dir.clone(), settings.systemctl.clone())
    }

    pub fn unit_path(&self, spec: &UnitSpec) -> PathBuf {
        self.unit_dir.join(spec.file_name())
    }

    pub fn unit_dir(&self) -> &Path {
        &self.unit_dir
    }

    /// Run `systemctl <args>` and return its stdout. A non-zero exit is an
    /// error unless `allow_failure` is set.
    async fn systemctl(
        &self,
        args: &[&str],
        allow_failure: bool,
    ) -> Result<String, SupervisorError> {
        let command = format!("{} {}", self.systemctl.display(), args.join(" "));
        tracing::debug!("{}", command);

        let output = Command::new(&self.systemctl)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| SupervisorError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() && !allow_failure {
            return Err(SupervisorError::Command {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ProcessSupervisor for SystemdSupervisor {
    async fn install_unit(&self, spec: &UnitSpec) -> Result<(), SupervisorError> {
        let path = self.unit_path(spec);
        tokio::fs::write(&path, spec.render())
            .await
            .map_err(|source| SupervisorError::WriteUnit {
                path: path.clone(),
                source,
            })?;
        tracing::info!("Wrote unit file {}", path.display());
        self.systemctl(&["daemon-reload"], false).await?;
        Ok(())
    }

    async fn enable(&self, name: &str) -> Result<(), SupervisorError> {
        self.systemctl(&["enable", name], false).await?;
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        self.systemctl(&["start", name], false).await?;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        self.systemctl(&["stop", name], false).await?;
        Ok(())
    }

    /// `is-active` exits non-zero for inactive units, so only its output counts.
    async fn status(&self, name: &str) -> Result<UnitStatus, SupervisorError> {
        let stdout = self.systemctl(&["is-active", name], true).await?;
        Ok(UnitStatus::from_is_active(&stdout))
    }
}
