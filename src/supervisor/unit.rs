// ABOUTME: Unit specifications for the process supervisor.
// ABOUTME: Builds an application's unit from settings and renders systemd unit files.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::SupervisorConfig;
use crate::context::PromotionMode;
use crate::types::AppName;

/// What the supervisor should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub name: String,
    pub description: String,
    pub exec_command: String,
    pub working_dir: PathBuf,
    pub user: String,
    /// Restart the process whenever it exits.
    pub auto_restart: bool,
}

impl UnitSpec {
    /// Unit for `application`: `switch` runs the latest build, `rollback`
    /// the stable one.
    pub fn for_application(
        settings: &SupervisorConfig,
        application: &AppName,
        mode: PromotionMode,
    ) -> Self {
        let template = match mode {
            PromotionMode::Switch => &settings.exec_start,
            PromotionMode::Rollback => &settings.exec_start_rollback,
        };
        let mode_label = match mode {
            PromotionMode::Switch => "Switch",
            PromotionMode::Rollback => "Rollback",
        };
        Self {
            name: unit_name(settings, application),
            description: format!("Flask App for {} ({} Mode)", application, mode_label),
            exec_command: template.replace("{app}", application.as_str()),
            working_dir: settings.working_dir.clone(),
            user: settings.user.clone(),
            auto_restart: true,
        }
    }

    /// File name of the unit, e.g. `flask-app-app_2.service`.
    pub fn file_name(&self) -> String {
        format!("{}.service", self.name)
    }

    /// systemd unit file content.
    pub fn render(&self) -> String {
        let mut unit = String::new();
        unit.push_str("[Unit]\n");
        unit.push_str(&format!("Description={}\n", self.description));
        unit.push_str("After=network.target\n\n");
        unit.push_str("[Service]\n");
        unit.push_str(&format!("User={}\n", self.user));
        unit.push_str(&format!("WorkingDirectory={}\n", self.working_dir.display()));
        unit.push_str(&format!("ExecStart={}\n", self.exec_command));
        if self.auto_restart {
            unit.push_str("Restart=always\n");
        }
        unit.push_str("\n[Install]\nWantedBy=multi-user.target\n");
        unit
    }
}

/// `<unit_prefix>-<application>`.
pub fn unit_name(settings: &SupervisorConfig, application: &AppName) -> String {
    format!("{}-{}", settings.unit_prefix, application)
}

/// Reported state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitStatus {
    Running,
    Stopped,
    Unknown,
}

impl UnitStatus {
    /// Map `systemctl is-active` output onto a status.
    pub fn from_is_active(output: &str) -> Self {
        match output.trim() {
            "active" | "reloading" => UnitStatus::Running,
            "inactive" | "failed" | "deactivating" => UnitStatus::Stopped,
            _ => UnitStatus::Unknown,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Running => f.write_str("RUNNING"),
            UnitStatus::Stopped => f.write_str("STOPPED"),
            UnitStatus::Unknown => f.write_str("UNKNOWN"),
        }
    }
}
