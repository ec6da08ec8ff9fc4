// ABOUTME: Process supervisor settings for the virtual machine substrate.
// ABOUTME: Unit names are <unit_prefix>-<application>.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_unit_prefix")]
    pub unit_prefix: String,

    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,

    #[serde(default = "default_systemctl")]
    pub systemctl: PathBuf,

    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    #[serde(default = "default_user")]
    pub user: String,

    /// Command for `switch` mode; `{app}` is replaced by the application name.
    #[serde(default = "default_exec_start")]
    pub exec_start: String,

    /// Command for `rollback` mode (the previous stable build).
    #[serde(default = "default_exec_start_rollback")]
    pub exec_start_rollback: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            unit_prefix: default_unit_prefix(),
            unit_dir: default_unit_dir(),
            systemctl: default_systemctl(),
            working_dir: default_working_dir(),
            user: default_user(),
            exec_start: default_exec_start(),
            exec_start_rollback: default_exec_start_rollback(),
        }
    }
}

fn default_unit_prefix() -> String {
    "flask-app".to_string()
}

fn default_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_systemctl() -> PathBuf {
    PathBuf::from("systemctl")
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("/home/ec2-user")
}

fn default_user() -> String {
    "root".to_string()
}

fn default_exec_start() -> String {
    "/usr/bin/python3 /home/ec2-user/{app}.py".to_string()
}

fn default_exec_start_rollback() -> String {
    "/usr/bin/python3 /home/ec2-user/{app}_stable.py".to_string()
}
