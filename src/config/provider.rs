// ABOUTME: Settings for the aws CLI provider adapter.
// ABOUTME: Credentials stay with the CLI; only region/profile are passed through.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_aws_bin")]
    pub aws_bin: PathBuf,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub profile: Option<String>,

    /// Bound on a single CLI invocation.
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    /// Bound on `ecs wait services-stable`.
    #[serde(default = "default_wait_timeout", with = "humantime_serde")]
    pub wait_timeout: Duration,

    /// Subnets for services created by the controller.
    #[serde(default)]
    pub subnets: Vec<String>,

    #[serde(default)]
    pub security_groups: Vec<String>,

    #[serde(default = "default_assign_public_ip")]
    pub assign_public_ip: bool,

    #[serde(default = "default_launch_type")]
    pub launch_type: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            aws_bin: default_aws_bin(),
            region: None,
            profile: None,
            command_timeout: default_command_timeout(),
            wait_timeout: default_wait_timeout(),
            subnets: Vec::new(),
            security_groups: Vec::new(),
            assign_public_ip: default_assign_public_ip(),
            launch_type: default_launch_type(),
        }
    }
}

fn default_aws_bin() -> PathBuf {
    PathBuf::from("aws")
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_wait_timeout() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_assign_public_ip() -> bool {
    true
}

fn default_launch_type() -> String {
    "FARGATE".to_string()
}
