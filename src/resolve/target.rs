// ABOUTME: Resolved deployment target for one application.
// ABOUTME: Stores a single live environment; the idle one is always its complement.

use serde::Serialize;

use crate::provider::{ListenerRule, ServiceDescription, TargetGroup};
use crate::types::{AppName, ClusterId, Environment, ListenerId, TargetGroupId};

/// How the live environment was decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The routing action pointed unambiguously at one environment.
    Exact,
    /// No usable routing signal; BLUE was assumed.
    Degraded { reason: String },
}

impl Resolution {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Degraded { .. })
    }
}

/// One colour's resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSlot {
    pub environment: Environment,
    pub target_group: TargetGroup,
    /// `None` when the service does not exist yet.
    pub service: Option<ServiceDescription>,
    /// Image of the service's primary container.
    pub current_image: Option<String>,
}

/// Everything a promotion run needs to know about an application's
/// infrastructure. Built fresh per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub application: AppName,
    pub primary: bool,
    pub cluster: ClusterId,
    pub load_balancer_dns: String,
    pub listener: ListenerId,
    /// The application's path rule, if one exists.
    pub rule: Option<ListenerRule>,
    pub blue: EnvironmentSlot,
    pub green: EnvironmentSlot,
    pub(crate) live: Environment,
    pub resolution: Resolution,
}

impl DeploymentTarget {
    pub fn live(&self) -> Environment {
        self.live
    }

    pub fn idle(&self) -> Environment {
        self.live.other()
    }

    pub fn slot(&self, env: Environment) -> &EnvironmentSlot {
        match env {
            Environment::Blue => &self.blue,
            Environment::Green => &self.green,
        }
    }

    pub fn live_slot(&self) -> &EnvironmentSlot {
        self.slot(self.live())
    }

    pub fn idle_slot(&self) -> &EnvironmentSlot {
        self.slot(self.idle())
    }

    pub fn target_group(&self, env: Environment) -> &TargetGroupId {
        &self.slot(env).target_group.id
    }

    /// Which environment a target group belongs to.
    pub fn environment_of(&self, target_group: &TargetGroupId) -> Option<Environment> {
        Environment::ALL
            .into_iter()
            .find(|env| self.target_group(*env) == target_group)
    }
}
