// ABOUTME: Shared types used across provider trait definitions.
// ABOUTME: Listener rules, forward actions, services, task definitions, target health.

use crate::types::{
    ImageRef, ListenerId, LoadBalancerId, RuleId, ServiceId, TargetGroupId, TaskDefinitionId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A target group: the pool of tasks behind one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    pub id: TargetGroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    pub id: LoadBalancerId,
    pub name: String,
    /// Public DNS name used for HTTP smoke tests.
    pub dns_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub id: ListenerId,
    pub port: u16,
    pub default_actions: Vec<RuleAction>,
}

/// One target group entry of a weighted forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedTarget {
    pub target_group: TargetGroupId,
    pub weight: u32,
}

/// What a rule or default action does with matching traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleAction {
    /// Forward everything to one target group.
    Forward(TargetGroupId),
    /// Split traffic across target groups by weight.
    WeightedForward(Vec<WeightedTarget>),
    /// Any non-forward action (fixed response, redirect...). Kept opaque.
    Other(String),
}

impl RuleAction {
    /// Weighted cutover: full weight to `target`, zero to `other`.
    pub fn weighted_cutover(target: &TargetGroupId, other: &TargetGroupId) -> Self {
        RuleAction::WeightedForward(vec![
            WeightedTarget {
                target_group: target.clone(),
                weight: 1,
            },
            WeightedTarget {
                target_group: other.clone(),
                weight: 0,
            },
        ])
    }

    /// The target group that receives the traffic.
    ///
    /// For a weighted forward this is the strictly highest weight; a tie or an
    /// all-zero split has no dominant target.
    pub fn dominant_target(&self) -> Option<&TargetGroupId> {
        match self {
            RuleAction::Forward(tg) => Some(tg),
            RuleAction::WeightedForward(targets) => {
                let max = targets.iter().map(|t| t.weight).max()?;
                if max == 0 {
                    return None;
                }
                let mut top = targets.iter().filter(|t| t.weight == max);
                let first = top.next()?;
                match top.next() {
                    Some(_) => None,
                    None => Some(&first.target_group),
                }
            }
            RuleAction::Other(_) => None,
        }
    }

    pub fn is_forward(&self) -> bool {
        !matches!(self, RuleAction::Other(_))
    }
}

/// First forwarding action in a list, if any.
pub fn forward_action(actions: &[RuleAction]) -> Option<&RuleAction> {
    actions.iter().find(|a| a.is_forward())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRule {
    pub id: RuleId,
    /// `None` for the listener's default rule.
    pub priority: Option<u32>,
    pub path_patterns: Vec<String>,
    pub actions: Vec<RuleAction>,
}

impl ListenerRule {
    pub fn is_default(&self) -> bool {
        self.priority.is_none()
    }

    pub fn matches_pattern(&self, pattern: &str) -> bool {
        self.path_patterns.iter().any(|p| p == pattern)
    }
}

/// Request to create a listener rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRule {
    pub priority: u32,
    pub path_patterns: Vec<String>,
    pub actions: Vec<RuleAction>,
}

/// A compute service as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    pub id: ServiceId,
    pub name: String,
    pub status: String,
    pub desired_count: u32,
    pub running_count: u32,
    pub task_definition: TaskDefinitionId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUpdate {
    pub desired_count: u32,
    pub task_definition: Option<TaskDefinitionId>,
    pub force_new_deployment: bool,
}

impl ServiceUpdate {
    /// Scale only, keeping the current task definition.
    pub fn scale(desired_count: u32) -> Self {
        Self {
            desired_count,
            task_definition: None,
            force_new_deployment: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub name: String,
    pub task_definition: TaskDefinitionId,
    pub desired_count: u32,
}

/// A container entry of a task definition. Fields this crate does not
/// interpret are carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A registered task definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub id: TaskDefinitionId,
    pub family: String,
    pub container_definitions: Vec<ContainerDefinition>,
    pub extra: Map<String, Value>,
}

impl TaskDefinition {
    /// Image of the primary (first) container.
    pub fn primary_image(&self) -> Option<&str> {
        self.container_definitions.first().map(|c| c.image.as_str())
    }

    /// Registration request for a new revision running `image` in the
    /// primary container. Returns `None` when there is no container to update.
    pub fn with_image(&self, image: &ImageRef) -> Option<TaskDefinitionRequest> {
        let mut containers = self.container_definitions.clone();
        containers.first_mut()?.image = image.to_string();
        Some(TaskDefinitionRequest {
            family: self.family.clone(),
            container_definitions: containers,
            extra: self.extra.clone(),
        })
    }
}

/// Input for registering a task definition revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionRequest {
    pub family: String,
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Health of one registered target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetHealthState {
    Initial,
    Healthy,
    Unhealthy,
    Unused,
    Draining,
    Unavailable,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for TargetHealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetHealthState::Initial => "initial",
            TargetHealthState::Healthy => "healthy",
            TargetHealthState::Unhealthy => "unhealthy",
            TargetHealthState::Unused => "unused",
            TargetHealthState::Draining => "draining",
            TargetHealthState::Unavailable => "unavailable",
            TargetHealthState::Other(s) => s,
        };
        f.write_str(s)
    }
}
