// ABOUTME: Compute service settings for idle-environment deployments.
// ABOUTME: The task template is used only when the idle service does not exist yet.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::provider::{ContainerDefinition, TaskDefinitionRequest};
use crate::types::ImageRef;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    #[serde(default)]
    pub task_template: TaskTemplate,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            desired_count: default_desired_count(),
            task_template: TaskTemplate::default(),
        }
    }
}

fn default_desired_count() -> u32 {
    1
}

/// Task definition used to create a missing service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskTemplate {
    #[serde(default = "default_container_name")]
    pub container_name: String,

    #[serde(default = "default_container_port")]
    pub container_port: u16,

    #[serde(default = "default_cpu")]
    pub cpu: String,

    #[serde(default = "default_memory")]
    pub memory: String,

    #[serde(default)]
    pub execution_role_arn: Option<String>,
}

impl Default for TaskTemplate {
    fn default() -> Self {
        Self {
            container_name: default_container_name(),
            container_port: default_container_port(),
            cpu: default_cpu(),
            memory: default_memory(),
            execution_role_arn: None,
        }
    }
}

fn default_container_name() -> String {
    "web".to_string()
}

fn default_container_port() -> u16 {
    80
}

fn default_cpu() -> String {
    "256".to_string()
}

fn default_memory() -> String {
    "512".to_string()
}

impl TaskTemplate {
    /// Fargate registration request running `image`.
    pub fn request(&self, family: &str, image: &ImageRef) -> TaskDefinitionRequest {
        let mut container = Map::new();
        container.insert("essential".to_string(), Value::Bool(true));
        container.insert(
            "portMappings".to_string(),
            json!([{ "containerPort": self.container_port, "protocol": "tcp" }]),
        );

        let mut extra = Map::new();
        extra.insert("networkMode".to_string(), json!("awsvpc"));
        extra.insert("requiresCompatibilities".to_string(), json!(["FARGATE"]));
        extra.insert("cpu".to_string(), json!(self.cpu));
        extra.insert("memory".to_string(), json!(self.memory));
        if let Some(ref role) = self.execution_role_arn {
            extra.insert("executionRoleArn".to_string(), json!(role));
        }

        TaskDefinitionRequest {
            family: family.to_string(),
            container_definitions: vec![ContainerDefinition {
                name: self.container_name.clone(),
                image: image.to_string(),
                extra: container,
            }],
            extra,
        }
    }
}
