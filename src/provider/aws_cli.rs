// ABOUTME: Infrastructure provider backed by the `aws` command-line tool.
// ABOUTME: Every response is decoded into typed structs; decode failures propagate.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};
use tokio::process::Command;

use super::ProviderError;
use super::traits::sealed::Sealed;
use super::traits::{
    ComputeOps, ContainerDefinition, HealthOps, Listener, ListenerRule, LoadBalancer, LookupOps,
    NewRule, NewService, RoutingOps, RuleAction, ServiceDescription, ServiceUpdate, TargetGroup,
    TargetHealthState, TaskDefinition, TaskDefinitionRequest, WeightedTarget,
};
use crate::config::ProviderConfig;
use crate::types::{
    ClusterId, ListenerId, LoadBalancerId, RuleId, ServiceId, TargetGroupId, TaskDefinitionId,
};

/// Errors from invoking the `aws` binary.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AwsCliError {
    #[snafu(display("failed to run aws CLI for {operation}: {source}"))]
    Spawn {
        operation: String,
        source: std::io::Error,
    },

    #[snafu(display("aws {operation} timed out after {timeout:?}"))]
    Timeout { operation: String, timeout: Duration },

    #[snafu(display("aws {operation} exited with status {code:?}: {stderr}"))]
    Exit {
        operation: String,
        code: Option<i32>,
        stderr: String,
    },

    #[snafu(display("aws {operation} returned an unexpected document: {source}"))]
    Decode {
        operation: String,
        source: serde_json::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwsCliErrorKind {
    /// The binary could not be started.
    Spawn,
    /// The API reported a missing resource.
    NotFound,
    /// Throttling, timeouts, endpoint and 5xx errors.
    Transient,
    /// Any other rejection by the API.
    Rejected,
    /// The response did not match the expected shape.
    Decode,
}

/// API error codes reported for missing resources.
const NOT_FOUND_CODES: &[&str] = &[
    "TargetGroupNotFound",
    "LoadBalancerNotFound",
    "ListenerNotFound",
    "RuleNotFound",
    "ClusterNotFoundException",
    "ServiceNotFoundException",
];

/// Markers of failures worth retrying.
const TRANSIENT_MARKERS: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "ServiceUnavailable",
    "InternalFailure",
    "InternalError",
    "Could not connect to the endpoint URL",
    "Read timeout",
    "Connection was closed",
];

impl AwsCliError {
    /// API error code from stderr (`An error occurred (Code) when calling ...`).
    pub fn error_code(&self) -> Option<&str> {
        match self {
            AwsCliError::Exit { stderr, .. } => {
                let start = stderr.find("An error occurred (")? + "An error occurred (".len();
                let len = stderr[start..].find(')')?;
                Some(&stderr[start..start + len])
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> AwsCliErrorKind {
        match self {
            AwsCliError::Spawn { .. } => AwsCliErrorKind::Spawn,
            AwsCliError::Timeout { .. } => AwsCliErrorKind::Transient,
            AwsCliError::Decode { .. } => AwsCliErrorKind::Decode,
            AwsCliError::Exit { stderr, .. } => {
                if self
                    .error_code()
                    .is_some_and(|code| NOT_FOUND_CODES.contains(&code))
                {
                    AwsCliErrorKind::NotFound
                } else if TRANSIENT_MARKERS.iter().any(|m| stderr.contains(m)) {
                    AwsCliErrorKind::Transient
                } else {
                    AwsCliErrorKind::Rejected
                }
            }
        }
    }

    fn operation(&self) -> &str {
        match self {
            AwsCliError::Spawn { operation, .. }
            | AwsCliError::Timeout { operation, .. }
            | AwsCliError::Exit { operation, .. }
            | AwsCliError::Decode { operation, .. } => operation,
        }
    }
}

impl From<AwsCliError> for ProviderError {
    fn from(err: AwsCliError) -> Self {
        let operation = err.operation().to_string();
        let message = err.to_string();
        match err.kind() {
            AwsCliErrorKind::Transient => ProviderError::Transient { operation, message },
            AwsCliErrorKind::Decode => ProviderError::Decode { operation, message },
            AwsCliErrorKind::NotFound => ProviderError::NotFound {
                kind: "resource",
                id: message,
            },
            AwsCliErrorKind::Spawn | AwsCliErrorKind::Rejected => {
                ProviderError::Api { operation, message }
            }
        }
    }
}

/// Provider that shells out to `aws` with `--output json`.
#[derive(Debug, Clone)]
pub struct AwsCliProvider {
    aws_bin: PathBuf,
    region: Option<String>,
    profile: Option<String>,
    command_timeout: Duration,
    wait_timeout: Duration,
    subnets: Vec<String>,
    security_groups: Vec<String>,
    assign_public_ip: bool,
    launch_type: String,
}

impl Sealed for AwsCliProvider {}

impl AwsCliProvider {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            aws_bin: config.aws_bin.clone(),
            region: config.region.clone(),
            profile: config.profile.clone(),
            command_timeout: config.command_timeout,
            wait_timeout: config.wait_timeout,
            subnets: config.subnets.clone(),
            security_groups: config.security_groups.clone(),
            assign_public_ip: config.assign_public_ip,
            launch_type: config.launch_type.clone(),
        }
    }

    /// Run `aws <service> <operation> <args...>` and return stdout.
    async fn exec(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, AwsCliError> {
        let mut cmd = Command::new(&self.aws_bin);
        cmd.arg(service).arg(operation).args(args);
        cmd.args(["--output", "json"]);
        if let Some(ref region) = self.region {
            cmd.args(["--region", region]);
        }
        if let Some(ref profile) = self.profile {
            cmd.args(["--profile", profile]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("aws {} {} {:?}", service, operation, args);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| AwsCliError::Timeout {
                operation: operation.to_string(),
                timeout,
            })?
            .context(SpawnSnafu { operation })?;

        if !output.status.success() {
            return Err(AwsCliError::Exit {
                operation: operation.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<T, AwsCliError> {
        let stdout = self
            .exec(service, operation, args, self.command_timeout)
            .await?;
        decode(operation, &stdout)
    }

    /// Like `call`, but a not-found API error becomes `None`.
    async fn lookup<T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<Option<T>, ProviderError> {
        match self.call(service, operation, args).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == AwsCliErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn network_configuration(&self) -> String {
        format!(
            "awsvpcConfiguration={{subnets=[{}],securityGroups=[{}],assignPublicIp={}}}",
            self.subnets.join(","),
            self.security_groups.join(","),
            if self.assign_public_ip {
                "ENABLED"
            } else {
                "DISABLED"
            }
        )
    }
}

fn decode<T: DeserializeOwned>(operation: &str, stdout: &str) -> Result<T, AwsCliError> {
    serde_json::from_str(stdout).context(DecodeSnafu { operation })
}

fn encode_actions(operation: &str, actions: &[RuleAction]) -> Result<String, ProviderError> {
    let wire = actions
        .iter()
        .map(WireAction::from_action)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProviderError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
    serde_json::to_string(&wire).map_err(|e| ProviderError::Decode {
        operation: operation.to_string(),
        message: e.to_string(),
    })
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Wire documents
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterList {
    cluster_arns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterDescriptions {
    #[serde(default)]
    clusters: Vec<WireCluster>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCluster {
    cluster_arn: String,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TargetGroupDescriptions {
    target_groups: Vec<WireTargetGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTargetGroup {
    target_group_arn: String,
    target_group_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerDescriptions {
    load_balancers: Vec<WireLoadBalancer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireLoadBalancer {
    load_balancer_arn: String,
    load_balancer_name: String,
    #[serde(rename = "DNSName")]
    dns_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListenerDescriptions {
    listeners: Vec<WireListener>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireListener {
    listener_arn: String,
    port: u16,
    #[serde(default)]
    default_actions: Vec<Value>,
}

impl WireListener {
    fn into_listener(self) -> Result<Listener, serde_json::Error> {
        Ok(Listener {
            id: ListenerId::new(self.listener_arn),
            port: self.port,
            default_actions: decode_actions(self.default_actions)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RuleDescriptions {
    rules: Vec<WireRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireRule {
    rule_arn: String,
    priority: String,
    #[serde(default)]
    conditions: Vec<WireCondition>,
    #[serde(default)]
    actions: Vec<Value>,
    #[serde(default)]
    is_default: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireCondition {
    field: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_pattern_config: Option<WireValues>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireValues {
    values: Vec<String>,
}

impl WireRule {
    fn into_rule(self) -> Result<ListenerRule, serde_json::Error> {
        let priority = if self.is_default || self.priority == "default" {
            None
        } else {
            Some(self.priority.parse::<u32>().map_err(serde::de::Error::custom)?)
        };

        let path_patterns = self
            .conditions
            .into_iter()
            .filter(|c| c.field == "path-pattern")
            .flat_map(|c| match c.path_pattern_config {
                Some(config) => config.values,
                None => c.values,
            })
            .collect();

        Ok(ListenerRule {
            id: RuleId::new(self.rule_arn),
            priority,
            path_patterns,
            actions: decode_actions(self.actions)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireAction {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_group_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    forward_config: Option<WireForwardConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireForwardConfig {
    target_groups: Vec<WireWeightedTarget>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireWeightedTarget {
    target_group_arn: String,
    #[serde(default)]
    weight: Option<u32>,
}

impl WireAction {
    fn from_action(action: &RuleAction) -> Result<Value, serde_json::Error> {
        let wire = match action {
            RuleAction::Forward(tg) => WireAction {
                kind: "forward".to_string(),
                target_group_arn: Some(tg.to_string()),
                forward_config: None,
            },
            RuleAction::WeightedForward(targets) => WireAction {
                kind: "forward".to_string(),
                target_group_arn: None,
                forward_config: Some(WireForwardConfig {
                    target_groups: targets
                        .iter()
                        .map(|t| WireWeightedTarget {
                            target_group_arn: t.target_group.to_string(),
                            weight: Some(t.weight),
                        })
                        .collect(),
                }),
            },
            // Non-forward actions are stored as the raw provider document.
            RuleAction::Other(raw) => return serde_json::from_str(raw),
        };
        serde_json::to_value(wire)
    }
}

fn decode_actions(raw: Vec<Value>) -> Result<Vec<RuleAction>, serde_json::Error> {
    raw.into_iter().map(decode_action).collect()
}

fn decode_action(raw: Value) -> Result<RuleAction, serde_json::Error> {
    let wire: WireAction = serde_json::from_value(raw.clone())?;
    if wire.kind != "forward" {
        return Ok(RuleAction::Other(raw.to_string()));
    }

    match (wire.forward_config, wire.target_group_arn) {
        (Some(config), _) if config.target_groups.len() > 1 => Ok(RuleAction::WeightedForward(
            config
                .target_groups
                .into_iter()
                .map(|t| WeightedTarget {
                    target_group: TargetGroupId::new(t.target_group_arn),
                    weight: t.weight.unwrap_or(1),
                })
                .collect(),
        )),
        (_, Some(arn)) => Ok(RuleAction::Forward(TargetGroupId::new(arn))),
        (Some(mut config), None) => match config.target_groups.pop() {
            Some(t) => Ok(RuleAction::Forward(TargetGroupId::new(t.target_group_arn))),
            None => Err(serde::de::Error::custom("forward action without target groups")),
        },
        (None, None) => Err(serde::de::Error::custom("forward action without target")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TargetHealthDescriptions {
    target_health_descriptions: Vec<WireTargetHealthDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTargetHealthDescription {
    target_health: WireTargetHealth,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTargetHealth {
    state: TargetHealthState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceDescriptions {
    #[serde(default)]
    services: Vec<WireService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireService {
    service_arn: String,
    service_name: String,
    status: String,
    desired_count: u32,
    running_count: u32,
    task_definition: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEnvelope {
    service: WireService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDefinitionEnvelope {
    task_definition: WireTaskDefinition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTaskDefinition {
    task_definition_arn: String,
    family: String,
    container_definitions: Vec<ContainerDefinition>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Fields reported by describe-task-definition that registration rejects.
const READ_ONLY_TASK_FIELDS: &[&str] = &[
    "taskDefinitionArn",
    "revision",
    "status",
    "requiresAttributes",
    "compatibilities",
    "registeredAt",
    "registeredBy",
    "deregisteredAt",
];

impl WireTaskDefinition {
    fn into_task_definition(self) -> TaskDefinition {
        let read_only: HashSet<&str> = READ_ONLY_TASK_FIELDS.iter().copied().collect();
        let extra = self
            .extra
            .into_iter()
            .filter(|(k, _)| !read_only.contains(k.as_str()))
            .collect();
        TaskDefinition {
            id: TaskDefinitionId::new(self.task_definition_arn),
            family: self.family,
            container_definitions: self.container_definitions,
            extra,
        }
    }
}

// =============================================================================
// Capability implementations
// =============================================================================

#[async_trait]
impl LookupOps for AwsCliProvider {
    async fn list_clusters(&self) -> Result<Vec<ClusterId>, ProviderError> {
        let list: ClusterList = self.call("ecs", "list-clusters", &[]).await?;
        Ok(list.cluster_arns.into_iter().map(ClusterId::new).collect())
    }

    async fn find_cluster(&self, name: &str) -> Result<Option<ClusterId>, ProviderError> {
        let found: Option<ClusterDescriptions> = self
            .lookup("ecs", "describe-clusters", &args(["--clusters", name]))
            .await?;
        Ok(found
            .into_iter()
            .flat_map(|d| d.clusters)
            .find(|c| c.status == "ACTIVE")
            .map(|c| ClusterId::new(c.cluster_arn)))
    }

    async fn find_target_group(&self, name: &str) -> Result<Option<TargetGroup>, ProviderError> {
        let found: Option<TargetGroupDescriptions> = self
            .lookup("elbv2", "describe-target-groups", &args(["--names", name]))
            .await?;
        Ok(found
            .and_then(|d| d.target_groups.into_iter().next())
            .map(|tg| TargetGroup {
                id: TargetGroupId::new(tg.target_group_arn),
                name: tg.target_group_name,
            }))
    }

    async fn find_load_balancer(&self, name: &str) -> Result<Option<LoadBalancer>, ProviderError> {
        let found: Option<LoadBalancerDescriptions> = self
            .lookup("elbv2", "describe-load-balancers", &args(["--names", name]))
            .await?;
        Ok(found
            .and_then(|d| d.load_balancers.into_iter().next())
            .map(|lb| LoadBalancer {
                id: LoadBalancerId::new(lb.load_balancer_arn),
                name: lb.load_balancer_name,
                dns_name: lb.dns_name,
            }))
    }

    async fn list_listeners(&self, lb: &LoadBalancerId) -> Result<Vec<Listener>, ProviderError> {
        let operation = "describe-listeners";
        let found: ListenerDescriptions = self
            .call(
                "elbv2",
                operation,
                &args(["--load-balancer-arn", lb.as_str()]),
            )
            .await?;
        found
            .listeners
            .into_iter()
            .map(|l| l.into_listener().context(DecodeSnafu { operation }))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ProviderError::from)
    }

    async fn describe_listener(&self, id: &ListenerId) -> Result<Listener, ProviderError> {
        let operation = "describe-listeners";
        let found: ListenerDescriptions = self
            .call("elbv2", operation, &args(["--listener-arns", id.as_str()]))
            .await?;
        let listener = found
            .listeners
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::not_found("listener", id.as_str()))?;
        Ok(listener
            .into_listener()
            .context(DecodeSnafu { operation })?)
    }

    async fn describe_rules(
        &self,
        listener: &ListenerId,
    ) -> Result<Vec<ListenerRule>, ProviderError> {
        let operation = "describe-rules";
        let found: RuleDescriptions = self
            .call(
                "elbv2",
                operation,
                &args(["--listener-arn", listener.as_str()]),
            )
            .await?;
        found
            .rules
            .into_iter()
            .map(|r| r.into_rule().context(DecodeSnafu { operation }))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ProviderError::from)
    }
}

#[async_trait]
impl RoutingOps for AwsCliProvider {
    async fn create_rule(
        &self,
        listener: &ListenerId,
        rule: &NewRule,
    ) -> Result<RuleId, ProviderError> {
        let operation = "create-rule";
        let conditions = serde_json::to_string(&[WireCondition {
            field: "path-pattern".to_string(),
            values: rule.path_patterns.clone(),
            path_pattern_config: None,
        }])
        .context(DecodeSnafu { operation })?;
        let actions = encode_actions(operation, &rule.actions)?;

        let created: RuleDescriptions = self
            .call(
                "elbv2",
                operation,
                &[
                    "--listener-arn".to_string(),
                    listener.to_string(),
                    "--priority".to_string(),
                    rule.priority.to_string(),
                    "--conditions".to_string(),
                    conditions,
                    "--actions".to_string(),
                    actions,
                ],
            )
            .await?;

        created
            .rules
            .into_iter()
            .next()
            .map(|r| RuleId::new(r.rule_arn))
            .ok_or_else(|| ProviderError::Decode {
                operation: operation.to_string(),
                message: "create-rule returned no rule".to_string(),
            })
    }

    async fn modify_rule_actions(
        &self,
        rule: &RuleId,
        actions: &[RuleAction],
    ) -> Result<(), ProviderError> {
        let operation = "modify-rule";
        let actions = encode_actions(operation, actions)?;
        self.exec(
            "elbv2",
            operation,
            &[
                "--rule-arn".to_string(),
                rule.to_string(),
                "--actions".to_string(),
                actions,
            ],
            self.command_timeout,
        )
        .await?;
        Ok(())
    }

    async fn delete_rule(&self, rule: &RuleId) -> Result<(), ProviderError> {
        self.exec(
            "elbv2",
            "delete-rule",
            &args(["--rule-arn", rule.as_str()]),
            self.command_timeout,
        )
        .await?;
        Ok(())
    }

    async fn modify_listener_default_actions(
        &self,
        listener: &ListenerId,
        actions: &[RuleAction],
    ) -> Result<(), ProviderError> {
        let operation = "modify-listener";
        let actions = encode_actions(operation, actions)?;
        self.exec(
            "elbv2",
            operation,
            &[
                "--listener-arn".to_string(),
                listener.to_string(),
                "--default-actions".to_string(),
                actions,
            ],
            self.command_timeout,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ComputeOps for AwsCliProvider {
    async fn find_service(
        &self,
        cluster: &ClusterId,
        name: &str,
    ) -> Result<Option<ServiceDescription>, ProviderError> {
        let found: Option<ServiceDescriptions> = self
            .lookup(
                "ecs",
                "describe-services",
                &args(["--cluster", cluster.as_str(), "--services", name]),
            )
            .await?;
        // Missing services are reported under `failures`, not as an error.
        Ok(found
            .into_iter()
            .flat_map(|d| d.services)
            .find(|s| s.status != "INACTIVE")
            .map(WireService::into_description))
    }

    async fn describe_task_definition(
        &self,
        id: &TaskDefinitionId,
    ) -> Result<TaskDefinition, ProviderError> {
        let envelope: TaskDefinitionEnvelope = self
            .call(
                "ecs",
                "describe-task-definition",
                &args(["--task-definition", id.as_str()]),
            )
            .await?;
        Ok(envelope.task_definition.into_task_definition())
    }

    async fn register_task_definition(
        &self,
        request: &TaskDefinitionRequest,
    ) -> Result<TaskDefinitionId, ProviderError> {
        let operation = "register-task-definition";
        let input = serde_json::to_string(request).context(DecodeSnafu { operation })?;
        let envelope: TaskDefinitionEnvelope = self
            .call(
                "ecs",
                operation,
                &["--cli-input-json".to_string(), input],
            )
            .await?;
        Ok(TaskDefinitionId::new(
            envelope.task_definition.task_definition_arn,
        ))
    }

    async fn update_service(
        &self,
        cluster: &ClusterId,
        service: &ServiceId,
        update: &ServiceUpdate,
    ) -> Result<(), ProviderError> {
        let mut argv = args([
            "--cluster",
            cluster.as_str(),
            "--service",
            service.short_name(),
            "--desired-count",
        ]);
        argv.push(update.desired_count.to_string());
        if let Some(ref task_definition) = update.task_definition {
            argv.push("--task-definition".to_string());
            argv.push(task_definition.to_string());
        }
        if update.force_new_deployment {
            argv.push("--force-new-deployment".to_string());
        }
        let _: ServiceEnvelope = self.call("ecs", "update-service", &argv).await?;
        Ok(())
    }

    async fn create_service(
        &self,
        cluster: &ClusterId,
        service: &NewService,
    ) -> Result<ServiceId, ProviderError> {
        let mut argv = args([
            "--cluster",
            cluster.as_str(),
            "--service-name",
            &service.name,
            "--task-definition",
            service.task_definition.as_str(),
            "--launch-type",
            &self.launch_type,
            "--desired-count",
        ]);
        argv.push(service.desired_count.to_string());
        if !self.subnets.is_empty() {
            argv.push("--network-configuration".to_string());
            argv.push(self.network_configuration());
        }
        let created: ServiceEnvelope = self.call("ecs", "create-service", &argv).await?;
        Ok(ServiceId::new(created.service.service_arn))
    }

    async fn wait_service_stable(
        &self,
        cluster: &ClusterId,
        service: &ServiceId,
    ) -> Result<(), ProviderError> {
        self.exec(
            "ecs",
            "wait",
            &args([
                "services-stable",
                "--cluster",
                cluster.as_str(),
                "--services",
                service.short_name(),
            ]),
            self.wait_timeout,
        )
        .await?;
        Ok(())
    }
}

impl WireService {
    fn into_description(self) -> ServiceDescription {
        ServiceDescription {
            id: ServiceId::new(self.service_arn),
            name: self.service_name,
            status: self.status,
            desired_count: self.desired_count,
            running_count: self.running_count,
            task_definition: TaskDefinitionId::new(self.task_definition),
        }
    }
}

#[async_trait]
impl HealthOps for AwsCliProvider {
    async fn describe_target_health(
        &self,
        target_group: &TargetGroupId,
    ) -> Result<Vec<TargetHealthState>, ProviderError> {
        let found: TargetHealthDescriptions = self
            .call(
                "elbv2",
                "describe-target-health",
                &args(["--target-group-arn", target_group.as_str()]),
            )
            .await?;
        Ok(found
            .target_health_descriptions
            .into_iter()
            .map(|d| d.target_health.state)
            .collect())
    }
}
