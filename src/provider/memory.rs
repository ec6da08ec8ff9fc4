// ABOUTME: In-memory infrastructure provider for tests and dry rehearsals.
// ABOUTME: Simulates listeners, rules, services and target health with fault injection.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Map;

use super::ProviderError;
use super::traits::sealed::Sealed;
use super::traits::{
    ComputeOps, ContainerDefinition, HealthOps, Listener, ListenerRule, LoadBalancer, LookupOps,
    NewRule, NewService, RoutingOps, RuleAction, ServiceDescription, ServiceUpdate, TargetGroup,
    TargetHealthState, TaskDefinition, TaskDefinitionRequest, forward_action,
};
use crate::health::{HttpProbe, HttpReply, ProbeError};
use crate::types::{
    ClusterId, ListenerId, LoadBalancerId, RuleId, ServiceId, TargetGroupId, TaskDefinitionId,
};

/// Provider call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    CreateRule,
    ModifyRule,
    DeleteRule,
    ModifyListener,
    RegisterTaskDefinition,
    UpdateService,
    CreateService,
    WaitStable,
    DescribeTargetHealth,
}

/// How an injected fault behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every call fails with a deterministic API error.
    Permanent,
    /// The next `n` calls fail transiently, then calls succeed.
    Transient(u32),
    /// `after` calls succeed, then `failures` calls fail with an API error.
    After { after: u32, failures: u32 },
    /// The next `n` calls take effect but report a transient timeout.
    /// Only rule creation honours it.
    Unacknowledged(u32),
}

#[derive(Debug)]
struct ListenerEntry {
    load_balancer: LoadBalancerId,
    listener: Listener,
    rules: Vec<ListenerRule>,
}

#[derive(Debug)]
struct ServiceEntry {
    cluster: ClusterId,
    description: ServiceDescription,
}

#[derive(Debug, Default)]
struct State {
    clusters: Vec<(String, ClusterId)>,
    target_groups: Vec<TargetGroup>,
    target_health: HashMap<TargetGroupId, Vec<TargetHealthState>>,
    load_balancers: Vec<LoadBalancer>,
    listeners: Vec<ListenerEntry>,
    services: Vec<ServiceEntry>,
    task_definitions: HashMap<TaskDefinitionId, TaskDefinition>,
    revisions: HashMap<String, u32>,
    faults: HashMap<FaultPoint, Fault>,
    mutations: Vec<String>,
    next_rule: u64,
}

impl State {
    fn take_fault(&mut self, point: FaultPoint, operation: &str) -> Result<(), ProviderError> {
        match self.faults.get_mut(&point) {
            None | Some(Fault::Unacknowledged(_)) => Ok(()),
            Some(Fault::Permanent) => Err(ProviderError::api(operation, "injected failure")),
            Some(Fault::Transient(remaining)) => {
                if *remaining <= 1 {
                    self.faults.remove(&point);
                } else {
                    *remaining -= 1;
                }
                Err(ProviderError::transient(operation, "Throttling: Rate exceeded"))
            }
            Some(Fault::After { after, failures }) => {
                if *after > 0 {
                    *after -= 1;
                    return Ok(());
                }
                if *failures <= 1 {
                    self.faults.remove(&point);
                } else {
                    *failures -= 1;
                }
                Err(ProviderError::api(operation, "injected failure"))
            }
        }
    }

    /// Fail a call whose mutation has already been applied.
    fn take_late_fault(&mut self, point: FaultPoint, operation: &str) -> Result<(), ProviderError> {
        let Some(Fault::Unacknowledged(remaining)) = self.faults.get_mut(&point) else {
            return Ok(());
        };
        if *remaining <= 1 {
            self.faults.remove(&point);
        } else {
            *remaining -= 1;
        }
        Err(ProviderError::transient(operation, "Request timed out"))
    }

    fn listener_mut(&mut self, id: &ListenerId) -> Result<&mut ListenerEntry, ProviderError> {
        self.listeners
            .iter_mut()
            .find(|l| &l.listener.id == id)
            .ok_or_else(|| ProviderError::not_found("listener", id.as_str()))
    }

    fn rule_mut(&mut self, id: &RuleId) -> Result<&mut ListenerRule, ProviderError> {
        self.listeners
            .iter_mut()
            .flat_map(|l| l.rules.iter_mut())
            .find(|r| &r.id == id)
            .ok_or_else(|| ProviderError::not_found("rule", id.as_str()))
    }

    fn register(&mut self, family: &str, request: TaskDefinitionRequest) -> TaskDefinitionId {
        let revision = self.revisions.entry(family.to_string()).or_insert(0);
        *revision += 1;
        let id = TaskDefinitionId::new(format!(
            "arn:aws:ecs:local:task-definition/{}:{}",
            family, revision
        ));
        self.task_definitions.insert(
            id.clone(),
            TaskDefinition {
                id: id.clone(),
                family: request.family,
                container_definitions: request.container_definitions,
                extra: request.extra,
            },
        );
        id
    }
}

/// Provider keeping all resources in process memory.
///
/// Resources are seeded with the `add_*` builders; lookups and mutations then
/// behave like the real API, including priority collisions on rule creation.
/// It also answers HTTP health probes by routing the request path through
/// the listener the way the load balancer would.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    state: Mutex<State>,
}

impl Sealed for InMemoryProvider {}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cluster(&self, name: &str) -> ClusterId {
        let id = ClusterId::new(format!("arn:aws:ecs:local:cluster/{}", name));
        self.state.lock().clusters.push((name.to_string(), id.clone()));
        id
    }

    pub fn add_target_group(&self, name: &str) -> TargetGroupId {
        let id = TargetGroupId::new(format!(
            "arn:aws:elasticloadbalancing:local:targetgroup/{}",
            name
        ));
        self.state.lock().target_groups.push(TargetGroup {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    pub fn add_load_balancer(&self, name: &str, dns_name: &str) -> LoadBalancerId {
        let id = LoadBalancerId::new(format!(
            "arn:aws:elasticloadbalancing:local:loadbalancer/app/{}",
            name
        ));
        self.state.lock().load_balancers.push(LoadBalancer {
            id: id.clone(),
            name: name.to_string(),
            dns_name: dns_name.to_string(),
        });
        id
    }

    pub fn add_listener(
        &self,
        load_balancer: &LoadBalancerId,
        port: u16,
        default_actions: Vec<RuleAction>,
    ) -> ListenerId {
        let id = ListenerId::new(format!("{}/listener/{}", load_balancer, port));
        self.state.lock().listeners.push(ListenerEntry {
            load_balancer: load_balancer.clone(),
            listener: Listener {
                id: id.clone(),
                port,
                default_actions,
            },
            rules: Vec::new(),
        });
        id
    }

    /// Seed a rule directly, bypassing fault injection.
    pub fn add_rule(
        &self,
        listener: &ListenerId,
        priority: u32,
        path_patterns: &[&str],
        actions: Vec<RuleAction>,
    ) -> RuleId {
        let mut state = self.state.lock();
        state.next_rule += 1;
        let id = RuleId::new(format!("{}/rule/{}", listener, state.next_rule));
        if let Some(entry) = state.listeners.iter_mut().find(|l| &l.listener.id == listener) {
            entry.rules.push(ListenerRule {
                id: id.clone(),
                priority: Some(priority),
                path_patterns: path_patterns.iter().map(|p| p.to_string()).collect(),
                actions,
            });
        }
        id
    }

    /// Seed a service running `image`, with a one-container task definition.
    pub fn add_service(
        &self,
        cluster: &ClusterId,
        name: &str,
        image: &str,
        desired_count: u32,
    ) -> ServiceId {
        let mut state = self.state.lock();
        let family = format!("{}-task", name);
        let task_definition = state.register(
            &family,
            TaskDefinitionRequest {
                family: family.clone(),
                container_definitions: vec![ContainerDefinition {
                    name: "web".to_string(),
                    image: image.to_string(),
                    extra: Map::new(),
                }],
                extra: Map::new(),
            },
        );
        let id = ServiceId::new(format!(
            "arn:aws:ecs:local:service/{}/{}",
            cluster.short_name(),
            name
        ));
        state.services.push(ServiceEntry {
            cluster: cluster.clone(),
            description: ServiceDescription {
                id: id.clone(),
                name: name.to_string(),
                status: "ACTIVE".to_string(),
                desired_count,
                running_count: desired_count,
                task_definition,
            },
        });
        id
    }

    pub fn set_target_health(&self, target_group: &TargetGroupId, states: Vec<TargetHealthState>) {
        self.state
            .lock()
            .target_health
            .insert(target_group.clone(), states);
    }

    pub fn inject_fault(&self, point: FaultPoint, fault: Fault) {
        self.state.lock().faults.insert(point, fault);
    }

    pub fn clear_fault(&self, point: FaultPoint) {
        self.state.lock().faults.remove(&point);
    }

    /// Non-default rules on a listener, ordered by priority.
    pub fn rules(&self, listener: &ListenerId) -> Vec<ListenerRule> {
        let state = self.state.lock();
        let mut rules = state
            .listeners
            .iter()
            .find(|l| &l.listener.id == listener)
            .map(|l| l.rules.clone())
            .unwrap_or_default();
        rules.sort_by_key(|r| r.priority);
        rules
    }

    pub fn default_actions(&self, listener: &ListenerId) -> Vec<RuleAction> {
        self.state
            .lock()
            .listeners
            .iter()
            .find(|l| &l.listener.id == listener)
            .map(|l| l.listener.default_actions.clone())
            .unwrap_or_default()
    }

    pub fn service(&self, cluster: &ClusterId, name: &str) -> Option<ServiceDescription> {
        self.state
            .lock()
            .services
            .iter()
            .find(|s| &s.cluster == cluster && s.description.name == name)
            .map(|s| s.description.clone())
    }

    /// Image of the primary container of a service's current task definition.
    pub fn service_image(&self, cluster: &ClusterId, name: &str) -> Option<String> {
        let state = self.state.lock();
        let service = state
            .services
            .iter()
            .find(|s| &s.cluster == cluster && s.description.name == name)?;
        state
            .task_definitions
            .get(&service.description.task_definition)
            .and_then(|td| td.primary_image())
            .map(str::to_string)
    }

    /// Names of the successful mutating calls, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().mutations.clone()
    }

    /// Target group that would receive a request for `path`.
    fn route_path(&self, path: &str) -> Option<TargetGroupId> {
        let state = self.state.lock();
        let entry = state.listeners.first()?;
        let mut rules: Vec<&ListenerRule> = entry.rules.iter().collect();
        rules.sort_by_key(|r| r.priority);

        let actions = rules
            .into_iter()
            .find(|r| r.path_patterns.iter().any(|p| pattern_matches(p, path)))
            .map(|r| &r.actions)
            .unwrap_or(&entry.listener.default_actions);

        forward_action(actions)?.dominant_target().cloned()
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}

fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match without_scheme.find('/') {
        Some(idx) => &without_scheme[idx..],
        None => "/",
    }
}

#[async_trait]
impl LookupOps for InMemoryProvider {
    async fn list_clusters(&self) -> Result<Vec<ClusterId>, ProviderError> {
        Ok(self
            .state
            .lock()
            .clusters
            .iter()
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn find_cluster(&self, name: &str) -> Result<Option<ClusterId>, ProviderError> {
        Ok(self
            .state
            .lock()
            .clusters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.clone()))
    }

    async fn find_target_group(&self, name: &str) -> Result<Option<TargetGroup>, ProviderError> {
        Ok(self
            .state
            .lock()
            .target_groups
            .iter()
            .find(|tg| tg.name == name)
            .cloned())
    }

    async fn find_load_balancer(&self, name: &str) -> Result<Option<LoadBalancer>, ProviderError> {
        Ok(self
            .state
            .lock()
            .load_balancers
            .iter()
            .find(|lb| lb.name == name)
            .cloned())
    }

    async fn list_listeners(&self, lb: &LoadBalancerId) -> Result<Vec<Listener>, ProviderError> {
        Ok(self
            .state
            .lock()
            .listeners
            .iter()
            .filter(|l| &l.load_balancer == lb)
            .map(|l| l.listener.clone())
            .collect())
    }

    async fn describe_listener(&self, id: &ListenerId) -> Result<Listener, ProviderError> {
        Ok(self.state.lock().listener_mut(id)?.listener.clone())
    }

    async fn describe_rules(
        &self,
        listener: &ListenerId,
    ) -> Result<Vec<ListenerRule>, ProviderError> {
        let mut state = self.state.lock();
        let entry = state.listener_mut(listener)?;
        let mut rules = entry.rules.clone();
        rules.sort_by_key(|r| r.priority);
        rules.push(ListenerRule {
            id: RuleId::new(format!("{}/rule/default", listener)),
            priority: None,
            path_patterns: Vec::new(),
            actions: entry.listener.default_actions.clone(),
        });
        Ok(rules)
    }
}

#[async_trait]
impl RoutingOps for InMemoryProvider {
    async fn create_rule(
        &self,
        listener: &ListenerId,
        rule: &NewRule,
    ) -> Result<RuleId, ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::CreateRule, "create-rule")?;
        state.next_rule += 1;
        let id = RuleId::new(format!("{}/rule/{}", listener, state.next_rule));

        let entry = state.listener_mut(listener)?;
        if entry.rules.iter().any(|r| r.priority == Some(rule.priority)) {
            return Err(ProviderError::api(
                "create-rule",
                format!("PriorityInUse: priority {} is in use", rule.priority),
            ));
        }
        entry.rules.push(ListenerRule {
            id: id.clone(),
            priority: Some(rule.priority),
            path_patterns: rule.path_patterns.clone(),
            actions: rule.actions.clone(),
        });
        state.mutations.push("create-rule".to_string());
        state.take_late_fault(FaultPoint::CreateRule, "create-rule")?;
        Ok(id)
    }

    async fn modify_rule_actions(
        &self,
        rule: &RuleId,
        actions: &[RuleAction],
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::ModifyRule, "modify-rule")?;
        state.rule_mut(rule)?.actions = actions.to_vec();
        state.mutations.push("modify-rule".to_string());
        Ok(())
    }

    async fn delete_rule(&self, rule: &RuleId) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::DeleteRule, "delete-rule")?;
        let entry = state
            .listeners
            .iter_mut()
            .find(|l| l.rules.iter().any(|r| &r.id == rule))
            .ok_or_else(|| ProviderError::not_found("rule", rule.as_str()))?;
        entry.rules.retain(|r| &r.id != rule);
        state.mutations.push("delete-rule".to_string());
        Ok(())
    }

    async fn modify_listener_default_actions(
        &self,
        listener: &ListenerId,
        actions: &[RuleAction],
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::ModifyListener, "modify-listener")?;
        state.listener_mut(listener)?.listener.default_actions = actions.to_vec();
        state.mutations.push("modify-listener".to_string());
        Ok(())
    }
}

#[async_trait]
impl ComputeOps for InMemoryProvider {
    async fn find_service(
        &self,
        cluster: &ClusterId,
        name: &str,
    ) -> Result<Option<ServiceDescription>, ProviderError> {
        Ok(self.service(cluster, name))
    }

    async fn describe_task_definition(
        &self,
        id: &TaskDefinitionId,
    ) -> Result<TaskDefinition, ProviderError> {
        self.state
            .lock()
            .task_definitions
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found("taskDefinition", id.as_str()))
    }

    async fn register_task_definition(
        &self,
        request: &TaskDefinitionRequest,
    ) -> Result<TaskDefinitionId, ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::RegisterTaskDefinition, "register-task-definition")?;
        let id = state.register(&request.family, request.clone());
        state.mutations.push("register-task-definition".to_string());
        Ok(id)
    }

    async fn update_service(
        &self,
        cluster: &ClusterId,
        service: &ServiceId,
        update: &ServiceUpdate,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::UpdateService, "update-service")?;
        let entry = state
            .services
            .iter_mut()
            .find(|s| &s.cluster == cluster && &s.description.id == service)
            .ok_or_else(|| ProviderError::not_found("service", service.as_str()))?;
        entry.description.desired_count = update.desired_count;
        entry.description.running_count = update.desired_count;
        if let Some(ref task_definition) = update.task_definition {
            entry.description.task_definition = task_definition.clone();
        }
        state.mutations.push("update-service".to_string());
        Ok(())
    }

    async fn create_service(
        &self,
        cluster: &ClusterId,
        service: &NewService,
    ) -> Result<ServiceId, ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::CreateService, "create-service")?;
        if state
            .services
            .iter()
            .any(|s| &s.cluster == cluster && s.description.name == service.name)
        {
            return Err(ProviderError::api(
                "create-service",
                format!("service {} already exists", service.name),
            ));
        }
        let id = ServiceId::new(format!(
            "arn:aws:ecs:local:service/{}/{}",
            cluster.short_name(),
            service.name
        ));
        state.services.push(ServiceEntry {
            cluster: cluster.clone(),
            description: ServiceDescription {
                id: id.clone(),
                name: service.name.clone(),
                status: "ACTIVE".to_string(),
                desired_count: service.desired_count,
                running_count: service.desired_count,
                task_definition: service.task_definition.clone(),
            },
        });
        state.mutations.push("create-service".to_string());
        Ok(id)
    }

    async fn wait_service_stable(
        &self,
        _cluster: &ClusterId,
        _service: &ServiceId,
    ) -> Result<(), ProviderError> {
        self.state
            .lock()
            .take_fault(FaultPoint::WaitStable, "wait services-stable")
    }
}

#[async_trait]
impl HealthOps for InMemoryProvider {
    async fn describe_target_health(
        &self,
        target_group: &TargetGroupId,
    ) -> Result<Vec<TargetHealthState>, ProviderError> {
        let mut state = self.state.lock();
        state.take_fault(FaultPoint::DescribeTargetHealth, "describe-target-health")?;
        Ok(state
            .target_health
            .get(target_group)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl HttpProbe for InMemoryProvider {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpReply, ProbeError> {
        let path = url_path(url);
        let Some(target_group) = self.route_path(path) else {
            return Ok(HttpReply {
                status: 503,
                body: String::new(),
            });
        };

        let healthy = self
            .state
            .lock()
            .target_health
            .get(&target_group)
            .is_some_and(|states| {
                !states.is_empty() && states.iter().all(|s| *s == TargetHealthState::Healthy)
            });

        Ok(if healthy {
            HttpReply {
                status: 200,
                body: r#"{"status":"healthy","version":"local","service":"in-memory"}"#.to_string(),
            }
        } else {
            HttpReply {
                status: 500,
                body: r#"{"status":"unhealthy"}"#.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener_fixture() -> (InMemoryProvider, ListenerId, TargetGroupId, TargetGroupId) {
        let provider = InMemoryProvider::new();
        let blue = provider.add_target_group("blue-tg");
        let green = provider.add_target_group("green-tg");
        let lb = provider.add_load_balancer("blue-green-alb", "alb.local");
        let listener = provider.add_listener(&lb, 80, vec![RuleAction::Forward(blue.clone())]);
        (provider, listener, blue, green)
    }

    #[tokio::test]
    async fn create_rule_rejects_priority_in_use() {
        let (provider, listener, blue, _) = listener_fixture();
        provider.add_rule(&listener, 50, &["/app2*"], vec![RuleAction::Forward(blue.clone())]);

        let err = provider
            .create_rule(
                &listener,
                &NewRule {
                    priority: 50,
                    path_patterns: vec!["/app3*".into()],
                    actions: vec![RuleAction::Forward(blue)],
                },
            )
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn transient_faults_expire() {
        let (provider, listener, _, green) = listener_fixture();
        provider.inject_fault(FaultPoint::ModifyListener, Fault::Transient(1));

        let actions = [RuleAction::Forward(green.clone())];
        let first = provider
            .modify_listener_default_actions(&listener, &actions)
            .await;
        assert!(first.unwrap_err().is_transient());

        provider
            .modify_listener_default_actions(&listener, &actions)
            .await
            .unwrap();
        assert_eq!(provider.default_actions(&listener), actions.to_vec());
    }

    #[tokio::test]
    async fn delayed_faults_skip_then_fail() {
        let (provider, listener, _, green) = listener_fixture();
        provider.inject_fault(
            FaultPoint::ModifyListener,
            Fault::After {
                after: 1,
                failures: 1,
            },
        );

        let actions = [RuleAction::Forward(green)];
        assert!(provider
            .modify_listener_default_actions(&listener, &actions)
            .await
            .is_ok());
        let second = provider
            .modify_listener_default_actions(&listener, &actions)
            .await;
        assert!(!second.unwrap_err().is_transient());
        assert!(provider
            .modify_listener_default_actions(&listener, &actions)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn unacknowledged_create_still_adds_the_rule() {
        let (provider, listener, _, green) = listener_fixture();
        provider.inject_fault(FaultPoint::CreateRule, Fault::Unacknowledged(1));

        let err = provider
            .create_rule(
                &listener,
                &NewRule {
                    priority: 51,
                    path_patterns: vec!["/app3*".into()],
                    actions: vec![RuleAction::Forward(green)],
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(provider.rules(&listener).len(), 1);
    }

    #[tokio::test]
    async fn describe_rules_appends_default_rule() {
        let (provider, listener, blue, _) = listener_fixture();
        provider.add_rule(&listener, 60, &["/b*"], vec![RuleAction::Forward(blue.clone())]);
        provider.add_rule(&listener, 55, &["/a*"], vec![RuleAction::Forward(blue)]);

        let rules = provider.describe_rules(&listener).await.unwrap();
        let priorities: Vec<_> = rules.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![Some(55), Some(60), None]);
    }

    #[tokio::test]
    async fn http_probe_follows_rules_then_default_action() {
        let (provider, listener, blue, green) = listener_fixture();
        provider.add_rule(&listener, 10, &["/app2/test*"], vec![RuleAction::Forward(green.clone())]);
        provider.set_target_health(&green, vec![TargetHealthState::Healthy]);
        provider.set_target_health(&blue, vec![TargetHealthState::Unhealthy]);

        let reply = provider
            .get("http://alb.local/app2/test/health", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply.status, 200);

        let reply = provider
            .get("http://alb.local/health", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply.status, 500);
    }

    #[test]
    fn url_path_extraction() {
        assert_eq!(url_path("http://host/app2/health"), "/app2/health");
        assert_eq!(url_path("http://host"), "/");
        assert_eq!(url_path("/health"), "/health");
    }
}
