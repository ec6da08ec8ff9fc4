// ABOUTME: Locates an application's live infrastructure through the provider.
// ABOUTME: Missing resources fail; an ambiguous live environment degrades to BLUE.

use crate::config::{ApplicationConfig, Config};
use crate::provider::{
    ComputeOps, Listener, ListenerRule, LookupOps, ProviderError, RetryPolicy, RuleAction,
    ServiceDescription, TargetGroup, forward_action,
};
use crate::types::{AppName, ClusterId, Environment, TargetGroupId};

use super::naming::NamingStrategy;
use super::target::{DeploymentTarget, EnvironmentSlot, Resolution};

/// Errors from resolving a deployment target.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A required resource does not exist: `cluster`, `targetGroup`,
    /// `loadBalancer` or `listener`.
    #[error("required resource not found: {0}")]
    ResourceNotFound(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Resolves `DeploymentTarget`s from configuration and provider lookups.
pub struct Resolver<'a, P: ?Sized> {
    provider: &'a P,
    settings: &'a Config,
    retry: RetryPolicy,
}

impl<'a, P> Resolver<'a, P>
where
    P: LookupOps + ComputeOps + ?Sized,
{
    pub fn new(provider: &'a P, settings: &'a Config, retry: RetryPolicy) -> Self {
        Self {
            provider,
            settings,
            retry,
        }
    }

    pub async fn resolve(
        &self,
        application: &ApplicationConfig,
    ) -> Result<DeploymentTarget, ResolveError> {
        let app = &application.name;
        tracing::info!("Resolving infrastructure for {}", app);

        let cluster = self.cluster().await?;

        let tg_strategy =
            NamingStrategy::new("targetGroup", self.settings.naming.target_groups.clone());
        let blue_tg = self
            .target_group(&tg_strategy, app, Environment::Blue)
            .await?;
        let green_tg = self
            .target_group(&tg_strategy, app, Environment::Green)
            .await?;

        let load_balancer = self
            .retry
            .run("describe-load-balancers", || {
                self.provider.find_load_balancer(&self.settings.load_balancer)
            })
            .await?
            .ok_or(ResolveError::ResourceNotFound("loadBalancer"))?;

        let listener = self.listener(&load_balancer.id).await?;
        let rules = self
            .retry
            .run("describe-rules", || self.provider.describe_rules(&listener.id))
            .await?;
        let rule = find_rule(&rules, application).cloned();

        let live_action = match (&rule, application.primary) {
            (Some(rule), _) => forward_action(&rule.actions),
            (None, true) => forward_action(&listener.default_actions),
            (None, false) => None,
        };
        let (live, resolution) = decide_live(live_action, &blue_tg.id, &green_tg.id);
        if let Resolution::Degraded { ref reason } = resolution {
            tracing::warn!("Degraded resolution for {}: {}; assuming BLUE is live", app, reason);
        }

        let svc_strategy = NamingStrategy::new("service", self.settings.naming.services.clone());
        let blue = self
            .slot(&svc_strategy, app, &cluster, Environment::Blue, blue_tg)
            .await?;
        let green = self
            .slot(&svc_strategy, app, &cluster, Environment::Green, green_tg)
            .await?;

        tracing::info!("{}: live={} idle={}", app, live, live.other());

        Ok(DeploymentTarget {
            application: app.clone(),
            primary: application.primary,
            cluster,
            load_balancer_dns: load_balancer.dns_name,
            listener: listener.id,
            rule,
            blue,
            green,
            live,
            resolution,
        })
    }

    async fn cluster(&self) -> Result<ClusterId, ResolveError> {
        let found = match self.settings.cluster {
            Some(ref name) => {
                self.retry
                    .run("describe-clusters", || self.provider.find_cluster(name))
                    .await?
            }
            None => self
                .retry
                .run("list-clusters", || self.provider.list_clusters())
                .await?
                .into_iter()
                .next(),
        };
        found.ok_or(ResolveError::ResourceNotFound("cluster"))
    }

    async fn target_group(
        &self,
        strategy: &NamingStrategy,
        app: &AppName,
        env: Environment,
    ) -> Result<TargetGroup, ResolveError> {
        for candidate in strategy.candidates(app, env) {
            tracing::debug!(
                "Looking up {} {} as '{}' (template '{}')",
                env,
                strategy.kind(),
                candidate.name,
                candidate.template
            );
            let found = self
                .retry
                .run("describe-target-groups", || {
                    self.provider.find_target_group(&candidate.name)
                })
                .await?;
            if let Some(tg) = found {
                log_choice(strategy, env, &candidate.name, candidate.is_fallback());
                return Ok(tg);
            }
        }
        Err(ResolveError::ResourceNotFound("targetGroup"))
    }

    async fn listener(
        &self,
        load_balancer: &crate::types::LoadBalancerId,
    ) -> Result<Listener, ResolveError> {
        let listeners = self
            .retry
            .run("describe-listeners", || {
                self.provider.list_listeners(load_balancer)
            })
            .await?;
        let listener = match self.settings.listener_port {
            Some(port) => listeners.into_iter().find(|l| l.port == port),
            None => listeners.into_iter().next(),
        };
        listener.ok_or(ResolveError::ResourceNotFound("listener"))
    }

    async fn slot(
        &self,
        strategy: &NamingStrategy,
        app: &AppName,
        cluster: &ClusterId,
        env: Environment,
        target_group: TargetGroup,
    ) -> Result<EnvironmentSlot, ResolveError> {
        let service = self.service(strategy, app, cluster, env).await?;
        let current_image = match service {
            Some(ref svc) => {
                let definition = self
                    .retry
                    .run("describe-task-definition", || {
                        self.provider.describe_task_definition(&svc.task_definition)
                    })
                    .await?;
                definition.primary_image().map(str::to_string)
            }
            None => None,
        };

        Ok(EnvironmentSlot {
            environment: env,
            target_group,
            service,
            current_image,
        })
    }

    async fn service(
        &self,
        strategy: &NamingStrategy,
        app: &AppName,
        cluster: &ClusterId,
        env: Environment,
    ) -> Result<Option<ServiceDescription>, ResolveError> {
        for candidate in strategy.candidates(app, env) {
            tracing::debug!("Looking up {} service as '{}'", env, candidate.name);
            let found = self
                .retry
                .run("describe-services", || {
                    self.provider.find_service(cluster, &candidate.name)
                })
                .await?;
            if let Some(service) = found {
                log_choice(strategy, env, &candidate.name, candidate.is_fallback());
                return Ok(Some(service));
            }
        }
        tracing::info!("No {} service exists yet for {}", env, app);
        Ok(None)
    }
}

fn log_choice(strategy: &NamingStrategy, env: Environment, name: &str, fallback: bool) {
    if fallback {
        tracing::warn!(
            "Using fallback {} name '{}' for {}",
            strategy.kind(),
            name,
            env
        );
    } else {
        tracing::info!("Resolved {} {} '{}'", env, strategy.kind(), name);
    }
}

/// The non-default rule whose path pattern is the prefix or the rule pattern.
fn find_rule<'r>(rules: &'r [ListenerRule], application: &ApplicationConfig) -> Option<&'r ListenerRule> {
    if application.path_prefix.is_empty() {
        return None;
    }
    let pattern = application.rule_pattern();
    rules.iter().find(|r| {
        !r.is_default()
            && (r.matches_pattern(&application.path_prefix) || r.matches_pattern(&pattern))
    })
}

/// Map the routing action onto an environment. Anything ambiguous is BLUE,
/// marked degraded.
fn decide_live(
    action: Option<&RuleAction>,
    blue: &TargetGroupId,
    green: &TargetGroupId,
) -> (Environment, Resolution) {
    let degraded = |reason: &str| {
        (
            Environment::Blue,
            Resolution::Degraded {
                reason: reason.to_string(),
            },
        )
    };

    let Some(action) = action else {
        return degraded("no forwarding action");
    };
    match action.dominant_target() {
        Some(tg) if tg == blue => (Environment::Blue, Resolution::Exact),
        Some(tg) if tg == green => (Environment::Green, Resolution::Exact),
        Some(tg) => degraded(&format!("action forwards to unknown target group {}", tg)),
        None => degraded("no single highest-weighted target group"),
    }
}
