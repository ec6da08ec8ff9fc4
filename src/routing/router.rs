// ABOUTME: Moves an application's traffic between blue and green.
// ABOUTME: Path rules are retargeted; the primary application uses the default action.

use std::future::Future;

use crate::config::{ApplicationConfig, RoutingConfig};
use crate::provider::{
    LookupOps, NewRule, ProviderError, RetryPolicy, RoutingOps, RuleAction,
};
use crate::resolve::DeploymentTarget;
use crate::types::{Environment, RuleId};

use super::change::{RouteChange, TestRoute, Undo};
use super::priority::first_free_priority;

/// Errors from routing mutations.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("{operation} failed: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("no free listener rule priority at or above {0}")]
    NoFreePriority(u32),
}

impl RoutingError {
    fn provider(operation: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| RoutingError::Provider { operation, source }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, RoutingError::Provider { source, .. } if source.is_transient())
    }
}

/// Mutates listener rules and default actions.
pub struct TrafficRouter<'a, P: ?Sized> {
    provider: &'a P,
    settings: &'a RoutingConfig,
    retry: RetryPolicy,
}

impl<'a, P> TrafficRouter<'a, P>
where
    P: LookupOps + RoutingOps + ?Sized,
{
    pub fn new(provider: &'a P, settings: &'a RoutingConfig, retry: RetryPolicy) -> Self {
        Self {
            provider,
            settings,
            retry,
        }
    }

    /// Send all of the application's production traffic to `target`.
    pub async fn route(
        &self,
        application: &ApplicationConfig,
        target: Environment,
        deployment: &DeploymentTarget,
    ) -> Result<RouteChange, RoutingError> {
        let target_tg = deployment.target_group(target);

        if let Some(ref rule) = deployment.rule {
            tracing::info!(
                "Routing {} rule {} to {}",
                application.name,
                rule.id.short_name(),
                target
            );
            let previous = self.current_rule_actions(deployment, &rule.id).await?;
            let actions = retarget(&previous, RuleAction::Forward(target_tg.clone()));
            self.retry
                .run("modify-rule", || {
                    self.provider.modify_rule_actions(&rule.id, &actions)
                })
                .await
                .map_err(RoutingError::provider("modify-rule"))?;
            return Ok(RouteChange {
                target,
                undo: Undo::RuleActions {
                    rule: rule.id.clone(),
                    previous,
                },
            });
        }

        if application.primary {
            tracing::info!(
                "Routing primary application {} default action to {}",
                application.name,
                target
            );
            let listener = self
                .retry
                .run("describe-listeners", || {
                    self.provider.describe_listener(&deployment.listener)
                })
                .await
                .map_err(RoutingError::provider("describe-listeners"))?;
            let previous = listener.default_actions;
            let weighted =
                RuleAction::weighted_cutover(target_tg, deployment.target_group(target.other()));
            let actions = retarget(&previous, weighted);
            self.retry
                .run("modify-listener", || {
                    self.provider
                        .modify_listener_default_actions(&deployment.listener, &actions)
                })
                .await
                .map_err(RoutingError::provider("modify-listener"))?;
            return Ok(RouteChange {
                target,
                undo: Undo::DefaultActions {
                    listener: deployment.listener.clone(),
                    previous,
                },
            });
        }

        let pattern = application.rule_pattern();
        let rule = self
            .create_rule(
                deployment,
                self.settings.rule_base_priority,
                &pattern,
                RuleAction::Forward(target_tg.clone()),
            )
            .await?;
        tracing::info!(
            "Created rule {} for {} at priority {} forwarding to {}",
            rule.0.short_name(),
            pattern,
            rule.1,
            target
        );
        Ok(RouteChange {
            target,
            undo: Undo::DeleteRule { rule: rule.0 },
        })
    }

    /// Undo a committed change.
    pub async fn restore(&self, change: RouteChange) -> Result<(), RoutingError> {
        match change.undo {
            Undo::RuleActions { rule, previous } => {
                tracing::info!("Restoring previous actions of rule {}", rule.short_name());
                self.retry
                    .run("modify-rule", || {
                        self.provider.modify_rule_actions(&rule, &previous)
                    })
                    .await
                    .map_err(RoutingError::provider("modify-rule"))
            }
            Undo::DeleteRule { rule } => {
                tracing::info!("Deleting rule {}", rule.short_name());
                self.retry
                    .run("delete-rule", || self.provider.delete_rule(&rule))
                    .await
                    .map_err(RoutingError::provider("delete-rule"))
            }
            Undo::DefaultActions { listener, previous } => {
                tracing::info!("Restoring previous default action of listener");
                self.retry
                    .run("modify-listener", || {
                        self.provider
                            .modify_listener_default_actions(&listener, &previous)
                    })
                    .await
                    .map_err(RoutingError::provider("modify-listener"))
            }
        }
    }

    /// Create a temporary rule sending the test path to `target` only.
    /// Stale rules carrying the same test pattern are deleted first.
    pub async fn route_test(
        &self,
        application: &ApplicationConfig,
        target: Environment,
        deployment: &DeploymentTarget,
    ) -> Result<TestRoute, RoutingError> {
        let pattern = application.test_pattern(&self.settings.test_path_suffix);
        self.delete_stale_test_rules(deployment, &pattern).await?;

        let (rule, priority) = self
            .create_rule(
                deployment,
                self.settings.test_base_priority,
                &pattern,
                RuleAction::Forward(deployment.target_group(target).clone()),
            )
            .await?;
        tracing::info!(
            "Created test rule {} at priority {} sending {} to {}",
            rule.short_name(),
            priority,
            pattern,
            target
        );

        Ok(TestRoute {
            rule,
            priority,
            pattern,
            target,
        })
    }

    pub async fn remove_test_route(&self, route: &TestRoute) -> Result<(), RoutingError> {
        tracing::info!("Deleting test rule {}", route.rule.short_name());
        self.retry
            .run("delete-rule", || self.provider.delete_rule(&route.rule))
            .await
            .map_err(RoutingError::provider("delete-rule"))
    }

    /// Run `f` with a test route in place. The route is removed afterwards
    /// whatever `f` returns; a failed removal is reported as an error.
    pub async fn with_test_route<T, F, Fut>(
        &self,
        application: &ApplicationConfig,
        target: Environment,
        deployment: &DeploymentTarget,
        f: F,
    ) -> Result<T, RoutingError>
    where
        F: FnOnce(TestRoute) -> Fut,
        Fut: Future<Output = T>,
    {
        let route = self.route_test(application, target, deployment).await?;
        let outcome = f(route.clone()).await;
        self.remove_test_route(&route).await?;
        Ok(outcome)
    }

    async fn current_rule_actions(
        &self,
        deployment: &DeploymentTarget,
        rule: &RuleId,
    ) -> Result<Vec<RuleAction>, RoutingError> {
        let rules = self
            .retry
            .run("describe-rules", || {
                self.provider.describe_rules(&deployment.listener)
            })
            .await
            .map_err(RoutingError::provider("describe-rules"))?;
        rules
            .into_iter()
            .find(|r| &r.id == rule)
            .map(|r| r.actions)
            .ok_or_else(|| RoutingError::Provider {
                operation: "describe-rules",
                source: ProviderError::not_found("rule", rule.as_str()),
            })
    }

    async fn delete_stale_test_rules(
        &self,
        deployment: &DeploymentTarget,
        pattern: &str,
    ) -> Result<(), RoutingError> {
        let rules = self
            .retry
            .run("describe-rules", || {
                self.provider.describe_rules(&deployment.listener)
            })
            .await
            .map_err(RoutingError::provider("describe-rules"))?;

        for stale in rules
            .iter()
            .filter(|r| !r.is_default() && r.matches_pattern(pattern))
        {
            tracing::warn!(
                "Deleting stale test rule {} for {}",
                stale.id.short_name(),
                pattern
            );
            self.retry
                .run("delete-rule", || self.provider.delete_rule(&stale.id))
                .await
                .map_err(RoutingError::provider("delete-rule"))?;
        }
        Ok(())
    }

    async fn create_rule(
        &self,
        deployment: &DeploymentTarget,
        base: u32,
        pattern: &str,
        action: RuleAction,
    ) -> Result<(RuleId, u32), RoutingError> {
        let rules = self
            .retry
            .run("describe-rules", || {
                self.provider.describe_rules(&deployment.listener)
            })
            .await
            .map_err(RoutingError::provider("describe-rules"))?;
        let priority =
            first_free_priority(&rules, base).ok_or(RoutingError::NoFreePriority(base))?;

        let rule = NewRule {
            priority,
            path_patterns: vec![pattern.to_string()],
            actions: vec![action],
        };
        let router = self;
        let rule = &rule;
        let id = self
            .retry
            .run("create-rule", move || async move {
                match router.provider.create_rule(&deployment.listener, rule).await {
                    Ok(id) => Ok(id),
                    Err(e) => match router.find_created(deployment, rule).await {
                        Some(id) => {
                            tracing::warn!(
                                "create-rule reported {} but rule {} is in place; adopting it",
                                e,
                                id.short_name()
                            );
                            Ok(id)
                        }
                        None => Err(e),
                    },
                }
            })
            .await
            .map_err(RoutingError::provider("create-rule"))?;
        Ok((id, priority))
    }

    /// A rule identical to `rule` that a failed create may have left behind.
    async fn find_created(&self, deployment: &DeploymentTarget, rule: &NewRule) -> Option<RuleId> {
        let rules = self
            .provider
            .describe_rules(&deployment.listener)
            .await
            .ok()?;
        rules
            .into_iter()
            .find(|r| {
                r.priority == Some(rule.priority)
                    && r.path_patterns == rule.path_patterns
                    && r.actions == rule.actions
            })
            .map(|r| r.id)
    }
}

/// Replace the first forwarding action, keeping any other actions in place.
fn retarget(previous: &[RuleAction], forward: RuleAction) -> Vec<RuleAction> {
    let mut actions = previous.to_vec();
    match actions.iter_mut().find(|a| a.is_forward()) {
        Some(slot) => *slot = forward,
        None => actions.push(forward),
    }
    actions
}
