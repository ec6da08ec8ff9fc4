// ABOUTME: State transition methods for promotion orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use crate::diagnostics::{Diagnostics, Warning};
use crate::health::{ProbeMode, ProbeTarget};
use crate::provider::{NewService, Provider, ServiceUpdate};
use crate::resolve::{DeploymentTarget, NamingStrategy, Resolution, Resolver};
use crate::types::{ClusterId, ServiceId};

use super::error::PromotionError;
use super::machine::{Promotion, StageContext};
use super::record::Stage;
use super::state::{Completed, CutOver, IdleDeployed, Resolved, ScaledDown, SmokeTested};

/// Result type for transitions that hand the promotion back on failure.
pub type TransitionResult<T, S> = Result<Promotion<T>, (Promotion<S>, PromotionError)>;

// =============================================================================
// RESOLVE
// =============================================================================

impl Promotion<Resolved> {
    /// Resolve the application's infrastructure.
    ///
    /// # Errors
    ///
    /// Returns `PromotionError::ResourceNotFound` when a required resource is
    /// missing, or a provider error.
    pub async fn resolve<P>(stages: &StageContext<'_, P>) -> Result<Self, PromotionError>
    where
        P: Provider + ?Sized,
    {
        let ctx = stages.ctx;
        let target = Resolver::new(stages.provider, &ctx.settings, stages.retry())
            .resolve(&ctx.application)
            .await?;

        let mut diagnostics = Diagnostics::default();
        if let Resolution::Degraded { ref reason } = target.resolution {
            diagnostics.warn(Warning::degraded_resolution(format!(
                "{}: {}; assuming BLUE is live",
                target.application, reason
            )));
        }

        Ok(Promotion {
            target,
            diagnostics,
            state: Resolved,
        })
    }

    /// Run the new image in the idle environment.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` when registering the task definition or
    /// updating the service fails. Production routing is untouched.
    #[must_use = "promotion state must be used"]
    pub async fn deploy_idle<P>(
        self,
        stages: &StageContext<'_, P>,
    ) -> TransitionResult<IdleDeployed, Resolved>
    where
        P: Provider + ?Sized,
    {
        let deployed = self.deploy_idle_service(stages).await;
        match deployed {
            Ok(state) => Ok(self.transition(state)),
            Err(e) => Err((self, e)),
        }
    }

    async fn deploy_idle_service<P>(
        &self,
        stages: &StageContext<'_, P>,
    ) -> Result<IdleDeployed, PromotionError>
    where
        P: Provider + ?Sized,
    {
        let ctx = stages.ctx;
        let provider = stages.provider;
        let retry = stages.retry();
        let cluster = &self.target.cluster;
        let idle = self.target.idle_slot();
        let desired_count = ctx.settings.service.desired_count;

        tracing::info!(
            "Deploying {} to the {} environment of {}",
            ctx.image,
            idle.environment,
            self.target.application
        );

        match idle.service {
            Some(ref service) => {
                let current = retry
                    .run("describe-task-definition", || {
                        provider.describe_task_definition(&service.task_definition)
                    })
                    .await
                    .map_err(PromotionError::deploy("describe-task-definition"))?;
                let request = current.with_image(&ctx.image).ok_or_else(|| {
                    PromotionError::Deploy(format!(
                        "task definition {} has no container definitions",
                        current.id
                    ))
                })?;
                let task_definition = retry
                    .run("register-task-definition", || {
                        provider.register_task_definition(&request)
                    })
                    .await
                    .map_err(PromotionError::deploy("register-task-definition"))?;
                tracing::info!("Registered {}", task_definition.short_name());

                let update = ServiceUpdate {
                    desired_count,
                    task_definition: Some(task_definition.clone()),
                    force_new_deployment: true,
                };
                retry
                    .run("update-service", || {
                        provider.update_service(cluster, &service.id, &update)
                    })
                    .await
                    .map_err(PromotionError::deploy("update-service"))?;
                wait_stable(stages, cluster, &service.id).await?;

                Ok(IdleDeployed {
                    service: service.id.clone(),
                    task_definition,
                })
            }
            None => {
                let strategy =
                    NamingStrategy::new("service", ctx.settings.naming.services.clone());
                let name = strategy
                    .candidates(&self.target.application, idle.environment)
                    .into_iter()
                    .next()
                    .map(|c| c.name)
                    .ok_or_else(|| {
                        PromotionError::Deploy("no service naming template configured".to_string())
                    })?;
                tracing::info!("Creating {} service {}", idle.environment, name);

                let request = ctx
                    .settings
                    .service
                    .task_template
                    .request(&format!("{name}-task"), &ctx.image);
                let task_definition = retry
                    .run("register-task-definition", || {
                        provider.register_task_definition(&request)
                    })
                    .await
                    .map_err(PromotionError::deploy("register-task-definition"))?;

                let new_service = NewService {
                    name,
                    task_definition: task_definition.clone(),
                    desired_count,
                };
                let service = retry
                    .run("create-service", || {
                        provider.create_service(cluster, &new_service)
                    })
                    .await
                    .map_err(PromotionError::deploy("create-service"))?;
                wait_stable(stages, cluster, &service).await?;

                Ok(IdleDeployed {
                    service,
                    task_definition,
                })
            }
        }
    }
}

// =============================================================================
// DEPLOY_IDLE -> SMOKE_TEST
// =============================================================================

impl Promotion<IdleDeployed> {
    /// Probe the idle environment through a temporary test route. The route
    /// is removed whatever the verdict.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on a routing failure, or on an unhealthy
    /// verdict unless the run is forced.
    #[must_use = "promotion state must be used"]
    pub async fn smoke_test<P>(
        mut self,
        stages: &StageContext<'_, P>,
    ) -> TransitionResult<SmokeTested, IdleDeployed>
    where
        P: Provider + ?Sized,
    {
        let ctx = stages.ctx;
        let settings = &ctx.settings;
        let idle = self.target.idle();
        let probe_target = ProbeTarget {
            environment: idle,
            target_group: self.target.target_group(idle).clone(),
            health_url: Some(ctx.application.test_health_url(
                &self.target.load_balancer_dns,
                &settings.routing.test_path_suffix,
            )),
        };
        let prober = stages.prober();
        let (prober, probe_target) = (&prober, &probe_target);
        let delay = settings.routing.propagation_delay;

        let outcome = stages
            .router()
            .with_test_route(&ctx.application, idle, &self.target, |route| async move {
                if !delay.is_zero() {
                    tracing::info!(
                        "Waiting {:?} for {} to propagate",
                        delay,
                        route.pattern
                    );
                    tokio::time::sleep(delay).await;
                }
                prober
                    .probe(probe_target, ProbeMode::Http, settings.health.smoke)
                    .await
            })
            .await;

        let verdict = match outcome {
            Ok(verdict) => verdict,
            Err(e) => return Err((self, e.into())),
        };

        if !verdict.healthy {
            if !ctx.options.force {
                return Err((
                    self,
                    PromotionError::HealthCheckTimeout {
                        stage: Stage::SmokeTest,
                        attempts: verdict.attempts,
                    },
                ));
            }
            self.diagnostics.warn(Warning::forced_smoke_failure(format!(
                "smoke test of {} failed after {} attempt(s); continuing because of --force",
                idle, verdict.attempts
            )));
        } else {
            tracing::info!("Smoke test of {} passed", idle);
        }

        let service = self.state.service.clone();
        Ok(self.transition(SmokeTested { service, verdict }))
    }
}

// =============================================================================
// SMOKE_TEST -> CUTOVER
// =============================================================================

impl Promotion<SmokeTested> {
    /// Send production traffic to the idle environment.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` when the routing change fails; nothing was
    /// committed in that case.
    #[must_use = "promotion state must be used"]
    pub async fn cutover<P>(
        self,
        stages: &StageContext<'_, P>,
    ) -> TransitionResult<CutOver, SmokeTested>
    where
        P: Provider + ?Sized,
    {
        let idle = self.target.idle();
        let routed = stages
            .router()
            .route(&stages.ctx.application, idle, &self.target)
            .await;
        match routed {
            Ok(change) => {
                tracing::info!(
                    "{} production traffic now goes to {}",
                    self.target.application,
                    change.target
                );
                Ok(self.transition(CutOver {
                    change,
                    scaled_down: None,
                }))
            }
            Err(e) => Err((self, e.into())),
        }
    }
}

// =============================================================================
// CUTOVER -> DRAIN_OLD
// =============================================================================

impl Promotion<CutOver> {
    /// Wait for the new live group to be healthy, then scale the old
    /// environment's service to zero.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` so the caller can roll back.
    #[must_use = "promotion state must be used"]
    pub async fn drain_old<P>(
        mut self,
        stages: &StageContext<'_, P>,
    ) -> TransitionResult<Completed, CutOver>
    where
        P: Provider + ?Sized,
    {
        let ctx = stages.ctx;
        let new_live = self.state.change.target;
        let probe_target = ProbeTarget {
            environment: new_live,
            target_group: self.target.target_group(new_live).clone(),
            health_url: None,
        };
        let verdict = stages
            .prober()
            .probe(&probe_target, ProbeMode::Targets, ctx.settings.health.drain)
            .await;

        if !verdict.healthy {
            if !ctx.options.force {
                return Err((
                    self,
                    PromotionError::HealthCheckTimeout {
                        stage: Stage::DrainOld,
                        attempts: verdict.attempts,
                    },
                ));
            }
            self.diagnostics.warn(Warning::forced_drain_failure(format!(
                "{} targets not healthy after {} attempt(s); draining anyway because of --force",
                new_live, verdict.attempts
            )));
        }

        let old = self.target.slot(new_live.other());
        let old_service = old
            .service
            .as_ref()
            .map(|s| (s.id.clone(), s.name.clone(), s.desired_count));
        match old_service {
            Some((id, name, desired_count)) => {
                tracing::info!("Scaling {} service {} to 0", new_live.other(), name);
                let cluster = self.target.cluster.clone();
                self.state.scaled_down = Some(ScaledDown {
                    cluster: cluster.clone(),
                    service: id.clone(),
                    desired_count,
                });
                if let Err(e) = scale_to_zero(stages, &cluster, &id).await {
                    return Err((self, e));
                }
            }
            None => tracing::info!("No {} service to drain", new_live.other()),
        }

        Ok(self.transition(Completed { verdict }))
    }

    /// Restore the routing that was in place before the cutover. When the
    /// drain already asked the old service to scale down, its previous
    /// capacity is put back and awaited first.
    ///
    /// # Errors
    ///
    /// Returns `PromotionError::Deploy` when the old service cannot be scaled
    /// back, in which case routing is left on the new environment, or
    /// `PromotionError::Routing` when the restore fails; traffic may still
    /// point at the new environment.
    pub async fn rollback<P>(
        self,
        stages: &StageContext<'_, P>,
    ) -> Result<Promotion<Resolved>, PromotionError>
    where
        P: Provider + ?Sized,
    {
        tracing::warn!(
            "Rolling back {} to {}",
            self.target.application,
            self.target.live()
        );
        let Promotion {
            target,
            diagnostics,
            state,
        } = self;
        if let Some(ref scaled) = state.scaled_down {
            restore_capacity(stages, scaled).await?;
        }
        state.change.restore(&stages.router()).await?;
        Ok(Promotion {
            target,
            diagnostics,
            state: Resolved,
        })
    }
}

// =============================================================================
// DONE
// =============================================================================

impl Promotion<Completed> {
    /// Finish the promotion. The returned target has the roles swapped:
    /// the promoted environment is live.
    pub fn finish(self) -> DeploymentTarget {
        let mut target = self.target;
        target.live = target.live.other();
        target
    }
}

async fn wait_stable<P>(
    stages: &StageContext<'_, P>,
    cluster: &ClusterId,
    service: &ServiceId,
) -> Result<(), PromotionError>
where
    P: Provider + ?Sized,
{
    tracing::info!("Waiting for {} to become stable", service.short_name());
    stages
        .provider
        .wait_service_stable(cluster, service)
        .await
        .map_err(PromotionError::deploy("wait-services-stable"))
}

async fn scale_to_zero<P>(
    stages: &StageContext<'_, P>,
    cluster: &ClusterId,
    service: &ServiceId,
) -> Result<(), PromotionError>
where
    P: Provider + ?Sized,
{
    let update = ServiceUpdate::scale(0);
    stages
        .retry()
        .run("update-service", || {
            stages.provider.update_service(cluster, service, &update)
        })
        .await
        .map_err(PromotionError::deploy("update-service"))?;
    wait_stable(stages, cluster, service).await
}

async fn restore_capacity<P>(
    stages: &StageContext<'_, P>,
    scaled: &ScaledDown,
) -> Result<(), PromotionError>
where
    P: Provider + ?Sized,
{
    tracing::info!(
        "Scaling {} back to {}",
        scaled.service.short_name(),
        scaled.desired_count
    );
    let update = ServiceUpdate::scale(scaled.desired_count);
    stages
        .retry()
        .run("update-service", || {
            stages
                .provider
                .update_service(&scaled.cluster, &scaled.service, &update)
        })
        .await
        .map_err(PromotionError::deploy("update-service"))?;
    wait_stable(stages, &scaled.cluster, &scaled.service).await
}
