// ABOUTME: Generic promotion struct parameterized by state marker.
// ABOUTME: Also holds the collaborators every stage works through.

use crate::context::PromotionContext;
use crate::diagnostics::Diagnostics;
use crate::health::{HealthProber, HttpProbe};
use crate::provider::{Provider, RetryPolicy};
use crate::resolve::{DeploymentTarget, EnvironmentSlot};
use crate::routing::TrafficRouter;
use crate::types::Environment;

/// A promotion in progress, parameterized by its current state.
///
/// The state type parameter `S` carries the data its stage produced, so a
/// `Promotion<CutOver>` always holds the route change needed to undo it.
#[derive(Debug)]
pub struct Promotion<S> {
    pub(crate) target: DeploymentTarget,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) state: S,
}

impl<S> Promotion<S> {
    /// The resolved infrastructure, as of the start of the run.
    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }

    /// Environment serving production traffic when the run started.
    pub fn live(&self) -> Environment {
        self.target.live()
    }

    /// Environment being promoted.
    pub fn idle(&self) -> Environment {
        self.target.idle()
    }

    pub fn idle_slot(&self) -> &EnvironmentSlot {
        self.target.idle_slot()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub(crate) fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn transition<T>(self, state: T) -> Promotion<T> {
        Promotion {
            target: self.target,
            diagnostics: self.diagnostics,
            state,
        }
    }
}

/// Collaborators shared by every stage of one run.
pub struct StageContext<'a, P: ?Sized> {
    pub provider: &'a P,
    pub http: &'a dyn HttpProbe,
    pub ctx: &'a PromotionContext,
}

impl<'a, P> StageContext<'a, P>
where
    P: Provider + ?Sized,
{
    pub fn new(provider: &'a P, http: &'a dyn HttpProbe, ctx: &'a PromotionContext) -> Self {
        Self { provider, http, ctx }
    }

    pub(crate) fn retry(&self) -> RetryPolicy {
        self.ctx.options.retry
    }

    pub(crate) fn router(&self) -> TrafficRouter<'a, P> {
        TrafficRouter::new(self.provider, &self.ctx.settings.routing, self.retry())
    }

    pub(crate) fn prober(&self) -> HealthProber<'a, P> {
        HealthProber::new(
            self.provider,
            self.http,
            self.ctx.settings.health.request_timeout,
        )
    }
}
