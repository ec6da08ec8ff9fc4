// ABOUTME: Promotion state marker types for the type state pattern.
// ABOUTME: States carry the data produced by the stage that reached them.

use crate::health::HealthVerdict;
use crate::routing::RouteChange;
use crate::types::{ClusterId, ServiceId, TaskDefinitionId};

/// Infrastructure resolved, nothing mutated yet.
/// Available actions: `deploy_idle()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolved;

/// The idle service runs the new image.
/// Available actions: `smoke_test()`
#[derive(Debug, Clone)]
pub struct IdleDeployed {
    pub service: ServiceId,
    pub task_definition: TaskDefinitionId,
}

/// The idle environment answered through the test route, or `--force`
/// overrode the verdict.
/// Available actions: `cutover()`
#[derive(Debug, Clone)]
pub struct SmokeTested {
    pub service: ServiceId,
    pub verdict: HealthVerdict,
}

/// Production traffic points at the former idle environment.
/// Available actions: `drain_old()`, `rollback()`
#[derive(Debug)]
pub struct CutOver {
    pub(crate) change: RouteChange,
    /// Set once the drain has asked the old service to scale down.
    pub(crate) scaled_down: Option<ScaledDown>,
}

/// The old service's capacity before the drain touched it.
#[derive(Debug, Clone)]
pub(crate) struct ScaledDown {
    pub(crate) cluster: ClusterId,
    pub(crate) service: ServiceId,
    pub(crate) desired_count: u32,
}

/// The old environment is scaled down.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub verdict: HealthVerdict,
}
