// ABOUTME: Records of routing mutations, kept so they can be undone.
// ABOUTME: Restoring a RouteChange puts back the exact previous actions.

use crate::provider::{LookupOps, RoutingOps, RuleAction};
use crate::types::{Environment, ListenerId, RuleId};

use super::router::{RoutingError, TrafficRouter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Undo {
    /// Put these actions back on the rule.
    RuleActions {
        rule: RuleId,
        previous: Vec<RuleAction>,
    },
    /// Delete the rule that was created.
    DeleteRule { rule: RuleId },
    /// Put these default actions back on the listener.
    DefaultActions {
        listener: ListenerId,
        previous: Vec<RuleAction>,
    },
}

/// A committed production routing change.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a route change should be kept until the promotion completes"]
pub struct RouteChange {
    /// Environment now receiving the application's traffic.
    pub target: Environment,
    pub(crate) undo: Undo,
}

impl RouteChange {
    /// Undo the change.
    pub async fn restore<P>(self, router: &TrafficRouter<'_, P>) -> Result<(), RoutingError>
    where
        P: LookupOps + RoutingOps + ?Sized,
    {
        router.restore(self).await
    }
}

/// A temporary rule sending the test path to one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRoute {
    pub rule: RuleId,
    pub priority: u32,
    pub pattern: String,
    pub target: Environment,
}
