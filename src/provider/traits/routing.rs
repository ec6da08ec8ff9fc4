// ABOUTME: Listener mutation operations for the infrastructure provider.
// ABOUTME: Each call succeeds or fails atomically from the caller's view.

use super::sealed::Sealed;
use super::shared_types::{NewRule, RuleAction};
use crate::provider::ProviderError;
use crate::types::{ListenerId, RuleId};
use async_trait::async_trait;

/// Mutations of the shared listener: rules and default actions.
#[async_trait]
pub trait RoutingOps: Sealed + Send + Sync {
    /// Create a rule. Fails if the priority is already taken.
    async fn create_rule(&self, listener: &ListenerId, rule: &NewRule)
    -> Result<RuleId, ProviderError>;

    /// Replace the actions of an existing rule.
    async fn modify_rule_actions(
        &self,
        rule: &RuleId,
        actions: &[RuleAction],
    ) -> Result<(), ProviderError>;

    /// Delete a rule.
    async fn delete_rule(&self, rule: &RuleId) -> Result<(), ProviderError>;

    /// Replace the listener's default actions.
    async fn modify_listener_default_actions(
        &self,
        listener: &ListenerId,
        actions: &[RuleAction],
    ) -> Result<(), ProviderError>;
}
