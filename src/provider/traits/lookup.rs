// ABOUTME: Resource lookup operations for the infrastructure provider.
// ABOUTME: Name-based lookups return None on a miss instead of failing.

use super::sealed::Sealed;
use super::shared_types::{Listener, ListenerRule, LoadBalancer, TargetGroup};
use crate::provider::ProviderError;
use crate::types::{ClusterId, ListenerId, LoadBalancerId};
use async_trait::async_trait;

/// Read-only lookups of pre-existing infrastructure.
#[async_trait]
pub trait LookupOps: Sealed + Send + Sync {
    /// All clusters visible to the caller, in provider order.
    async fn list_clusters(&self) -> Result<Vec<ClusterId>, ProviderError>;

    /// Find an active cluster by name.
    async fn find_cluster(&self, name: &str) -> Result<Option<ClusterId>, ProviderError>;

    /// Find a target group by exact name.
    async fn find_target_group(&self, name: &str) -> Result<Option<TargetGroup>, ProviderError>;

    /// Find a load balancer by exact name.
    async fn find_load_balancer(&self, name: &str) -> Result<Option<LoadBalancer>, ProviderError>;

    /// Listeners attached to a load balancer.
    async fn list_listeners(&self, lb: &LoadBalancerId) -> Result<Vec<Listener>, ProviderError>;

    /// Re-read one listener (default actions included).
    async fn describe_listener(&self, id: &ListenerId) -> Result<Listener, ProviderError>;

    /// All rules on a listener, including the default rule.
    async fn describe_rules(&self, listener: &ListenerId)
    -> Result<Vec<ListenerRule>, ProviderError>;
}
