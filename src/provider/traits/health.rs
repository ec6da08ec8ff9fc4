// ABOUTME: Target health operations for the infrastructure provider.
// ABOUTME: Reports per-target health states of a target group.

use super::sealed::Sealed;
use super::shared_types::TargetHealthState;
use crate::provider::ProviderError;
use crate::types::TargetGroupId;
use async_trait::async_trait;

#[async_trait]
pub trait HealthOps: Sealed + Send + Sync {
    /// Health state of every target registered in the group.
    async fn describe_target_health(
        &self,
        target_group: &TargetGroupId,
    ) -> Result<Vec<TargetHealthState>, ProviderError>;
}
