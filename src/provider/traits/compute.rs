// ABOUTME: Compute service operations for the infrastructure provider.
// ABOUTME: Task definitions, service updates and stability waits.

use super::sealed::Sealed;
use super::shared_types::{NewService, ServiceDescription, ServiceUpdate, TaskDefinition, TaskDefinitionRequest};
use crate::provider::ProviderError;
use crate::types::{ClusterId, ServiceId, TaskDefinitionId};
use async_trait::async_trait;

/// Operations on the container orchestration service.
#[async_trait]
pub trait ComputeOps: Sealed + Send + Sync {
    /// Find a service by name. Missing and inactive services both yield `None`.
    async fn find_service(
        &self,
        cluster: &ClusterId,
        name: &str,
    ) -> Result<Option<ServiceDescription>, ProviderError>;

    async fn describe_task_definition(
        &self,
        id: &TaskDefinitionId,
    ) -> Result<TaskDefinition, ProviderError>;

    async fn register_task_definition(
        &self,
        request: &TaskDefinitionRequest,
    ) -> Result<TaskDefinitionId, ProviderError>;

    async fn update_service(
        &self,
        cluster: &ClusterId,
        service: &ServiceId,
        update: &ServiceUpdate,
    ) -> Result<(), ProviderError>;

    async fn create_service(
        &self,
        cluster: &ClusterId,
        service: &NewService,
    ) -> Result<ServiceId, ProviderError>;

    /// Block until the provider reports the service stable.
    async fn wait_service_stable(
        &self,
        cluster: &ClusterId,
        service: &ServiceId,
    ) -> Result<(), ProviderError>;
}
