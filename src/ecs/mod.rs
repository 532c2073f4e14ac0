//! Container service deployment on AWS ECS.

mod client;
mod deploy;
mod task_definition;

pub use client::EcsClient;
pub use deploy::{deploy_service, ServiceDeployment};
pub use task_definition::TaskDefinitionRevision;

use async_trait::async_trait;
use aws_sdk_ecs::types::TaskDefinition;

use crate::Result;

/// The container-orchestration control plane operations a service
/// deployment relies on.
#[async_trait]
pub trait ContainerService: Send + Sync {
    /// Returns the ARN of the task definition the service currently runs.
    async fn current_task_definition_arn(&self, cluster: &str, service: &str) -> Result<String>;

    async fn describe_task_definition(&self, task_definition_arn: &str) -> Result<TaskDefinition>;

    /// Registers a new revision and returns it as assigned by the provider.
    async fn register_task_definition(
        &self,
        revision: TaskDefinitionRevision,
    ) -> Result<TaskDefinition>;

    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition_arn: &str,
    ) -> Result<()>;

    /// Blocks until the service reports a steady state.
    async fn wait_until_stable(&self, cluster: &str, service: &str) -> Result<()>;
}
