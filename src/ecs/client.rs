use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs::{client::Waiters, types::TaskDefinition};
use log::debug;

use crate::{
    aws::{provider_error, waiter_error, SERVICES_STABLE_MAX_WAIT},
    Error, ErrorKind, Result,
};

use super::{ContainerService, TaskDefinitionRevision};

/// A [`ContainerService`] backed by the AWS ECS API.
pub struct EcsClient {
    client: aws_sdk_ecs::Client,
}

impl EcsClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ecs::Client::new(config),
        }
    }
}

#[async_trait]
impl ContainerService for EcsClient {
    async fn current_task_definition_arn(&self, cluster: &str, service: &str) -> Result<String> {
        let output = self
            .client
            .describe_services()
            .cluster(cluster)
            .services(service)
            .send()
            .await
            .map_err(|err| {
                provider_error(format!("failed to describe ECS service `{}`", service), err)
            })?;

        let description = match output.services().first() {
            Some(description) => description,
            None => {
                let reasons = output
                    .failures()
                    .iter()
                    .map(|failure| {
                        format!(
                            "{}: {}",
                            failure.arn().unwrap_or(service),
                            failure.reason().unwrap_or("unknown reason")
                        )
                    })
                    .collect::<Vec<_>>();

                return Err(Error::new(format!("ECS service `{}` not found", service))
                    .with_kind(ErrorKind::NotFound)
                    .with_explanation(format!(
                        "The service `{}` could not be found in the cluster `{}`. Please check the cluster and service names and the region.",
                        service, cluster
                    ))
                    .with_output(reasons.join("\n")));
            }
        };

        description
            .task_definition()
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::new(format!("ECS service `{}` has no task definition", service))
                    .with_kind(ErrorKind::NotFound)
            })
    }

    async fn describe_task_definition(&self, task_definition_arn: &str) -> Result<TaskDefinition> {
        let output = self
            .client
            .describe_task_definition()
            .task_definition(task_definition_arn)
            .send()
            .await
            .map_err(|err| {
                provider_error(
                    format!("failed to describe task definition `{}`", task_definition_arn),
                    err,
                )
            })?;

        output.task_definition().cloned().ok_or_else(|| {
            Error::new(format!("task definition `{}` not found", task_definition_arn))
                .with_kind(ErrorKind::NotFound)
        })
    }

    async fn register_task_definition(
        &self,
        revision: TaskDefinitionRevision,
    ) -> Result<TaskDefinition> {
        let family = revision.family.clone().unwrap_or_default();

        debug!(
            "Registering a new revision of task definition family `{}` with {} container(s)",
            family,
            revision.container_definitions.len()
        );

        let output = self
            .client
            .register_task_definition()
            .set_family(revision.family)
            .set_task_role_arn(revision.task_role_arn)
            .set_execution_role_arn(revision.execution_role_arn)
            .set_network_mode(revision.network_mode)
            .set_volumes(revision.volumes)
            .set_placement_constraints(revision.placement_constraints)
            .set_requires_compatibilities(revision.requires_compatibilities)
            .set_cpu(revision.cpu)
            .set_memory(revision.memory)
            .set_runtime_platform(revision.runtime_platform)
            .set_ephemeral_storage(revision.ephemeral_storage)
            .set_proxy_configuration(revision.proxy_configuration)
            .set_pid_mode(revision.pid_mode)
            .set_ipc_mode(revision.ipc_mode)
            .set_container_definitions(Some(revision.container_definitions))
            .send()
            .await
            .map_err(|err| {
                provider_error(
                    format!("failed to register task definition family `{}`", family),
                    err,
                )
            })?;

        output.task_definition().cloned().ok_or_else(|| {
            Error::new(format!(
                "registering task definition family `{}` returned no task definition",
                family
            ))
            .with_kind(ErrorKind::Provider)
        })
    }

    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition_arn: &str,
    ) -> Result<()> {
        self.client
            .update_service()
            .cluster(cluster)
            .service(service)
            .task_definition(task_definition_arn)
            .send()
            .await
            .map_err(|err| {
                provider_error(format!("failed to update ECS service `{}`", service), err)
            })?;

        Ok(())
    }

    async fn wait_until_stable(&self, cluster: &str, service: &str) -> Result<()> {
        self.client
            .wait_until_services_stable()
            .cluster(cluster)
            .services(service)
            .wait(SERVICES_STABLE_MAX_WAIT)
            .await
            .map_err(|err| {
                waiter_error(
                    format!("ECS service `{}` did not become stable", service),
                    SERVICES_STABLE_MAX_WAIT,
                    err,
                )
            })?;

        Ok(())
    }
}
