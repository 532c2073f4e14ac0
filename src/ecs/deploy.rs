use itertools::Itertools;
use log::debug;

use crate::{action_step, ignore_step, options::ServiceDeployOptions, Error, ErrorKind, Result};

use super::{ContainerService, TaskDefinitionRevision};

/// The outcome of a successful service deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeployment {
    pub previous_task_definition_arn: String,
    pub task_definition_arn: String,
    pub revision: i32,
    /// Whether the service was confirmed stable before returning.
    pub stable: bool,
}

/// Rolls the service out on a new task definition revision running the
/// requested image.
///
/// Any failure aborts the deployment: nothing already registered is rolled
/// back, the service scheduler owns the rollout safety.
pub async fn deploy_service(
    ecs: &impl ContainerService,
    options: &ServiceDeployOptions,
) -> Result<ServiceDeployment> {
    action_step!(
        "Describing",
        "ECS service `{}` in cluster `{}`",
        options.service,
        options.cluster
    );

    let current_arn = ecs
        .current_task_definition_arn(&options.cluster, &options.service)
        .await?;
    let task = ecs.describe_task_definition(&current_arn).await?;

    action_step!("Current", "task definition `{}`", current_arn);

    let image = options.image_reference();
    let revision =
        TaskDefinitionRevision::derive(&task, &options.container, &image, &options.container_env)?;

    action_step!(
        "Registering",
        "task definition with image `{}` for container `{}`",
        image,
        options.container
    );

    let registered = ecs.register_task_definition(revision).await?;
    let task_definition_arn = registered.task_definition_arn.clone().ok_or_else(|| {
        Error::new("registered task definition has no ARN").with_kind(ErrorKind::Provider)
    })?;

    action_step!("New", "task definition `{}`", task_definition_arn);

    if !options.container_env.is_empty() {
        action_step!(
            "Environment",
            "{}",
            options.container_env.keys().join(", ")
        );
    }

    action_step!(
        "Updating",
        "ECS service `{}` to `{}`",
        options.service,
        task_definition_arn
    );

    ecs.update_service(&options.cluster, &options.service, &task_definition_arn)
        .await?;

    if options.wait {
        action_step!("Waiting", "for ECS service `{}` stability", options.service);

        ecs.wait_until_stable(&options.cluster, &options.service)
            .await?;
    } else {
        debug!("`--wait` not specified: not waiting for the service to become stable");

        ignore_step!(
            "Skipping",
            "wait for ECS service `{}` stability",
            options.service
        );
    }

    Ok(ServiceDeployment {
        previous_task_definition_arn: current_arn,
        task_definition_arn,
        revision: registered.revision,
        stable: options.wait,
    })
}
