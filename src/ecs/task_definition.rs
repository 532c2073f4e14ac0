use aws_sdk_ecs::types::{
    Compatibility, ContainerDefinition, EphemeralStorage, IpcMode, KeyValuePair, NetworkMode,
    PidMode, ProxyConfiguration, RuntimePlatform, TaskDefinition,
    TaskDefinitionPlacementConstraint, Volume,
};
use itertools::Itertools;
use log::debug;

use crate::{env::EnvVars, Error, ErrorKind, Result};

/// The document registered as a new task definition revision.
///
/// It holds the registrable fields of an existing task definition: the
/// read-only ones (ARN, revision, status...) are assigned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinitionRevision {
    pub family: Option<String>,
    pub task_role_arn: Option<String>,
    pub execution_role_arn: Option<String>,
    pub network_mode: Option<NetworkMode>,
    pub volumes: Option<Vec<Volume>>,
    pub placement_constraints: Option<Vec<TaskDefinitionPlacementConstraint>>,
    pub requires_compatibilities: Option<Vec<Compatibility>>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub runtime_platform: Option<RuntimePlatform>,
    pub ephemeral_storage: Option<EphemeralStorage>,
    pub proxy_configuration: Option<ProxyConfiguration>,
    pub pid_mode: Option<PidMode>,
    pub ipc_mode: Option<IpcMode>,
    pub container_definitions: Vec<ContainerDefinition>,
}

impl From<&TaskDefinition> for TaskDefinitionRevision {
    fn from(task: &TaskDefinition) -> Self {
        Self {
            family: task.family.clone(),
            task_role_arn: task.task_role_arn.clone(),
            execution_role_arn: task.execution_role_arn.clone(),
            network_mode: task.network_mode.clone(),
            volumes: task.volumes.clone(),
            placement_constraints: task.placement_constraints.clone(),
            requires_compatibilities: task.requires_compatibilities.clone(),
            cpu: task.cpu.clone(),
            memory: task.memory.clone(),
            runtime_platform: task.runtime_platform.clone(),
            ephemeral_storage: task.ephemeral_storage.clone(),
            proxy_configuration: task.proxy_configuration.clone(),
            pid_mode: task.pid_mode.clone(),
            ipc_mode: task.ipc_mode.clone(),
            container_definitions: task.container_definitions.clone().unwrap_or_default(),
        }
    }
}

impl TaskDefinitionRevision {
    /// Derives a new revision from `task` where the container named
    /// `container` runs `image`.
    ///
    /// The container's environment is replaced by `environment` only when it
    /// holds at least one variable: an empty override leaves the environment
    /// as it was. All other containers and fields are passed through.
    pub fn derive(
        task: &TaskDefinition,
        container: &str,
        image: &str,
        environment: &EnvVars,
    ) -> Result<Self> {
        let mut revision = Self::from(task);

        let definition = revision
            .container_definitions
            .iter_mut()
            .find(|definition| definition.name.as_deref() == Some(container))
            .ok_or_else(|| {
                Error::new(format!("container `{}` not found", container))
                    .with_kind(ErrorKind::NotFound)
                    .with_explanation(format!(
                        "The task definition `{}` has no container named `{}`. Its containers are: {}.",
                        task.task_definition_arn.as_deref().unwrap_or("<unknown>"),
                        container,
                        task.container_definitions
                            .iter()
                            .flatten()
                            .map(|definition| {
                                format!("`{}`", definition.name.as_deref().unwrap_or_default())
                            })
                            .join(", "),
                    ))
            })?;

        debug!(
            "Replacing image `{}` with `{}` in container `{}`",
            definition.image.as_deref().unwrap_or_default(),
            image,
            container
        );

        definition.image = Some(image.to_string());

        if !environment.is_empty() {
            definition.environment = Some(
                environment
                    .iter()
                    .map(|(name, value)| KeyValuePair::builder().name(name).value(value).build())
                    .collect(),
            );
        }

        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(name: &str, image: &str) -> ContainerDefinition {
        ContainerDefinition::builder()
            .name(name)
            .image(image)
            .cpu(128)
            .build()
    }

    fn task_definition() -> TaskDefinition {
        TaskDefinition::builder()
            .task_definition_arn("arn:aws:ecs:eu-central-1:123456789012:task-definition/web:4")
            .revision(4)
            .family("web")
            .task_role_arn("arn:aws:iam::123456789012:role/web-task")
            .execution_role_arn("arn:aws:iam::123456789012:role/web-exec")
            .network_mode(NetworkMode::Awsvpc)
            .requires_compatibilities(Compatibility::Fargate)
            .cpu("256")
            .memory("512")
            .container_definitions(container("proxy", "nginx:1.25"))
            .container_definitions(
                ContainerDefinition::builder()
                    .name("app")
                    .image("app:1.0")
                    .environment(KeyValuePair::builder().name("OLD").value("1").build())
                    .build(),
            )
            .container_definitions(container("sidecar", "datadog/agent:7"))
            .build()
    }

    fn env(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_derive_replaces_only_target_image() {
        let task = task_definition();
        let revision =
            TaskDefinitionRevision::derive(&task, "app", "app:1.1", &EnvVars::new()).unwrap();

        let original = task.container_definitions.clone().unwrap();

        assert_eq!(revision.container_definitions.len(), 3);
        assert_eq!(revision.container_definitions[0], original[0]);
        assert_eq!(revision.container_definitions[2], original[2]);
        assert_eq!(
            revision.container_definitions[1].image.as_deref(),
            Some("app:1.1")
        );
        assert_eq!(
            revision.container_definitions[1].environment,
            original[1].environment
        );

        let expected = TaskDefinitionRevision {
            container_definitions: revision.container_definitions.clone(),
            ..TaskDefinitionRevision::from(&task)
        };
        assert_eq!(revision, expected);
        assert_eq!(revision.family.as_deref(), Some("web"));
        assert_eq!(revision.network_mode, Some(NetworkMode::Awsvpc));
        assert_eq!(revision.cpu.as_deref(), Some("256"));
        assert_eq!(revision.memory.as_deref(), Some("512"));
    }

    #[test]
    fn test_derive_empty_environment_leaves_field_absent() {
        let task = task_definition();
        let revision =
            TaskDefinitionRevision::derive(&task, "proxy", "nginx:1.26", &EnvVars::new()).unwrap();

        assert_eq!(revision.container_definitions[0].environment, None);
    }

    #[test]
    fn test_derive_environment_replaces_entirely() {
        let task = task_definition();
        let revision = TaskDefinitionRevision::derive(
            &task,
            "app",
            "app:1.1",
            &env(&[("B", "2"), ("A", "")]),
        )
        .unwrap();

        let environment = revision.container_definitions[1]
            .environment
            .clone()
            .unwrap();

        assert_eq!(
            environment
                .iter()
                .map(|pair| (pair.name.as_deref().unwrap(), pair.value.as_deref().unwrap()))
                .collect::<Vec<_>>(),
            vec![("B", "2"), ("A", "")]
        );
        assert_eq!(revision.container_definitions[0].environment, None);
        assert_eq!(revision.container_definitions[2].environment, None);
    }

    #[test]
    fn test_derive_unknown_container() {
        let err = TaskDefinitionRevision::derive(
            &task_definition(),
            "db",
            "postgres:16",
            &EnvVars::new(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.explanation().unwrap().contains("`proxy`, `app`, `sidecar`"));
    }
}
