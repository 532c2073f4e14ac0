//! The deployment commands and their command-line surface.
//!
//! Each command declares its flags once. The flags produce both the clap
//! subcommand and the raw options record handed to the command, so the
//! record is always validated by the command's schema rather than by clap.

use async_trait::async_trait;
use clap::{App, Arg, ArgMatches, SubCommand};
use serde_json::Value;

use crate::{
    action_step,
    aws::{sdk_config, EDGE_REGION},
    ecs::{deploy_service, EcsClient},
    edge::{deploy_edge_function, CloudFrontClient, LambdaClient},
    env::parse_env_assignments,
    options::{EdgeDeployOptions, RawOptions, ServiceDeployOptions},
    ErrorContext, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// A single string value.
    Value,
    /// Repeatable `KEY=VALUE` assignments, collected into an object.
    Assignments,
    /// A boolean switch.
    Switch,
}

/// A command-line flag and the options record field it fills.
#[derive(Debug, Clone, Copy)]
pub struct Flag {
    /// The kebab-case flag name; the record field is its camelCase form.
    pub name: &'static str,
    pub kind: FlagKind,
    /// The environment variable used when the flag is absent.
    pub env: Option<&'static str>,
    /// Whether the value is omitted from the help output.
    pub secret: bool,
    /// The value used when the flag is absent.
    pub default: Option<&'static str>,
    pub help: &'static str,
}

const fn flag(name: &'static str, kind: FlagKind, help: &'static str) -> Flag {
    Flag {
        name,
        kind,
        env: None,
        secret: false,
        default: None,
        help,
    }
}

const ACCESS_KEY: Flag = Flag {
    env: Some("AWS_ACCESS_KEY_ID"),
    ..flag("access-key", FlagKind::Value, "The AWS access key ID")
};

const SECRET_KEY: Flag = Flag {
    env: Some("AWS_SECRET_ACCESS_KEY"),
    secret: true,
    ..flag("secret-key", FlagKind::Value, "The AWS secret access key")
};

const WAIT: Flag = flag(
    "wait",
    FlagKind::Switch,
    "Wait for the deployment to converge before exiting",
);

const SERVICE_DEPLOY_FLAGS: &[Flag] = &[
    ACCESS_KEY,
    SECRET_KEY,
    Flag {
        env: Some("AWS_REGION"),
        ..flag("region", FlagKind::Value, "The AWS region of the cluster")
    },
    flag("cluster", FlagKind::Value, "The ECS cluster name"),
    flag("service", FlagKind::Value, "The ECS service name"),
    flag(
        "container",
        FlagKind::Value,
        "The name of the container to update in the task definition",
    ),
    flag("image", FlagKind::Value, "The image repository"),
    flag("image-tag", FlagKind::Value, "The image tag to deploy"),
    flag(
        "container-env",
        FlagKind::Assignments,
        "An environment variable replacing the container's environment",
    ),
    WAIT,
];

const EDGE_DEPLOY_FLAGS: &[Flag] = &[
    ACCESS_KEY,
    SECRET_KEY,
    flag(
        "lambda-env",
        FlagKind::Assignments,
        "An environment variable for the function",
    ),
    Flag {
        default: Some(""),
        ..flag(
            "lambda-env-inject",
            FlagKind::Value,
            "The archive entry to inject the environment variables into",
        )
    },
    flag("function-name", FlagKind::Value, "The Lambda function name"),
    flag("handler", FlagKind::Value, "The function handler"),
    flag(
        "zip-file-uri",
        FlagKind::Value,
        "The function package, as an http(s):// or file:// URI",
    ),
    flag(
        "cf-distribution-id",
        FlagKind::Value,
        "The CloudFront distribution using the function",
    ),
    WAIT,
];

/// Converts a kebab-case flag name into its camelCase record field.
fn field_name(flag_name: &str) -> String {
    let mut field = String::with_capacity(flag_name.len());
    let mut upper = false;

    for c in flag_name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            field.extend(c.to_uppercase());
            upper = false;
        } else {
            field.push(c);
        }
    }

    field
}

impl Flag {
    fn arg(&self) -> Arg<'static, 'static> {
        let arg = Arg::with_name(self.name).long(self.name).help(self.help);

        let arg = match self.kind {
            FlagKind::Value => arg.takes_value(true),
            FlagKind::Assignments => arg
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("KEY=VALUE"),
            FlagKind::Switch => arg,
        };

        let arg = match self.env {
            Some(env) => arg.env(env).hide_env_values(self.secret),
            None => arg,
        };

        match self.default {
            Some(default) => arg.default_value(default),
            None => arg,
        }
    }

    /// The record value of the flag, if it has one.
    ///
    /// Absent values are left out of the record so that validation reports
    /// them; assignments and switches always have one.
    fn value(&self, matches: &ArgMatches) -> Result<Option<Value>> {
        match self.kind {
            FlagKind::Value => Ok(matches
                .value_of(self.name)
                .map(|value| Value::String(value.to_string()))),
            FlagKind::Assignments => {
                let assignments = matches.values_of(self.name).into_iter().flatten();
                let vars = parse_env_assignments(assignments)
                    .with_context(format!("invalid `--{}` value", self.name))?;

                Ok(Some(Value::Object(
                    vars.into_iter()
                        .map(|(name, value)| (name, Value::String(value)))
                        .collect(),
                )))
            }
            FlagKind::Switch => Ok(Some(Value::Bool(matches.is_present(self.name)))),
        }
    }
}

/// A deployment command runnable from the command line.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn about(&self) -> &'static str;

    fn flags(&self) -> &'static [Flag];

    /// Validates the raw options and runs the deployment.
    async fn run(&self, raw: RawOptions) -> Result<()>;

    fn subcommand(&self) -> App<'static, 'static> {
        SubCommand::with_name(self.name())
            .about(self.about())
            .visible_aliases(self.aliases())
            .args(&self.flags().iter().map(Flag::arg).collect::<Vec<_>>())
    }

    /// Builds the raw options record from the parsed command line.
    fn raw_options(&self, matches: &ArgMatches) -> Result<RawOptions> {
        let mut raw = RawOptions::new();

        for flag in self.flags() {
            if let Some(value) = flag.value(matches)? {
                raw.insert(field_name(flag.name), value);
            }
        }

        Ok(raw)
    }
}

/// Every command, in the order they are listed in the help output.
pub fn commands() -> Vec<Box<dyn Command>> {
    vec![Box::new(ServiceDeployCommand), Box::new(EdgeDeployCommand)]
}

/// Deploys a new image to a container service.
pub struct ServiceDeployCommand;

#[async_trait]
impl Command for ServiceDeployCommand {
    fn name(&self) -> &'static str {
        "service-deploy"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["ecs"]
    }

    fn about(&self) -> &'static str {
        "Deploy a new image to an ECS service"
    }

    fn flags(&self) -> &'static [Flag] {
        SERVICE_DEPLOY_FLAGS
    }

    async fn run(&self, raw: RawOptions) -> Result<()> {
        let options = ServiceDeployOptions::from_raw(raw)?;

        let config = sdk_config(&options.access_key, &options.secret_key, &options.region).await;
        let ecs = EcsClient::new(&config);

        let deployment = deploy_service(&ecs, &options).await?;

        action_step!(
            "Finished",
            "ECS service `{}` runs revision {} (was `{}`)",
            options.service,
            deployment.revision,
            deployment.previous_task_definition_arn
        );

        Ok(())
    }
}

/// Deploys a new version of an edge function and rewires its distribution.
pub struct EdgeDeployCommand;

#[async_trait]
impl Command for EdgeDeployCommand {
    fn name(&self) -> &'static str {
        "edge-deploy"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["edge"]
    }

    fn about(&self) -> &'static str {
        "Deploy a Lambda@Edge function and point a CloudFront distribution at it"
    }

    fn flags(&self) -> &'static [Flag] {
        EDGE_DEPLOY_FLAGS
    }

    async fn run(&self, raw: RawOptions) -> Result<()> {
        let options = EdgeDeployOptions::from_raw(raw)?;

        let config = sdk_config(&options.access_key, &options.secret_key, EDGE_REGION).await;
        let functions = LambdaClient::new(&config);
        let distributions = CloudFrontClient::new(&config);

        let deployment = deploy_edge_function(&functions, &distributions, &options).await?;

        action_step!(
            "Finished",
            "{} association(s) now use `{}`",
            deployment.changes.len(),
            deployment.published.function_arn
        );

        Ok(())
    }
}
