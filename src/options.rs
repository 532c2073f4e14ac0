//! Validation of the options given to the deployment commands.
//!
//! Options arrive as a raw record (a JSON object keyed by camelCase field
//! names). Each command checks the record against its schema, reporting every
//! violation at once, before deserializing it into its typed options. Nothing
//! is defaulted or coerced: the record must have exactly the expected shape.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{env::EnvVars, Error, ErrorKind, Result};

/// The raw options record, as produced by the command line.
pub type RawOptions = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    /// A non-empty string.
    String,
    /// A string, possibly empty.
    EmptyableString,
    Boolean,
    /// An object mapping variable names to string values.
    EnvMap,
}

impl FieldType {
    fn check(self, value: &Value) -> std::result::Result<(), String> {
        match (self, value) {
            (Self::String, Value::String(s)) if s.is_empty() => {
                Err("must not be empty".to_string())
            }
            (Self::String | Self::EmptyableString, Value::String(_)) => Ok(()),
            (Self::Boolean, Value::Bool(_)) => Ok(()),
            (Self::EnvMap, Value::Object(vars)) => {
                let invalid: Vec<_> = vars
                    .iter()
                    .filter(|(_, value)| !value.is_string())
                    .map(|(name, _)| format!("`{}`", name))
                    .collect();

                if invalid.is_empty() {
                    Ok(())
                } else {
                    Err(format!(
                        "must map to string values only, but {} do not",
                        invalid.join(", ")
                    ))
                }
            }
            (expected, _) => Err(format!("must be {}", expected.describe())),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::String | Self::EmptyableString => "a string",
            Self::Boolean => "a boolean",
            Self::EnvMap => "an object of environment variables",
        }
    }
}

struct FieldSchema {
    name: &'static str,
    field_type: FieldType,
}

const fn field(name: &'static str, field_type: FieldType) -> FieldSchema {
    FieldSchema { name, field_type }
}

/// The expected shape of a raw options record. Every listed field is required.
pub struct Schema {
    command: &'static str,
    fields: &'static [FieldSchema],
}

pub const SERVICE_DEPLOY_SCHEMA: Schema = Schema {
    command: "service-deploy",
    fields: &[
        field("accessKey", FieldType::String),
        field("secretKey", FieldType::String),
        field("region", FieldType::String),
        field("cluster", FieldType::String),
        field("service", FieldType::String),
        field("container", FieldType::String),
        field("image", FieldType::String),
        field("imageTag", FieldType::String),
        field("containerEnv", FieldType::EnvMap),
        field("wait", FieldType::Boolean),
    ],
};

pub const EDGE_DEPLOY_SCHEMA: Schema = Schema {
    command: "edge-deploy",
    fields: &[
        field("accessKey", FieldType::String),
        field("secretKey", FieldType::String),
        field("lambdaEnv", FieldType::EnvMap),
        field("lambdaEnvInject", FieldType::EmptyableString),
        field("functionName", FieldType::String),
        field("handler", FieldType::String),
        field("zipFileUri", FieldType::String),
        field("cfDistributionId", FieldType::String),
        field("wait", FieldType::Boolean),
    ],
};

impl Schema {
    /// Checks the record, collecting all violations rather than stopping at
    /// the first one.
    pub fn validate(&self, raw: &RawOptions) -> Result<()> {
        let mut violations = vec![];

        for field in self.fields {
            match raw.get(field.name) {
                None => violations.push(format!("`{}` is required", field.name)),
                Some(value) => {
                    if let Err(reason) = field.field_type.check(value) {
                        violations.push(format!("`{}` {}", field.name, reason));
                    }
                }
            }
        }

        for name in raw.keys() {
            if !self.fields.iter().any(|field| field.name == name) {
                violations.push(format!("`{}` is not allowed", name));
            }
        }

        if violations.is_empty() {
            return Ok(());
        }

        Err(Error::new(format!("invalid `{}` options", self.command))
            .with_kind(ErrorKind::Validation)
            .with_explanation(format!(
                "{} problem(s) were found in the options. Nothing has been deployed.",
                violations.len()
            ))
            .with_output(violations.join("\n")))
    }

    /// Validates the record, then deserializes it into its typed options.
    pub fn parse<T: DeserializeOwned>(&self, raw: RawOptions) -> Result<T> {
        self.validate(&raw)?;

        serde_json::from_value(Value::Object(raw)).map_err(|err| {
            Error::new(format!("invalid `{}` options", self.command))
                .with_kind(ErrorKind::Validation)
                .with_source(err)
        })
    }
}

/// Options of the container service deployment.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ServiceDeployOptions {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub cluster: String,
    pub service: String,
    pub container: String,
    pub image: String,
    pub image_tag: String,
    pub container_env: EnvVars,
    pub wait: bool,
}

impl ServiceDeployOptions {
    pub fn from_raw(raw: RawOptions) -> Result<Self> {
        SERVICE_DEPLOY_SCHEMA.parse(raw)
    }

    /// The full image reference, `<image>:<tag>`.
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image, self.image_tag)
    }
}

impl Debug for ServiceDeployOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDeployOptions")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("cluster", &self.cluster)
            .field("service", &self.service)
            .field("container", &self.container)
            .field("image", &self.image)
            .field("image_tag", &self.image_tag)
            .field("container_env", &self.container_env)
            .field("wait", &self.wait)
            .finish()
    }
}

/// Options of the edge function deployment.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EdgeDeployOptions {
    pub access_key: String,
    pub secret_key: String,
    pub lambda_env: EnvVars,
    pub lambda_env_inject: String,
    pub function_name: String,
    pub handler: String,
    pub zip_file_uri: String,
    pub cf_distribution_id: String,
    pub wait: bool,
}

impl EdgeDeployOptions {
    pub fn from_raw(raw: RawOptions) -> Result<Self> {
        EDGE_DEPLOY_SCHEMA.parse(raw)
    }

    /// The archive entry receiving the environment variables, if any.
    pub fn inject_target(&self) -> Option<&str> {
        if self.lambda_env_inject.is_empty() {
            None
        } else {
            Some(&self.lambda_env_inject)
        }
    }
}

impl Debug for EdgeDeployOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeDeployOptions")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("lambda_env", &self.lambda_env)
            .field("lambda_env_inject", &self.lambda_env_inject)
            .field("function_name", &self.function_name)
            .field("handler", &self.handler)
            .field("zip_file_uri", &self.zip_file_uri)
            .field("cf_distribution_id", &self.cf_distribution_id)
            .field("wait", &self.wait)
            .finish()
    }
}
