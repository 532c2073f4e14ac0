use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudfront::{client::Waiters as _, types::DistributionConfig};
use aws_sdk_lambda::{client::Waiters as _, primitives::Blob, types::Environment};
use log::debug;

use crate::{
    aws::{
        provider_error, waiter_error, DISTRIBUTION_DEPLOYED_MAX_WAIT, FUNCTION_UPDATED_MAX_WAIT,
    },
    env::EnvVars,
    Error, ErrorKind, Result,
};

use super::{DistributionService, DistributionSnapshot, FunctionService, PublishedVersion};

/// A [`FunctionService`] backed by the AWS Lambda API.
pub struct LambdaClient {
    client: aws_sdk_lambda::Client,
}

impl LambdaClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }
}

fn missing_field(operation: &str, field: &str) -> Error {
    Error::new(format!("{} returned no {}", operation, field)).with_kind(ErrorKind::Provider)
}

#[async_trait]
impl FunctionService for LambdaClient {
    async fn update_code(&self, function_name: &str, archive: Vec<u8>) -> Result<Option<String>> {
        debug!(
            "Uploading {} byte(s) to function `{}`",
            archive.len(),
            function_name
        );

        let output = self
            .client
            .update_function_code()
            .function_name(function_name)
            .zip_file(Blob::new(archive))
            .send()
            .await
            .map_err(|err| {
                provider_error(
                    format!("failed to update code of Lambda function `{}`", function_name),
                    err,
                )
            })?;

        Ok(output.code_sha256().map(ToString::to_string))
    }

    async fn update_configuration(
        &self,
        function_name: &str,
        handler: &str,
        environment: &EnvVars,
    ) -> Result<String> {
        let variables: HashMap<String, String> = environment
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let output = self
            .client
            .update_function_configuration()
            .function_name(function_name)
            .handler(handler)
            .environment(Environment::builder().set_variables(Some(variables)).build())
            .send()
            .await
            .map_err(|err| {
                provider_error(
                    format!(
                        "failed to update configuration of Lambda function `{}`",
                        function_name
                    ),
                    err,
                )
            })?;

        output
            .function_arn()
            .map(ToString::to_string)
            .ok_or_else(|| missing_field("UpdateFunctionConfiguration", "function ARN"))
    }

    async fn publish_version(&self, function_name: &str) -> Result<PublishedVersion> {
        let output = self
            .client
            .publish_version()
            .function_name(function_name)
            .send()
            .await
            .map_err(|err| {
                provider_error(
                    format!("failed to publish Lambda function `{}`", function_name),
                    err,
                )
            })?;

        Ok(PublishedVersion {
            function_arn: output
                .function_arn()
                .ok_or_else(|| missing_field("PublishVersion", "function ARN"))?
                .to_string(),
            version: output
                .version()
                .ok_or_else(|| missing_field("PublishVersion", "version"))?
                .to_string(),
        })
    }

    async fn wait_until_updated(&self, function_name: &str) -> Result<()> {
        self.client
            .wait_until_function_updated()
            .function_name(function_name)
            .wait(FUNCTION_UPDATED_MAX_WAIT)
            .await
            .map_err(|err| {
                waiter_error(
                    format!("Lambda function `{}` update did not complete", function_name),
                    FUNCTION_UPDATED_MAX_WAIT,
                    err,
                )
            })?;

        Ok(())
    }
}

/// A [`DistributionService`] backed by the AWS CloudFront API.
pub struct CloudFrontClient {
    client: aws_sdk_cloudfront::Client,
}

impl CloudFrontClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudfront::Client::new(config),
        }
    }
}

#[async_trait]
impl DistributionService for CloudFrontClient {
    type Config = DistributionConfig;

    async fn get_config(
        &self,
        distribution_id: &str,
    ) -> Result<DistributionSnapshot<DistributionConfig>> {
        let output = self
            .client
            .get_distribution_config()
            .id(distribution_id)
            .send()
            .await
            .map_err(|err| {
                provider_error(
                    format!(
                        "failed to fetch configuration of CloudFront distribution `{}`",
                        distribution_id
                    ),
                    err,
                )
            })?;

        let config = output
            .distribution_config()
            .cloned()
            .ok_or_else(|| missing_field("GetDistributionConfig", "distribution config"))?;
        let etag = output
            .e_tag()
            .ok_or_else(|| missing_field("GetDistributionConfig", "ETag"))?
            .to_string();

        Ok(DistributionSnapshot { config, etag })
    }

    async fn update_config(
        &self,
        distribution_id: &str,
        config: DistributionConfig,
        if_match: &str,
    ) -> Result<Option<String>> {
        let output = self
            .client
            .update_distribution()
            .id(distribution_id)
            .if_match(if_match)
            .distribution_config(config)
            .send()
            .await
            .map_err(|err| {
                provider_error(
                    format!("failed to update CloudFront distribution `{}`", distribution_id),
                    err,
                )
            })?;

        Ok(output.e_tag().map(ToString::to_string))
    }

    async fn wait_until_deployed(&self, distribution_id: &str) -> Result<()> {
        self.client
            .wait_until_distribution_deployed()
            .id(distribution_id)
            .wait(DISTRIBUTION_DEPLOYED_MAX_WAIT)
            .await
            .map_err(|err| {
                waiter_error(
                    format!(
                        "CloudFront distribution `{}` was not deployed",
                        distribution_id
                    ),
                    DISTRIBUTION_DEPLOYED_MAX_WAIT,
                    err,
                )
            })?;

        Ok(())
    }
}
