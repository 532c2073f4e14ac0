//! Shared plumbing for the AWS control-plane clients.

use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_smithy_runtime_api::client::waiters::error::WaiterError;
use log::debug;

use crate::{Error, ErrorKind};

/// Lambda@Edge functions and CloudFront configuration are only managed from
/// this region.
pub const EDGE_REGION: &str = "us-east-1";

pub const FUNCTION_UPDATED_MAX_WAIT: Duration = Duration::from_secs(5 * 60);
pub const SERVICES_STABLE_MAX_WAIT: Duration = Duration::from_secs(10 * 60);
pub const DISTRIBUTION_DEPLOYED_MAX_WAIT: Duration = Duration::from_secs(35 * 60);

const CREDENTIALS_PROVIDER_NAME: &str = "cloud-deploy";

/// Loads the SDK configuration for the given static credentials and region.
pub async fn sdk_config(access_key: &str, secret_key: &str, region: &str) -> SdkConfig {
    debug!(
        "Loading AWS configuration for access key `{}` in region `{}`",
        access_key, region
    );

    let credentials = Credentials::new(
        access_key,
        secret_key,
        None,
        None,
        CREDENTIALS_PROVIDER_NAME,
    );

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(credentials)
        .load()
        .await
}

/// Wraps a rejected control-plane call, keeping the full error chain as output.
pub fn provider_error<E>(description: impl Into<String>, err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::new(description)
        .with_kind(ErrorKind::Provider)
        .with_output(DisplayErrorContext(&err).to_string())
        .with_source(err)
}

/// Wraps a waiter failure: running out of time is a convergence timeout,
/// anything else is a provider error.
pub fn waiter_error<O, E>(
    description: impl Into<String>,
    max_wait: Duration,
    err: WaiterError<O, E>,
) -> Error
where
    WaiterError<O, E>: std::error::Error + Send + Sync + 'static,
{
    match err {
        WaiterError::ExceededMaxWait(_) => Error::new(description)
            .with_kind(ErrorKind::ConvergenceTimeout)
            .with_explanation(format!(
                "The resource did not converge within {} second(s). The change may still be in progress: check its state before trying again.",
                max_wait.as_secs()
            )),
        err => provider_error(description, err),
    }
}
