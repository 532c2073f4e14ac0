//! Lambda@Edge function deployment behind a CloudFront distribution.

mod client;
mod deploy;
mod distribution;

pub use client::{CloudFrontClient, LambdaClient};
pub use deploy::{deploy_edge_function, EdgeDeployment};
pub use distribution::{rewrite_associations, AssociationChange, FunctionAssociations};

use async_trait::async_trait;

use crate::{env::EnvVars, Result};

/// A function version, as returned when publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVersion {
    /// The version-qualified function ARN.
    pub function_arn: String,
    pub version: String,
}

/// The serverless function control plane operations an edge deployment
/// relies on.
#[async_trait]
pub trait FunctionService: Send + Sync {
    /// Uploads the function package and returns the digest the provider
    /// computed for it, if it reported one.
    async fn update_code(&self, function_name: &str, archive: Vec<u8>) -> Result<Option<String>>;

    /// Sets the handler and the environment, returning the unqualified
    /// function ARN.
    async fn update_configuration(
        &self,
        function_name: &str,
        handler: &str,
        environment: &EnvVars,
    ) -> Result<String>;

    async fn publish_version(&self, function_name: &str) -> Result<PublishedVersion>;

    /// Blocks until the last update of the function has completed.
    async fn wait_until_updated(&self, function_name: &str) -> Result<()>;
}

/// A distribution configuration with its concurrency token.
#[derive(Debug, Clone)]
pub struct DistributionSnapshot<C> {
    pub config: C,
    pub etag: String,
}

/// The CDN control plane operations an edge deployment relies on.
#[async_trait]
pub trait DistributionService: Send + Sync {
    type Config: FunctionAssociations + Send;

    async fn get_config(&self, distribution_id: &str) -> Result<DistributionSnapshot<Self::Config>>;

    /// Submits `config` on the condition that the distribution is still at
    /// `if_match`, returning the ETag the provider issued, if any.
    async fn update_config(
        &self,
        distribution_id: &str,
        config: Self::Config,
        if_match: &str,
    ) -> Result<Option<String>>;

    /// Blocks until the distribution is deployed to all edge locations.
    async fn wait_until_deployed(&self, distribution_id: &str) -> Result<()>;
}
