use log::{debug, warn};

use crate::{
    action_step,
    artifact::{code_sha256, ArtifactUri},
    env::EnvVars,
    ignore_step,
    inject::inject_environment,
    options::EdgeDeployOptions,
    Error, ErrorKind, Result,
};

use super::{
    rewrite_associations, AssociationChange, DistributionService, FunctionService,
    PublishedVersion,
};

/// The outcome of a successful edge function deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDeployment {
    /// The unqualified function ARN.
    pub function_arn: String,
    pub published: PublishedVersion,
    pub changes: Vec<AssociationChange>,
    pub previous_etag: String,
    pub etag: String,
    /// Whether the distribution was confirmed deployed before returning.
    pub deployed: bool,
}

/// Deploys a new version of an edge function and points the distribution at
/// it.
///
/// The steps run in a fixed order and any failure aborts the remaining ones.
/// Earlier steps are not reverted: a failure after the upload leaves the new
/// code (and possibly version) in place without the distribution using it.
pub async fn deploy_edge_function<F, D>(
    functions: &F,
    distributions: &D,
    options: &EdgeDeployOptions,
) -> Result<EdgeDeployment>
where
    F: FunctionService,
    D: DistributionService,
{
    let function_name = options.function_name.as_str();
    let distribution_id = options.cf_distribution_id.as_str();

    let uri: ArtifactUri = options.zip_file_uri.parse()?;

    action_step!("Fetching", "artifact `{}`", uri);

    let mut archive = uri.fetch().await?;

    // Edge functions are given their variables through the code itself: the
    // live environment is cleared when injecting.
    let environment = match options.inject_target() {
        Some(entry) => {
            action_step!("Injecting", "environment variables into `{}`", entry);

            archive = inject_environment(&archive, entry, &options.lambda_env)?;

            EnvVars::new()
        }
        None => options.lambda_env.clone(),
    };

    let digest = code_sha256(&archive);

    action_step!("Updating", "code for Lambda function `{}`", function_name);

    match functions.update_code(function_name, archive).await? {
        Some(remote_digest) if remote_digest != digest => warn!(
            "The uploaded code digest `{}` differs from the local one `{}`",
            remote_digest, digest
        ),
        _ => debug!("Uploaded code with digest `{}`", digest),
    }

    action_step!("Waiting", "for Lambda function `{}` update", function_name);
    functions.wait_until_updated(function_name).await?;

    action_step!(
        "Configuring",
        "Lambda function `{}` with handler `{}`",
        function_name,
        options.handler
    );

    let function_arn = functions
        .update_configuration(function_name, &options.handler, &environment)
        .await?;

    action_step!("Waiting", "for Lambda function `{}` update", function_name);
    functions.wait_until_updated(function_name).await?;

    action_step!("Publishing", "Lambda function `{}`", function_name);

    let published = functions.publish_version(function_name).await?;

    action_step!("Waiting", "for Lambda function `{}` update", function_name);
    functions.wait_until_updated(function_name).await?;

    action_step!(
        "Published",
        "version {} as `{}`",
        published.version,
        published.function_arn
    );

    action_step!(
        "Fetching",
        "configuration of CloudFront distribution `{}`",
        distribution_id
    );

    let snapshot = distributions.get_config(distribution_id).await?;
    let previous_etag = snapshot.etag;
    let mut config = snapshot.config;

    debug!(
        "Distribution `{}` is at ETag `{}`",
        distribution_id, previous_etag
    );

    let changes = rewrite_associations(&mut config, &function_arn, &published.function_arn)?;

    action_step!("Updating", "CloudFront distribution `{}`", distribution_id);

    let etag = distributions
        .update_config(distribution_id, config, &previous_etag)
        .await?;

    let etag = match etag {
        Some(etag) if etag != previous_etag => etag,
        etag => {
            return Err(Error::new(format!(
                "CloudFront distribution `{}` update was not applied",
                distribution_id
            ))
            .with_kind(ErrorKind::StaleUpdate)
            .with_explanation(
                "The update was accepted but the distribution ETag did not change, which means the new configuration did not take effect. The function version has been published but is not in use.",
            )
            .with_output(format!(
                "old etag: {}\nnew etag: {}",
                previous_etag,
                etag.as_deref().unwrap_or("<none>")
            )));
        }
    };

    action_step!(
        "Updated",
        "CloudFront distribution `{}` (ETag `{}` -> `{}`)",
        distribution_id,
        previous_etag,
        etag
    );

    if options.wait {
        action_step!(
            "Waiting",
            "for CloudFront distribution `{}` deployment",
            distribution_id
        );

        distributions.wait_until_deployed(distribution_id).await?;
    } else {
        ignore_step!(
            "Skipping",
            "wait for CloudFront distribution `{}` deployment",
            distribution_id
        );
    }

    Ok(EdgeDeployment {
        function_arn,
        published,
        changes,
        previous_etag,
        etag,
        deployed: options.wait,
    })
}
