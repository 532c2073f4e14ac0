use aws_sdk_cloudfront::types::DistributionConfig;
use log::debug;

use crate::{action_step, Error, ErrorKind, Result};

/// A distribution configuration whose edge-function associations can be
/// rewritten in place.
pub trait FunctionAssociations {
    /// The function ARN of every edge-function association, the default
    /// cache behavior's first, then each additional cache behavior's in order.
    fn function_arns_mut(&mut self) -> Vec<&mut String>;
}

impl FunctionAssociations for DistributionConfig {
    fn function_arns_mut(&mut self) -> Vec<&mut String> {
        let default = self
            .default_cache_behavior
            .iter_mut()
            .filter_map(|behavior| behavior.lambda_function_associations.as_mut());

        let additional = self
            .cache_behaviors
            .iter_mut()
            .flat_map(|behaviors| behaviors.items.iter_mut().flatten())
            .filter_map(|behavior| behavior.lambda_function_associations.as_mut());

        default
            .chain(additional)
            .flat_map(|associations| associations.items.iter_mut().flatten())
            .map(|association| &mut association.lambda_function_arn)
            .collect()
    }
}

/// A single association that was pointed at another function version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationChange {
    pub from: String,
    pub to: String,
}

/// Points every association whose ARN starts with `unqualified_arn` at
/// `version_arn`.
///
/// Matching is a plain prefix match, so `...:function:my-fn` also matches
/// associations bound to `...:function:my-fn-legacy:3`.
///
/// Fails when no association matches: deploying a function the distribution
/// does not use is a configuration mistake.
pub fn rewrite_associations(
    config: &mut impl FunctionAssociations,
    unqualified_arn: &str,
    version_arn: &str,
) -> Result<Vec<AssociationChange>> {
    let changes: Vec<_> = config
        .function_arns_mut()
        .into_iter()
        .filter(|arn| arn.starts_with(unqualified_arn))
        .map(|arn| {
            let from = std::mem::replace(arn, version_arn.to_string());

            action_step!("Rewiring", "`{}` to `{}`", from, version_arn);

            AssociationChange {
                from,
                to: version_arn.to_string(),
            }
        })
        .collect();

    if changes.is_empty() {
        return Err(Error::new("distribution has no function association to update")
            .with_kind(ErrorKind::NoMatchingAssociation)
            .with_explanation(format!(
                "No cache behavior of the distribution is associated with `{}`. Please check that the right distribution and function were targeted.",
                unqualified_arn
            )));
    }

    debug!("Rewrote {} association(s)", changes.len());

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use aws_sdk_cloudfront::types::{
        CacheBehavior, CacheBehaviors, DefaultCacheBehavior, EventType,
        LambdaFunctionAssociation, LambdaFunctionAssociations, ViewerProtocolPolicy,
    };

    use super::*;

    const FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:my-fn";
    const OTHER_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:auth";

    /// Cache behaviors reduced to their associated function ARNs.
    struct FakeDistribution {
        default_behavior: Vec<String>,
        behaviors: Vec<Vec<String>>,
    }

    impl FunctionAssociations for FakeDistribution {
        fn function_arns_mut(&mut self) -> Vec<&mut String> {
            self.default_behavior
                .iter_mut()
                .chain(self.behaviors.iter_mut().flatten())
                .collect()
        }
    }

    fn version(arn: &str, version: u32) -> String {
        format!("{}:{}", arn, version)
    }

    #[test]
    fn test_rewrite_associations() {
        let mut distribution = FakeDistribution {
            default_behavior: vec![version(FUNCTION_ARN, 6), version(OTHER_ARN, 2)],
            behaviors: vec![
                vec![version(OTHER_ARN, 2)],
                vec![version(OTHER_ARN, 3), version(FUNCTION_ARN, 5)],
            ],
        };

        let changes =
            rewrite_associations(&mut distribution, FUNCTION_ARN, &version(FUNCTION_ARN, 7))
                .unwrap();

        assert_eq!(
            changes,
            vec![
                AssociationChange {
                    from: version(FUNCTION_ARN, 6),
                    to: version(FUNCTION_ARN, 7),
                },
                AssociationChange {
                    from: version(FUNCTION_ARN, 5),
                    to: version(FUNCTION_ARN, 7),
                },
            ]
        );
        assert_eq!(
            distribution.default_behavior,
            vec![version(FUNCTION_ARN, 7), version(OTHER_ARN, 2)]
        );
        assert_eq!(
            distribution.behaviors,
            vec![
                vec![version(OTHER_ARN, 2)],
                vec![version(OTHER_ARN, 3), version(FUNCTION_ARN, 7)],
            ]
        );
    }

    #[test]
    fn test_rewrite_associations_without_match() {
        let mut distribution = FakeDistribution {
            default_behavior: vec![version(OTHER_ARN, 2)],
            behaviors: vec![vec![], vec![version(OTHER_ARN, 3)]],
        };

        let err =
            rewrite_associations(&mut distribution, FUNCTION_ARN, &version(FUNCTION_ARN, 7))
                .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoMatchingAssociation);
        assert_eq!(distribution.default_behavior, vec![version(OTHER_ARN, 2)]);
    }

    #[test]
    fn test_rewrite_associations_prefix_match() {
        let mut distribution = FakeDistribution {
            default_behavior: vec![version(&format!("{}-legacy", FUNCTION_ARN), 3)],
            behaviors: vec![],
        };

        let changes =
            rewrite_associations(&mut distribution, FUNCTION_ARN, &version(FUNCTION_ARN, 7))
                .unwrap();

        assert_eq!(changes.len(), 1);
    }

    fn associations(arns: &[String]) -> LambdaFunctionAssociations {
        LambdaFunctionAssociations::builder()
            .quantity(arns.len() as i32)
            .set_items(Some(
                arns.iter()
                    .map(|arn| {
                        LambdaFunctionAssociation::builder()
                            .lambda_function_arn(arn)
                            .event_type(EventType::ViewerRequest)
                            .build()
                            .unwrap()
                    })
                    .collect(),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_distribution_config_function_arns() {
        let mut config = DistributionConfig::builder()
            .caller_reference("ref")
            .comment("")
            .enabled(true)
            .default_cache_behavior(
                DefaultCacheBehavior::builder()
                    .target_origin_id("origin")
                    .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
                    .lambda_function_associations(associations(&[version(FUNCTION_ARN, 1)]))
                    .build()
                    .unwrap(),
            )
            .cache_behaviors(
                CacheBehaviors::builder()
                    .quantity(2)
                    .items(
                        CacheBehavior::builder()
                            .path_pattern("/api/*")
                            .target_origin_id("origin")
                            .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
                            .build()
                            .unwrap(),
                    )
                    .items(
                        CacheBehavior::builder()
                            .path_pattern("/img/*")
                            .target_origin_id("origin")
                            .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
                            .lambda_function_associations(associations(&[
                                version(OTHER_ARN, 1),
                                version(FUNCTION_ARN, 1),
                            ]))
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let changes =
            rewrite_associations(&mut config, FUNCTION_ARN, &version(FUNCTION_ARN, 2)).unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(
            config
                .function_arns_mut()
                .into_iter()
                .map(|arn| arn.clone())
                .collect::<Vec<_>>(),
            vec![
                version(FUNCTION_ARN, 2),
                version(OTHER_ARN, 1),
                version(FUNCTION_ARN, 2),
            ]
        );
    }
}
