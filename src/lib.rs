//! Deployment of container services and edge functions to AWS.
//!
//! Two pipelines are provided: [`ecs::deploy_service`] rolls an ECS service
//! out on a new image, and [`edge::deploy_edge_function`] publishes a new
//! Lambda@Edge version and points a CloudFront distribution at it. Both talk
//! to the provider through small traits so they can run against fakes.

pub mod artifact;
pub mod aws;
pub mod commands;
pub mod ecs;
pub mod edge;
pub mod env;
mod errors;
pub mod inject;
pub mod options;
pub mod term;

pub use errors::{Error, ErrorContext, ErrorKind, Result};
