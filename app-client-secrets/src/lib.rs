//! CloudFormation custom resource that keeps the Cognito app client secret in
//! Secrets Manager.
//!
//! The provider function runs on every lifecycle event of the
//! `Custom::AppClientSecrets` resource and always answers CloudFormation with
//! exactly one response document.

pub mod event;
pub mod handler;
pub mod response;

pub use event::{CustomResourceRequest, CustomResourceResponse, RequestType, ResponseStatus};
pub use handler::{SecretRetriever, SECRETS_ARN_ATTRIBUTE};
pub use response::send_response;
