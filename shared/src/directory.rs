//! Cognito user pool lookups.

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;

use crate::{Error, Result};

/// Read access to the user directory's app clients.
#[async_trait]
pub trait UserPoolDirectory: Send + Sync {
    /// Secret of an app client, `None` if the client has no secret.
    async fn app_client_secret(&self, user_pool_id: &str, client_id: &str) -> Result<Option<String>>;
}

/// `UserPoolDirectory` backed by the Cognito Identity Provider API.
#[derive(Clone)]
pub struct CognitoDirectory {
    client: CognitoClient,
}

impl CognitoDirectory {
    pub fn new(client: CognitoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserPoolDirectory for CognitoDirectory {
    async fn app_client_secret(&self, user_pool_id: &str, client_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .describe_user_pool_client()
            .user_pool_id(user_pool_id)
            .client_id(client_id)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to describe user pool client: {}", e)))?;

        Ok(response
            .user_pool_client()
            .and_then(|c| c.client_secret())
            .map(String::from))
    }
}
