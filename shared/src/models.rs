//! Shared data models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Returned to callers whenever a request could not be served.
pub const FALLBACK_MESSAGE: &str = "Something Obviously went wrong, Let me check";

/// Prefix of the secret name derived from a user pool id.
pub const SECRET_NAME_PREFIX: &str = "cognito_";

/// Name of the secret holding the app client credentials of a user pool.
pub fn secret_name_for_pool(user_pool_id: &str) -> String {
    format!("{}{}", SECRET_NAME_PREFIX, user_pool_id)
}

/// App client credentials persisted as one JSON secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClientSecrets {
    /// Client secret generated by Cognito; empty if it could not be read
    pub app_client_secret: String,
    pub user_pool_id: String,
    pub user_pool_client_id: String,
    /// Token endpoint of the hosted auth domain
    pub user_pool_oauth2_endpoint: String,
    /// Resource server prefix of the custom scopes
    pub resource_server_identifier: String,
    pub read_scope: String,
    pub write_scope: String,
}

impl AppClientSecrets {
    /// Name of the secret this record is stored under.
    pub fn secret_name(&self) -> String {
        secret_name_for_pool(&self.user_pool_id)
    }
}

/// Token endpoint response for the client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Bearer token held for the duration of one request.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            value: response.access_token,
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// Body of every API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
