//! OAuth2 client-credentials token exchange against the Cognito token endpoint.

use chrono::Utc;
use tracing::{debug, warn};

use crate::models::{AccessToken, AppClientSecrets, TokenResponse};
use crate::{Error, Result};

/// Full scope name, `identifier/scope`.
pub fn scope_for(resource_server_identifier: &str, scope: &str) -> String {
    format!("{}/{}", resource_server_identifier, scope)
}

/// Client for the token endpoint.
#[derive(Clone)]
pub struct TokenClient {
    http_client: reqwest::Client,
}

impl TokenClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Exchange the app client's credentials for an access token carrying `scope`.
    pub async fn client_credentials(
        &self,
        secrets: &AppClientSecrets,
        scope: &str,
    ) -> Result<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", secrets.user_pool_client_id.as_str()),
            ("client_secret", secrets.app_client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self
            .http_client
            .post(&secrets.user_pool_oauth2_endpoint)
            .basic_auth(&secrets.user_pool_client_id, Some(&secrets.app_client_secret))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Token endpoint refused client credentials");
            return Err(Error::Auth(format!("Token exchange failed ({}): {}", status, error_text)));
        }

        let body = response.text().await?;
        let token_response: TokenResponse = serde_json::from_str(&body)?;
        let token = AccessToken::from_response(token_response, Utc::now());
        debug!(scope, expires_at = ?token.expires_at, "Obtained access token");

        Ok(token)
    }
}
