//! Content consumers: calls the premium API on behalf of anonymous callers.
//!
//! The authorized paths first exchange the stored app client credentials for
//! an access token with the matching scope; the unauthorized path calls the
//! premium API bare and is turned away by its authorizer.
//!
//! Both calls share one time budget that ends before the invocation deadline,
//! so a slow token endpoint or API still yields the fallback message.

use lambda_http::request::RequestContext;
use lambda_http::{Body, Error, Request, RequestExt, Response};
use reqwest::Method;
use shared::http::message_response;
use shared::secrets::{evict, get_app_client_secrets, SecretStore};
use shared::{scope_for, AccessToken, Result, TokenClient, FALLBACK_MESSAGE};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Time budget for one request when the invocation deadline is unknown.
pub const DEFAULT_REQUEST_BUDGET: Duration = Duration::from_millis(2500);

/// Left for building and returning the response after the budget runs out.
const DEADLINE_MARGIN: Duration = Duration::from_millis(250);

/// Consumer API resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    UnauthorizedRead,
    AuthorizedRead,
    AuthorizedWrite,
}

impl Route {
    /// Unknown paths are served like the unauthorized read.
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/content/authorized-read" => Route::AuthorizedRead,
            "/content/authorized-write" => Route::AuthorizedWrite,
            _ => Route::UnauthorizedRead,
        }
    }

    pub fn requires_token(self) -> bool {
        !matches!(self, Route::UnauthorizedRead)
    }

    /// Verb used against the premium API.
    pub fn method(self) -> Method {
        match self {
            Route::AuthorizedWrite => Method::POST,
            _ => Method::GET,
        }
    }
}

/// Brokers tokens and proxies calls to the premium API.
pub struct ContentConsumer {
    store: Arc<dyn SecretStore>,
    token_client: TokenClient,
    http_client: reqwest::Client,
    user_pool_secrets_arn: String,
    premium_content_api_url: String,
    request_budget: Duration,
}

impl ContentConsumer {
    pub fn new(
        store: Arc<dyn SecretStore>,
        http_client: reqwest::Client,
        user_pool_secrets_arn: impl Into<String>,
        premium_content_api_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            token_client: TokenClient::new(http_client.clone()),
            http_client,
            user_pool_secrets_arn: user_pool_secrets_arn.into(),
            premium_content_api_url: premium_content_api_url.into(),
            request_budget: DEFAULT_REQUEST_BUDGET,
        }
    }

    /// Upper bound on the time spent on one request.
    pub fn with_request_budget(mut self, budget: Duration) -> Self {
        self.request_budget = budget;
        self
    }

    pub fn request_budget(&self) -> Duration {
        self.request_budget
    }

    /// Message to return for a consumer API resource path. Never fails.
    pub async fn get_content(&self, path: &str) -> String {
        self.get_content_within(path, self.request_budget).await
    }

    /// Like `get_content`, giving up with the fallback message once `budget` elapses.
    pub async fn get_content_within(&self, path: &str, budget: Duration) -> String {
        match tokio::time::timeout(budget, self.fetch_content(path)).await {
            Ok(message) => message,
            Err(_) => {
                warn!(api_path = path, budget_ms = budget.as_millis() as u64, "Premium content request timed out");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    async fn fetch_content(&self, path: &str) -> String {
        let route = Route::from_path(path);
        debug!(api_path = path, ?route, "Routing request");

        let token = if route.requires_token() {
            self.access_token(route).await
        } else {
            None
        };

        match self.call_premium_api(route.method(), token.as_ref()).await {
            Ok(message) if !message.is_empty() => message,
            Ok(_) => FALLBACK_MESSAGE.to_string(),
            Err(e) => {
                error!(status = e.status_code(), "Premium API call failed: {}", e);
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    /// Token for the route's scope; `None` when the exchange failed.
    async fn access_token(&self, route: Route) -> Option<AccessToken> {
        match self.exchange(route).await {
            Ok(token) => Some(token),
            Err(e) => {
                error!(status = e.status_code(), "Token exchange failed: {}", e);
                // credentials may have been rotated since they were cached
                evict(&self.user_pool_secrets_arn).await;
                None
            }
        }
    }

    async fn exchange(&self, route: Route) -> Result<AccessToken> {
        let secrets = get_app_client_secrets(self.store.as_ref(), &self.user_pool_secrets_arn).await?;
        let scope = match route {
            Route::AuthorizedWrite => &secrets.write_scope,
            _ => &secrets.read_scope,
        };
        let scope = scope_for(&secrets.resource_server_identifier, scope);
        self.token_client.client_credentials(&secrets, &scope).await
    }

    async fn call_premium_api(&self, method: Method, token: Option<&AccessToken>) -> Result<String> {
        let mut request = self
            .http_client
            .request(method.clone(), &self.premium_content_api_url);
        if let Some(token) = token {
            request = request.header("Authorization", &token.value);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%method, %status, "Premium API responded");

        let data: serde_json::Value = serde_json::from_str(&text)?;
        Ok(match data.get("message") {
            Some(serde_json::Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => data.to_string(),
        })
    }
}

/// API Gateway resource path of the request, falling back to the URI path.
pub fn resource_path(event: &Request) -> String {
    let from_context = match event.request_context_ref() {
        Some(RequestContext::ApiGatewayV1(context)) => context.resource_path.clone(),
        _ => None,
    };
    from_context.unwrap_or_else(|| event.uri().path().to_string())
}

/// Time left for one request: the configured budget, cut short so it ends
/// `DEADLINE_MARGIN` before the invocation deadline.
pub fn request_budget(event: &Request, configured: Duration) -> Duration {
    match event.lambda_context_ref() {
        Some(context) => {
            let remaining = context
                .deadline()
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO);
            remaining.saturating_sub(DEADLINE_MARGIN).min(configured)
        }
        None => configured,
    }
}

pub async fn handler(consumer: Arc<ContentConsumer>, event: Request) -> std::result::Result<Response<Body>, Error> {
    let path = resource_path(&event);
    let budget = request_budget(&event, consumer.request_budget());
    info!(api_path = %path, budget_ms = budget.as_millis() as u64, "Received content request");

    let message = consumer.get_content_within(&path, budget).await;
    message_response(message)
}
