//! Configuration management for Lambda functions.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Configuration of the content consumer function.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// ARN of the secret holding the app client credentials
    pub user_pool_secrets_arn: String,
    /// URL of the premium content resource
    pub premium_content_api_url: String,
    /// Timeout of each outbound HTTP call, and of one request as a whole
    pub http_timeout: Duration,
}

impl ConsumerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            user_pool_secrets_arn: required("USER_POOL_SECRETS_ARN")?,
            premium_content_api_url: required("PREMIUM_CONTENT_API_URL")?,
            http_timeout: timeout_from_env(2500)?,
        })
    }
}

/// Configuration of the app client secret retriever function.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Name of the running function, recorded on created secrets
    pub function_name: String,
    /// CloudWatch log stream, quoted in custom resource responses
    pub log_stream_name: String,
    /// Timeout for the response upload
    pub http_timeout: Duration,
}

impl RetrieverConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            function_name: required("AWS_LAMBDA_FUNCTION_NAME")?,
            log_stream_name: env::var("AWS_LAMBDA_LOG_STREAM_NAME")
                .unwrap_or_else(|_| "unknown".to_string()),
            http_timeout: timeout_from_env(5000)?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{} not set", name))),
    }
}

fn timeout_from_env(default_ms: u64) -> Result<Duration> {
    let millis = match env::var("HTTP_TIMEOUT_MS") {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| Error::Config(format!("HTTP_TIMEOUT_MS is not a number: {}", e)))?,
        Err(_) => default_ms,
    };
    Ok(Duration::from_millis(millis))
}
