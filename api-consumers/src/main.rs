//! Content Consumers Lambda - Handles /content/* and brokers tokens for the premium API.

use api_consumers::{handler, ContentConsumer};
use lambda_http::{run, service_fn, Error};
use shared::{ConsumerConfig, SecretsManagerStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::init_tracing();

    let config = ConsumerConfig::from_env()?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(&aws_config));

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let consumer = Arc::new(
        ContentConsumer::new(
            Arc::new(store),
            http_client,
            config.user_pool_secrets_arn,
            config.premium_content_api_url,
        )
        .with_request_budget(config.http_timeout),
    );

    run(service_fn(move |event| {
        let consumer = Arc::clone(&consumer);
        async move { handler(consumer, event).await }
    }))
    .await
}
