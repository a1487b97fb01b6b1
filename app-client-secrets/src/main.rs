//! App Client Secret Retriever Lambda - CloudFormation custom resource provider.
//!
//! Reads the Cognito app client secret on Create/Update, upserts it into
//! Secrets Manager, removes it on Delete, and reports the outcome to the
//! pre-signed response URL.

use app_client_secrets::{send_response, CustomResourceRequest, SecretRetriever};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::{CognitoDirectory, RetrieverConfig, SecretsManagerStore};
use std::sync::Arc;
use tracing::{error, info};

/// Application state
struct AppState {
    retriever: SecretRetriever,
    http_client: reqwest::Client,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = RetrieverConfig::from_env()?;
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let directory = CognitoDirectory::new(aws_sdk_cognitoidentityprovider::Client::new(&aws_config));
        let store = SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(&aws_config));

        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            retriever: SecretRetriever::new(
                Arc::new(directory),
                Arc::new(store),
                config.function_name,
                config.log_stream_name,
            ),
            http_client,
        })
    }
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<CustomResourceRequest>) -> Result<(), Error> {
    let request = event.payload;

    info!(
        request_type = ?request.request_type,
        logical_id = %request.logical_resource_id,
        resource_type = %request.resource_type,
        "Processing custom resource request"
    );

    let response = state.retriever.handle(&request).await;

    if let Err(e) = send_response(&state.http_client, &request.response_url, &response).await {
        error!("Failed to deliver custom resource response: {}", e);
        return Err(e.into());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::init_tracing();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
