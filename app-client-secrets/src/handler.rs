//! Lifecycle handling of the `Custom::AppClientSecrets` resource.
//!
//! Create and Update read the app client secret from Cognito and upsert it,
//! together with the token endpoint and scopes, into one secret named after
//! the user pool. Delete removes that secret again.

use shared::models::secret_name_for_pool;
use shared::secrets::{upsert_secret, NewSecret, SecretStore};
use shared::{AppClientSecrets, Error, Result, UserPoolDirectory};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::event::{
    CustomResourceRequest, CustomResourceResponse, RequestType, ResponseStatus, SecretProperties,
};

/// Attribute exposed to the template through `Fn::GetAtt`.
pub const SECRETS_ARN_ATTRIBUTE: &str = "user_pool_secrets_arn";

/// Physical id used when no user pool id is known.
pub const FALLBACK_PHYSICAL_ID: &str = "AppClientSecrets";

const SECRET_DESCRIPTION: &str = "User Pool Secrets";

struct Applied {
    physical_resource_id: String,
    secrets_arn: String,
}

/// Custom resource provider for the app client secret.
pub struct SecretRetriever {
    directory: Arc<dyn UserPoolDirectory>,
    store: Arc<dyn SecretStore>,
    function_name: String,
    log_stream_name: String,
}

impl SecretRetriever {
    pub fn new(
        directory: Arc<dyn UserPoolDirectory>,
        store: Arc<dyn SecretStore>,
        function_name: impl Into<String>,
        log_stream_name: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            store,
            function_name: function_name.into(),
            log_stream_name: log_stream_name.into(),
        }
    }

    /// Handle one lifecycle event. Never fails: errors become a FAILED response.
    pub async fn handle(&self, request: &CustomResourceRequest) -> CustomResourceResponse {
        let reason = format!(
            "See the details in CloudWatch Log Stream: {}",
            self.log_stream_name
        );

        match self.apply(request).await {
            Ok(applied) => {
                let mut data = BTreeMap::new();
                data.insert(SECRETS_ARN_ATTRIBUTE.to_string(), applied.secrets_arn);
                self.response(request, ResponseStatus::Success, reason, applied.physical_resource_id, data)
            }
            Err(e) => {
                error!(
                    request_type = ?request.request_type,
                    logical_id = %request.logical_resource_id,
                    status = e.status_code(),
                    "Custom resource request failed: {}", e
                );
                let physical_resource_id = self.physical_id(request);
                self.response(
                    request,
                    ResponseStatus::Failed,
                    format!("{}: {}", reason, e),
                    physical_resource_id,
                    BTreeMap::new(),
                )
            }
        }
    }

    async fn apply(&self, request: &CustomResourceRequest) -> Result<Applied> {
        match request.request_type {
            RequestType::Create | RequestType::Update => {
                let props: SecretProperties =
                    serde_json::from_value(request.resource_properties.clone())?;

                if request.request_type == RequestType::Create && props.fail_create {
                    info!("FailCreate requested");
                    return Err(Error::Validation("Create failure requested".to_string()));
                }

                let secrets = self.collect_secrets(&props).await;
                let secrets_arn = self.put_secret(request, &secrets).await?;

                Ok(Applied {
                    physical_resource_id: secrets.secret_name(),
                    secrets_arn,
                })
            }
            RequestType::Delete => {
                match request.user_pool_id() {
                    Some(user_pool_id) => self.delete_secret(user_pool_id).await?,
                    None => warn!("Delete without UserPoolId, nothing to remove"),
                }
                Ok(Applied {
                    physical_resource_id: self.physical_id(request),
                    secrets_arn: String::new(),
                })
            }
            RequestType::Unknown => Err(Error::Validation("Unsupported request type".to_string())),
        }
    }

    /// Build the secret record. A secret that cannot be read is logged and left empty.
    async fn collect_secrets(&self, props: &SecretProperties) -> AppClientSecrets {
        let app_client_secret = match self
            .directory
            .app_client_secret(&props.user_pool_id, &props.user_pool_client_id)
            .await
        {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                error!(client_id = %props.user_pool_client_id, "App client has no secret");
                String::new()
            }
            Err(e) => {
                error!(client_id = %props.user_pool_client_id, "Failed to read app client secret: {}", e);
                String::new()
            }
        };

        AppClientSecrets {
            app_client_secret,
            user_pool_id: props.user_pool_id.clone(),
            user_pool_client_id: props.user_pool_client_id.clone(),
            user_pool_oauth2_endpoint: props.user_pool_oauth2_endpoint.clone(),
            resource_server_identifier: props.resource_server_identifier.clone(),
            read_scope: props.read_scope.clone(),
            write_scope: props.write_scope.clone(),
        }
    }

    async fn put_secret(
        &self,
        request: &CustomResourceRequest,
        secrets: &AppClientSecrets,
    ) -> Result<String> {
        let secret = NewSecret {
            name: secrets.secret_name(),
            description: SECRET_DESCRIPTION.to_string(),
            secret_string: serde_json::to_string(secrets)?,
            tags: vec![
                (
                    "custom:cloudformation:stack-name".to_string(),
                    request.stack_name().to_string(),
                ),
                (
                    "custom:cloudformation:logical-id".to_string(),
                    request.logical_resource_id.clone(),
                ),
                (
                    "custom:cloudformation:created-by".to_string(),
                    format!("Fn-{}", self.function_name),
                ),
            ],
        };

        upsert_secret(self.store.as_ref(), &secret).await
    }

    async fn delete_secret(&self, user_pool_id: &str) -> Result<()> {
        let name = secret_name_for_pool(user_pool_id);
        match self.store.delete_secret(&name).await {
            Ok(()) => {
                info!(secret = %name, "Deleted secret");
                Ok(())
            }
            Err(Error::NotFound(_)) => {
                warn!(secret = %name, "Secret already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Id to report when the resource is not (re)created: the one CloudFormation
    /// already knows, if any.
    fn physical_id(&self, request: &CustomResourceRequest) -> String {
        request
            .physical_resource_id
            .clone()
            .or_else(|| request.user_pool_id().map(secret_name_for_pool))
            .unwrap_or_else(|| FALLBACK_PHYSICAL_ID.to_string())
    }

    fn response(
        &self,
        request: &CustomResourceRequest,
        status: ResponseStatus,
        reason: String,
        physical_resource_id: String,
        data: BTreeMap<String, String>,
    ) -> CustomResourceResponse {
        CustomResourceResponse {
            status,
            reason,
            physical_resource_id,
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::request_json;
    use async_trait::async_trait;
    use shared::secrets::memory::MemorySecretStore;

    struct FakeDirectory {
        secret: Option<String>,
    }

    #[async_trait]
    impl UserPoolDirectory for FakeDirectory {
        async fn app_client_secret(&self, _user_pool_id: &str, _client_id: &str) -> Result<Option<String>> {
            match &self.secret {
                Some(s) => Ok(Some(s.clone())),
                None => Err(Error::Aws("AccessDenied".to_string())),
            }
        }
    }

    fn retriever(store: Arc<MemorySecretStore>, secret: Option<&str>) -> SecretRetriever {
        SecretRetriever::new(
            Arc::new(FakeDirectory {
                secret: secret.map(String::from),
            }),
            store,
            "retriever-fn",
            "2026/10/19/[$LATEST]abc",
        )
    }

    fn request(request_type: &str) -> CustomResourceRequest {
        serde_json::from_value(request_json(request_type)).unwrap()
    }

    #[tokio::test]
    async fn test_create_writes_secret_record() {
        let store = Arc::new(MemorySecretStore::new());
        let response = retriever(store.clone(), Some("client-secret")).handle(&request("Create")).await;

        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.physical_resource_id, "cognito_us-east-1_Pool");
        assert!(response.data[SECRETS_ARN_ATTRIBUTE].ends_with("cognito_us-east-1_Pool"));

        let stored = store.stored("cognito_us-east-1_Pool").unwrap();
        assert_eq!(stored.description, "User Pool Secrets");
        let record: AppClientSecrets = serde_json::from_str(&stored.secret_string).unwrap();
        assert_eq!(record.app_client_secret, "client-secret");
        assert_eq!(record.user_pool_client_id, "client-1");
        assert_eq!(record.resource_server_identifier, "premium_api");
        assert_eq!(record.read_scope, "read");
        assert_eq!(record.write_scope, "write");

        assert!(stored.tags.contains(&(
            "custom:cloudformation:stack-name".to_string(),
            "cognito-identity-provider".to_string()
        )));
        assert!(stored.tags.contains(&(
            "custom:cloudformation:created-by".to_string(),
            "Fn-retriever-fn".to_string()
        )));
    }

    #[tokio::test]
    async fn test_unreadable_client_secret_still_writes_full_record() {
        let store = Arc::new(MemorySecretStore::new());
        let response = retriever(store.clone(), None).handle(&request("Create")).await;

        assert_eq!(response.status, ResponseStatus::Success);
        let stored = store.stored("cognito_us-east-1_Pool").unwrap();
        let value: serde_json::Value = serde_json::from_str(&stored.secret_string).unwrap();
        assert_eq!(value["app_client_secret"], "");
        assert_eq!(value.as_object().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_update_rotates_existing_secret() {
        let store = Arc::new(MemorySecretStore::new());
        retriever(store.clone(), Some("old")).handle(&request("Create")).await;
        let response = retriever(store.clone(), Some("new")).handle(&request("Update")).await;

        assert_eq!(response.status, ResponseStatus::Success);
        let stored = store.stored("cognito_us-east-1_Pool").unwrap();
        let record: AppClientSecrets = serde_json::from_str(&stored.secret_string).unwrap();
        assert_eq!(record.app_client_secret, "new");
    }

    #[tokio::test]
    async fn test_delete_uses_creation_key() {
        let store = Arc::new(MemorySecretStore::new());
        let created = retriever(store.clone(), Some("s")).handle(&request("Create")).await;

        let mut delete = request("Delete");
        delete.physical_resource_id = Some(created.physical_resource_id.clone());
        let response = retriever(store.clone(), Some("s")).handle(&delete).await;

        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.physical_resource_id, created.physical_resource_id);
        assert_eq!(*store.deleted.lock().unwrap(), vec!["cognito_us-east-1_Pool".to_string()]);
        assert!(store.stored("cognito_us-east-1_Pool").is_none());
        assert_eq!(response.data[SECRETS_ARN_ATTRIBUTE], "");
    }

    #[tokio::test]
    async fn test_delete_of_missing_secret_succeeds() {
        let store = Arc::new(MemorySecretStore::new());
        let response = retriever(store, Some("s")).handle(&request("Delete")).await;
        assert_eq!(response.status, ResponseStatus::Success);
    }

    #[tokio::test]
    async fn test_fail_create_reports_failure_without_writing() {
        let store = Arc::new(MemorySecretStore::new());
        let mut json = request_json("Create");
        json["ResourceProperties"]["FailCreate"] = serde_json::json!("true");
        let request: CustomResourceRequest = serde_json::from_value(json).unwrap();

        let response = retriever(store.clone(), Some("s")).handle(&request).await;

        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(response.reason.ends_with("Create failure requested"));
        assert!(response.reason.starts_with("See the details in CloudWatch Log Stream: 2026/10/19"));
        assert!(store.stored("cognito_us-east-1_Pool").is_none());
    }

    #[tokio::test]
    async fn test_unknown_request_type_fails() {
        let store = Arc::new(MemorySecretStore::new());
        let response = retriever(store, Some("s")).handle(&request("Rollback")).await;
        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.request_id, "req-1");
    }

    #[tokio::test]
    async fn test_missing_properties_fail_create() {
        let store = Arc::new(MemorySecretStore::new());
        let mut json = request_json("Create");
        json["ResourceProperties"] = serde_json::json!({"UserPoolId": "us-east-1_Pool"});
        let request: CustomResourceRequest = serde_json::from_value(json).unwrap();

        let response = retriever(store, Some("s")).handle(&request).await;
        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.physical_resource_id, "cognito_us-east-1_Pool");
    }

    #[tokio::test]
    async fn test_failed_update_keeps_existing_physical_id() {
        let store = Arc::new(MemorySecretStore::new());
        let mut json = request_json("Update");
        json["PhysicalResourceId"] = serde_json::json!("cognito_us-east-1_Previous");
        json["ResourceProperties"] = serde_json::json!({"UserPoolId": "us-east-1_Pool"});
        let request: CustomResourceRequest = serde_json::from_value(json).unwrap();

        let response = retriever(store, Some("s")).handle(&request).await;
        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.physical_resource_id, "cognito_us-east-1_Previous");
    }

    #[tokio::test]
    async fn test_successful_update_reports_secret_name() {
        let store = Arc::new(MemorySecretStore::new());
        let mut json = request_json("Update");
        json["PhysicalResourceId"] = serde_json::json!("cognito_us-east-1_Previous");
        let request: CustomResourceRequest = serde_json::from_value(json).unwrap();

        let response = retriever(store, Some("s")).handle(&request).await;
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.physical_resource_id, "cognito_us-east-1_Pool");
    }
}
