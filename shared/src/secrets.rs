//! AWS Secrets Manager integration.

use async_trait::async_trait;
use aws_sdk_secretsmanager::types::Tag;
use aws_sdk_secretsmanager::Client as SecretsClient;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::AppClientSecrets;
use crate::{Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// A secret to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSecret {
    pub name: String,
    pub description: String,
    pub secret_string: String,
    pub tags: Vec<(String, String)>,
}

/// Key-value secret storage.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the string value of a secret by name or ARN.
    async fn get_secret_string(&self, secret_id: &str) -> Result<String>;

    /// Create a secret, returning its ARN. Fails with `Error::AlreadyExists`
    /// when the name is taken.
    async fn create_secret(&self, secret: &NewSecret) -> Result<String>;

    /// Store a new value for an existing secret, returning its ARN.
    async fn put_secret_value(&self, secret_id: &str, secret_string: &str) -> Result<String>;

    /// Delete a secret immediately, without a recovery window.
    async fn delete_secret(&self, secret_id: &str) -> Result<()>;
}

/// `SecretStore` backed by AWS Secrets Manager.
#[derive(Clone)]
pub struct SecretsManagerStore {
    client: SecretsClient,
}

impl SecretsManagerStore {
    pub fn new(client: SecretsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    Error::NotFound(secret_id.to_string())
                } else {
                    Error::Aws(format!("Failed to get secret: {}", e))
                }
            })?;

        Ok(response
            .secret_string()
            .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
            .to_string())
    }

    async fn create_secret(&self, secret: &NewSecret) -> Result<String> {
        let tags = secret
            .tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect::<Vec<_>>();

        let response = self
            .client
            .create_secret()
            .name(&secret.name)
            .description(&secret.description)
            .secret_string(&secret.secret_string)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_exists_exception())
                    .unwrap_or(false)
                {
                    Error::AlreadyExists(secret.name.clone())
                } else {
                    Error::Aws(format!("Failed to create secret: {}", e))
                }
            })?;

        response
            .arn()
            .map(String::from)
            .ok_or_else(|| Error::Aws("CreateSecret returned no ARN".to_string()))
    }

    async fn put_secret_value(&self, secret_id: &str, secret_string: &str) -> Result<String> {
        let response = self
            .client
            .put_secret_value()
            .secret_id(secret_id)
            .secret_string(secret_string)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    Error::NotFound(secret_id.to_string())
                } else {
                    Error::Aws(format!("Failed to put secret value: {}", e))
                }
            })?;

        response
            .arn()
            .map(String::from)
            .ok_or_else(|| Error::Aws("PutSecretValue returned no ARN".to_string()))
    }

    async fn delete_secret(&self, secret_id: &str) -> Result<()> {
        self.client
            .delete_secret()
            .secret_id(secret_id)
            .force_delete_without_recovery(true)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    Error::NotFound(secret_id.to_string())
                } else {
                    Error::Aws(format!("Failed to delete secret: {}", e))
                }
            })?;
        Ok(())
    }
}

/// Create a secret, or store a new value if it already exists.
///
/// Returns the ARN of the secret either way.
pub async fn upsert_secret(store: &dyn SecretStore, secret: &NewSecret) -> Result<String> {
    match store.create_secret(secret).await {
        Ok(arn) => {
            info!(secret = %secret.name, "Created secret");
            Ok(arn)
        }
        Err(Error::AlreadyExists(_)) => {
            let arn = store
                .put_secret_value(&secret.name, &secret.secret_string)
                .await?;
            info!(secret = %secret.name, "Rotated existing secret");
            Ok(arn)
        }
        Err(e) => Err(e),
    }
}

/// Get a secret value with caching across warm invocations.
pub async fn get_secret(store: &dyn SecretStore, secret_id: &str) -> Result<String> {
    // Check cache first
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_id) {
            debug!(secret = secret_id, "Secret cache hit");
            return Ok(value.clone());
        }
    }

    let secret_string = store.get_secret_string(secret_id).await?;

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_id.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Get and parse the app client credentials record.
pub async fn get_app_client_secrets(
    store: &dyn SecretStore,
    secret_id: &str,
) -> Result<AppClientSecrets> {
    let secret_string = get_secret(store, secret_id).await?;
    Ok(serde_json::from_str(&secret_string)?)
}

/// Drop one cached secret so the next read goes to the store.
pub async fn evict(secret_id: &str) {
    let mut cache = get_cache().write().await;
    cache.remove(secret_id);
}

/// In-memory `SecretStore` for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemorySecretStore {
        pub secrets: Mutex<HashMap<String, NewSecret>>,
        pub reads: AtomicUsize,
        pub deleted: Mutex<Vec<String>>,
    }

    impl MemorySecretStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_secret(name: &str, secret_string: &str) -> Self {
            let store = Self::new();
            store.secrets.lock().unwrap().insert(
                name.to_string(),
                NewSecret {
                    name: name.to_string(),
                    description: String::new(),
                    secret_string: secret_string.to_string(),
                    tags: Vec::new(),
                },
            );
            store
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub fn stored(&self, name: &str) -> Option<NewSecret> {
            self.secrets.lock().unwrap().get(name).cloned()
        }

        fn arn(name: &str) -> String {
            format!("arn:aws:secretsmanager:us-east-1:123456789012:secret:{}", name)
        }
    }

    #[async_trait]
    impl SecretStore for MemorySecretStore {
        async fn get_secret_string(&self, secret_id: &str) -> Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.secrets
                .lock()
                .unwrap()
                .get(secret_id)
                .map(|s| s.secret_string.clone())
                .ok_or_else(|| Error::NotFound(secret_id.to_string()))
        }

        async fn create_secret(&self, secret: &NewSecret) -> Result<String> {
            let mut secrets = self.secrets.lock().unwrap();
            if secrets.contains_key(&secret.name) {
                return Err(Error::AlreadyExists(secret.name.clone()));
            }
            secrets.insert(secret.name.clone(), secret.clone());
            Ok(Self::arn(&secret.name))
        }

        async fn put_secret_value(&self, secret_id: &str, secret_string: &str) -> Result<String> {
            let mut secrets = self.secrets.lock().unwrap();
            let existing = secrets
                .get_mut(secret_id)
                .ok_or_else(|| Error::NotFound(secret_id.to_string()))?;
            existing.secret_string = secret_string.to_string();
            Ok(Self::arn(secret_id))
        }

        async fn delete_secret(&self, secret_id: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(secret_id.to_string());
            self.secrets
                .lock()
                .unwrap()
                .remove(secret_id)
                .map(|_| ())
                .ok_or_else(|| Error::NotFound(secret_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemorySecretStore;
    use super::*;

    fn new_secret(name: &str, value: &str) -> NewSecret {
        NewSecret {
            name: name.to_string(),
            description: "User Pool Secrets".to_string(),
            secret_string: value.to_string(),
            tags: vec![("custom:cloudformation:logical-id".to_string(), "Res".to_string())],
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_rotates() {
        let store = MemorySecretStore::new();

        let first = upsert_secret(&store, &new_secret("cognito_pool-a", "v1")).await.unwrap();
        let second = upsert_secret(&store, &new_secret("cognito_pool-a", "v2")).await.unwrap();

        assert_eq!(first, second);
        let stored = store.stored("cognito_pool-a").unwrap();
        assert_eq!(stored.secret_string, "v2");
        // tags from the first create are kept
        assert_eq!(stored.tags.len(), 1);
    }

    #[tokio::test]
    async fn test_get_secret_is_cached_until_evicted() {
        let store = MemorySecretStore::with_secret("cache-test-secret", "value");

        assert_eq!(get_secret(&store, "cache-test-secret").await.unwrap(), "value");
        assert_eq!(get_secret(&store, "cache-test-secret").await.unwrap(), "value");
        assert_eq!(store.reads(), 1);

        evict("cache-test-secret").await;
        get_secret(&store, "cache-test-secret").await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_parse_app_client_secrets() {
        let json = r#"{"app_client_secret":"s","user_pool_id":"p","user_pool_client_id":"c","user_pool_oauth2_endpoint":"https://x/oauth2/token","resource_server_identifier":"premium_api","read_scope":"read","write_scope":"write"}"#;
        let store = MemorySecretStore::with_secret("parse-test-secret", json);

        let secrets = get_app_client_secrets(&store, "parse-test-secret").await.unwrap();
        assert_eq!(secrets.user_pool_client_id, "c");
        assert_eq!(secrets.resource_server_identifier, "premium_api");
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_found() {
        let store = MemorySecretStore::new();
        let err = get_secret(&store, "missing-test-secret").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
