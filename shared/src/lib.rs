//! Shared library for the premium content Lambda functions.
//!
//! This crate provides the clients, types and helpers used by the custom
//! resource, the premium API and the content consumers.

pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod models;
pub mod oauth;
pub mod secrets;
pub mod telemetry;

pub use config::{ConsumerConfig, RetrieverConfig};
pub use directory::{CognitoDirectory, UserPoolDirectory};
pub use error::{Error, Result};
pub use models::{AccessToken, AppClientSecrets, MessageBody, FALLBACK_MESSAGE};
pub use oauth::{scope_for, TokenClient};
pub use secrets::{get_app_client_secrets, get_secret, upsert_secret, NewSecret, SecretStore, SecretsManagerStore};
pub use telemetry::init_tracing;
