//! # Secret Token Resolution
//!
//! Reads Console API tokens from Kubernetes secrets.

use super::{CredentialsError, Token};
use crate::constants::{CREDENTIALS_TOKEN_KEY, DEFAULT_SECRET_NAMESPACE};
use crate::crd::SecretReference;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;

/// Resolves a secret reference into a token
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(&self, secret_ref: &SecretReference) -> Result<Token, CredentialsError>;
}

/// Reads the data of a secret
#[async_trait]
pub trait SecretReader: Send + Sync {
    /// Every UTF-8 data key of the referenced secret
    ///
    /// `default_namespace` applies when the reference names no namespace.
    async fn read_data(
        &self,
        secret_ref: &SecretReference,
        default_namespace: &str,
    ) -> Result<BTreeMap<String, String>, CredentialsError>;
}

/// Token resolver backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretResolver {
    client: Client,
}

impl std::fmt::Debug for KubeSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretResolver").finish_non_exhaustive()
    }
}

impl KubeSecretResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretReader for KubeSecretResolver {
    async fn read_data(
        &self,
        secret_ref: &SecretReference,
        default_namespace: &str,
    ) -> Result<BTreeMap<String, String>, CredentialsError> {
        let namespace = secret_ref.namespace.as_deref().unwrap_or(default_namespace);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(&secret_ref.name)
            .await
            .map_err(|e| CredentialsError::SecretRead {
                namespace: namespace.to_string(),
                name: secret_ref.name.clone(),
                message: e.to_string(),
            })?
            .ok_or_else(|| CredentialsError::SecretNotFound {
                namespace: namespace.to_string(),
                name: secret_ref.name.clone(),
            })?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| String::from_utf8(value.0).ok().map(|v| (key, v)))
            .collect())
    }
}

#[async_trait]
impl TokenResolver for KubeSecretResolver {
    async fn resolve(&self, secret_ref: &SecretReference) -> Result<Token, CredentialsError> {
        let data = self.read_data(secret_ref, DEFAULT_SECRET_NAMESPACE).await?;
        token_from_data(secret_ref, &data)
    }
}

/// Extract the token key from secret data
pub(crate) fn token_from_data(
    secret_ref: &SecretReference,
    data: &BTreeMap<String, String>,
) -> Result<Token, CredentialsError> {
    data.get(CREDENTIALS_TOKEN_KEY)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(Token::new)
        .ok_or_else(|| CredentialsError::MissingKey {
            namespace: secret_ref
                .namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_SECRET_NAMESPACE.to_string()),
            name: secret_ref.name.clone(),
            key: CREDENTIALS_TOKEN_KEY.to_string(),
        })
}
