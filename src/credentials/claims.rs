//! # Claim Listing
//!
//! Lists every registered `NamespaceCredentials` claim for cache rebuilds.

use super::{CredentialsClaim, CredentialsError};
use crate::crd::NamespaceCredentials;
use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};

/// Source of all registered claims, in registration order
#[async_trait]
pub trait ClaimSource: Send + Sync {
    async fn list_claims(&self) -> Result<Vec<CredentialsClaim>, CredentialsError>;
}

/// Claim source backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClaimSource {
    client: Client,
}

impl std::fmt::Debug for KubeClaimSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClaimSource").finish_non_exhaustive()
    }
}

impl KubeClaimSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClaimSource for KubeClaimSource {
    async fn list_claims(&self) -> Result<Vec<CredentialsClaim>, CredentialsError> {
        let api: Api<NamespaceCredentials> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| CredentialsError::ListClaims(e.to_string()))?;

        let mut claims: Vec<CredentialsClaim> = list
            .items
            .iter()
            .filter(|nc| nc.metadata.deletion_timestamp.is_none())
            .map(claim_from_resource)
            .collect();
        claims.sort_by(CredentialsClaim::registration_order);

        Ok(claims)
    }
}

/// Convert a `NamespaceCredentials` resource into a cache claim
pub fn claim_from_resource(nc: &NamespaceCredentials) -> CredentialsClaim {
    CredentialsClaim {
        name: nc.name_any(),
        namespaces: nc.spec.namespaces.clone(),
        secret_ref: nc.spec.secret_ref.clone(),
        registered_at: nc.metadata.creation_timestamp.clone(),
    }
}
