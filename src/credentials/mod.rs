//! # Namespace Credentials
//!
//! Routes every namespace to the Console API token it must use.
//!
//! Namespaces listed by a `NamespaceCredentials` claim use the token from the
//! claim's secret. Every other namespace uses the process-wide default token.
//!
//! ## Module Structure
//!
//! - `cache.rs` - The namespace credentials cache (lock-free reads, serialized writes)
//! - `secret.rs` - Token and secret data resolution from Kubernetes secrets
//! - `claims.rs` - Listing registered claims
//! - `controller.rs` - Keeps the cache in sync with `NamespaceCredentials` resources

mod cache;
mod claims;
pub mod controller;
mod secret;

pub use cache::NamespaceCredentialsCache;
pub use claims::{claim_from_resource, ClaimSource, KubeClaimSource};
pub use secret::{KubeSecretResolver, SecretReader, TokenResolver};

use crate::crd::SecretReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use std::cmp::Ordering;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Console API token
///
/// Wiped from memory when dropped and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, for the `Authorization` header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Errors raised while resolving namespace credentials
///
/// Errors are stored in the cache and handed to every reconciliation in the
/// affected namespaces, so they are `Clone` and carry text rather than sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsError {
    #[error("claim name cannot be empty")]
    EmptyClaimName,

    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("secret {namespace}/{name} has no '{key}' key")]
    MissingKey {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("failed to read secret {namespace}/{name}: {message}")]
    SecretRead {
        namespace: String,
        name: String,
        message: String,
    },

    #[error("failed to list namespace credentials: {0}")]
    ListClaims(String),

    #[error("no default Console token configured")]
    NoDefaultToken,

    /// An error recorded for every namespace of a claim
    #[error("{source}")]
    Claim {
        claim: String,
        source: Box<CredentialsError>,
    },
}

impl CredentialsError {
    /// Name of the claim the error belongs to, if any
    pub fn claim(&self) -> Option<&str> {
        match self {
            Self::Claim { claim, .. } => Some(claim),
            _ => None,
        }
    }
}

/// A registered claim: which namespaces use which secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsClaim {
    pub name: String,
    pub namespaces: Vec<String>,
    pub secret_ref: SecretReference,
    /// Creation time of the claim, later registrations win on conflicts
    pub registered_at: Option<Time>,
}

impl CredentialsClaim {
    /// Position of the claim in registration order
    ///
    /// Claims without a creation time sort first. Ties are broken by name.
    pub fn registration_order(&self, other: &Self) -> Ordering {
        self.registered_at
            .as_ref()
            .map(|t| t.0)
            .cmp(&other.registered_at.as_ref().map(|t| t.0))
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Credentials to use for one reconciliation
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub token: Token,
    /// Claim the token came from, `None` for the default token
    pub claim: Option<String>,
}

impl ResolvedCredentials {
    pub fn is_default(&self) -> bool {
        self.claim.is_none()
    }
}
