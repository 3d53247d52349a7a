//! # Namespace Credentials Cache
//!
//! Maps namespaces to the token (or the error) of the claim covering them.
//!
//! Reads are lock-free: the map is an immutable snapshot behind an
//! [`ArcSwap`], so a reader sees either the old or the new map, never a
//! partial update. Writers serialize on a mutex, copy the current snapshot,
//! apply their change and publish the copy.
//!
//! The snapshot keeps every registered claim next to the namespace map. The
//! map is always derived from the claims in registration order (creation time,
//! then the order the cache first saw each claim), so refreshing a claim never
//! changes the owner of a contested namespace.

use super::{
    ClaimSource, CredentialsClaim, CredentialsError, ResolvedCredentials, Token, TokenResolver,
};
use crate::observability::metrics;
use arc_swap::ArcSwap;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A claim and the outcome of resolving its secret
#[derive(Debug)]
struct RegisteredClaim {
    claim: CredentialsClaim,
    result: Result<Token, CredentialsError>,
    /// Order in which the cache first saw the claim, kept across refreshes
    sequence: u64,
}

impl RegisteredClaim {
    /// Creation time first, then first-seen order
    fn registration_order(&self, other: &Self) -> Ordering {
        self.claim
            .registered_at
            .as_ref()
            .map(|t| t.0)
            .cmp(&other.claim.registered_at.as_ref().map(|t| t.0))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Cached outcome for one namespace
#[derive(Debug)]
struct CredentialsEntry {
    claim: String,
    result: Result<Token, CredentialsError>,
}

type Claims = HashMap<String, Arc<RegisteredClaim>>;
type Entries = HashMap<String, Arc<CredentialsEntry>>;

#[derive(Debug, Default)]
struct Snapshot {
    claims: Claims,
    entries: Entries,
    next_sequence: u64,
}

pub struct NamespaceCredentialsCache {
    snapshot: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    default_token: Token,
    resolver: Arc<dyn TokenResolver>,
    claims: Arc<dyn ClaimSource>,
}

impl std::fmt::Debug for NamespaceCredentialsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("NamespaceCredentialsCache")
            .field("claims", &snapshot.claims.len())
            .field("entries", &snapshot.entries.len())
            .field("default_token", &self.default_token)
            .finish_non_exhaustive()
    }
}

impl NamespaceCredentialsCache {
    pub fn new(
        default_token: Token,
        resolver: Arc<dyn TokenResolver>,
        claims: Arc<dyn ClaimSource>,
    ) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
            default_token,
            resolver,
            claims,
        }
    }

    /// Populate the cache from every registered claim
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be listed.
    pub async fn init(&self) -> Result<(), CredentialsError> {
        self.reset().await?;
        info!(
            "✅ Namespace credentials cache initialized with {} namespace(s)",
            self.len()
        );
        Ok(())
    }

    /// Register or refresh a claim
    ///
    /// A secret that cannot be resolved is recorded for each namespace and
    /// reported to reconciliations in those namespaces. Namespaces the claim
    /// no longer lists are released. When two claims list the same namespace
    /// the later registered claim owns it, however often either is refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the claim has no name.
    pub async fn add_claim(&self, claim: &CredentialsClaim) -> Result<(), CredentialsError> {
        if claim.name.trim().is_empty() {
            return Err(CredentialsError::EmptyClaimName);
        }

        let result = self.resolve_claim_token(claim).await;

        let _guard = self.writer.lock().await;
        let current = self.snapshot.load_full();
        let (sequence, next_sequence) = match current.claims.get(&claim.name) {
            Some(existing) => (existing.sequence, current.next_sequence),
            None => (current.next_sequence, current.next_sequence + 1),
        };
        let mut claims = current.claims.clone();
        claims.insert(
            claim.name.clone(),
            Arc::new(RegisteredClaim {
                claim: claim.clone(),
                result,
                sequence,
            }),
        );
        self.publish(claims, next_sequence);

        debug!(
            "Registered namespace credentials {} for {} namespace(s)",
            claim.name,
            claim.namespaces.len()
        );
        Ok(())
    }

    /// Unregister `claim` and release the namespaces it owned
    ///
    /// A released namespace still listed by another claim moves to that claim.
    /// Namespaces taken over by another claim are left untouched.
    pub async fn remove_claim(&self, claim: &str, namespaces: &[String]) {
        let _guard = self.writer.lock().await;
        let current = self.snapshot.load_full();
        let mut claims = current.claims.clone();
        claims.remove(claim);
        let next = self.publish(claims, current.next_sequence);

        let fallback = namespaces
            .iter()
            .filter(|namespace| !next.entries.contains_key(*namespace))
            .count();
        debug!(
            "Removed namespace credentials {}, {} namespace(s) fall back to the default token",
            claim, fallback
        );
    }

    /// Credentials for `namespace`
    ///
    /// # Errors
    ///
    /// Returns the error recorded for the namespace's claim, or an error if the
    /// namespace is unclaimed and no default token is configured.
    pub fn resolve(&self, namespace: &str) -> Result<ResolvedCredentials, CredentialsError> {
        let snapshot = self.snapshot.load();
        match snapshot.entries.get(namespace) {
            Some(entry) => match &entry.result {
                Ok(token) => Ok(ResolvedCredentials {
                    token: token.clone(),
                    claim: Some(entry.claim.clone()),
                }),
                Err(e) => Err(CredentialsError::Claim {
                    claim: entry.claim.clone(),
                    source: Box::new(e.clone()),
                }),
            },
            None if self.default_token.is_empty() => Err(CredentialsError::NoDefaultToken),
            None => Ok(ResolvedCredentials {
                token: self.default_token.clone(),
                claim: None,
            }),
        }
    }

    /// Rebuild the cache from every registered claim and swap it in
    ///
    /// Claims no longer registered are dropped and every secret is resolved
    /// again.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be listed. The current map is kept.
    pub async fn reset(&self) -> Result<(), CredentialsError> {
        let _guard = self.writer.lock().await;
        let listed = self.claims.list_claims().await?;

        let mut claims = Claims::new();
        let mut sequence = 0;
        for claim in listed {
            if claim.name.trim().is_empty() {
                continue;
            }
            let result = self.resolve_claim_token(&claim).await;
            claims.insert(
                claim.name.clone(),
                Arc::new(RegisteredClaim {
                    claim,
                    result,
                    sequence,
                }),
            );
            sequence += 1;
        }
        self.publish(claims, sequence);
        Ok(())
    }

    /// Name of the claim owning `namespace`, if any
    pub fn claim_for(&self, namespace: &str) -> Option<String> {
        self.snapshot
            .load()
            .entries
            .get(namespace)
            .map(|entry| entry.claim.clone())
    }

    /// Error recorded for `claim`, if its token could not be resolved
    pub fn claim_error(&self, claim: &str) -> Option<CredentialsError> {
        self.snapshot
            .load()
            .claims
            .get(claim)
            .and_then(|registered| registered.result.as_ref().err().cloned())
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().entries.is_empty()
    }

    async fn resolve_claim_token(&self, claim: &CredentialsClaim) -> Result<Token, CredentialsError> {
        let result = self.resolver.resolve(&claim.secret_ref).await;
        if let Err(e) = &result {
            warn!(
                "Failed to resolve token for namespace credentials {}: {}",
                claim.name, e
            );
        }
        result
    }

    /// Derive the namespace map from `claims` and publish both
    ///
    /// Must be called with the writer lock held.
    fn publish(&self, claims: Claims, next_sequence: u64) -> Arc<Snapshot> {
        let previous = self.snapshot.load_full();
        let entries = build_entries(&claims, &previous.entries);
        metrics::set_credentials_entries(entries.len());

        let next = Arc::new(Snapshot {
            claims,
            entries,
            next_sequence,
        });
        self.snapshot.store(Arc::clone(&next));
        next
    }
}

/// Assign every namespace to the last registered claim listing it
///
/// A conflict is reported only when it moves a namespace to a new owner.
fn build_entries(claims: &Claims, previous: &Entries) -> Entries {
    let mut ordered: Vec<&RegisteredClaim> = claims.values().map(AsRef::as_ref).collect();
    ordered.sort_by(|a, b| a.registration_order(b));

    let mut entries = Entries::new();
    for registered in ordered {
        let entry = Arc::new(CredentialsEntry {
            claim: registered.claim.name.clone(),
            result: registered.result.clone(),
        });
        for namespace in &registered.claim.namespaces {
            if let Some(existing) = entries.get(namespace) {
                let moved = previous
                    .get(namespace)
                    .is_none_or(|owner| owner.claim != registered.claim.name);
                if existing.claim != registered.claim.name && moved {
                    warn!(
                        "Namespace {} is claimed by both {} and {}, using {}",
                        namespace, existing.claim, registered.claim.name, registered.claim.name
                    );
                    metrics::increment_credentials_conflicts();
                }
            }
            entries.insert(namespace.clone(), Arc::clone(&entry));
        }
    }
    entries
}
