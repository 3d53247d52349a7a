//! Common test utilities
//!
//! Provides shared initialization code and in-memory fakes for the record
//! store, the Console API and the credential sources, so the engine and the
//! credentials cache can be driven without a cluster.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use console_sync_controller::console::{ConsoleClient, ConsoleSession, RemoteError};
use console_sync_controller::credentials::{
    ClaimSource, CredentialsClaim, CredentialsError, NamespaceCredentialsCache, Token,
    TokenResolver,
};
use console_sync_controller::crd::{
    NotificationRouter, NotificationRouterSpec, SecretReference, SyncStatus,
};
use console_sync_controller::engine::{
    Engine, EngineSettings, RecordStore, RemoteObject, StoreError, SyncError, Syncable,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub const NAMESPACE: &str = "apps";
pub const DEFAULT_TOKEN: &str = "default-token";

pub fn router(name: &str, events: &[&str]) -> NotificationRouter {
    let mut router = NotificationRouter::new(
        name,
        NotificationRouterSpec {
            name: None,
            events: events.iter().map(|e| (*e).to_string()).collect(),
            filters: Vec::new(),
            sinks: Vec::new(),
            reconciliation: None,
        },
    );
    router.metadata.namespace = Some(NAMESPACE.to_string());
    router.metadata.generation = Some(1);
    router.metadata.resource_version = Some("1".to_string());
    router
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// In-memory record store with optimistic concurrency like the API server
#[derive(Debug, Default)]
pub struct FakeStore {
    records: Mutex<HashMap<(String, String), NotificationRouter>>,
    conflicts: AtomicUsize,
    status_writes: AtomicUsize,
}

fn bump(record: &mut NotificationRouter) {
    let version: u64 = record
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    record.metadata.resource_version = Some((version + 1).to_string());
}

fn key_of(record: &NotificationRouter) -> (String, String) {
    (record.namespace().unwrap_or_default(), record.name_any())
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, record: NotificationRouter) {
        self.records
            .lock()
            .unwrap()
            .insert(key_of(&record), record);
    }

    pub fn record(&self, name: &str) -> Option<NotificationRouter> {
        self.records
            .lock()
            .unwrap()
            .get(&(NAMESPACE.to_string(), name.to_string()))
            .cloned()
    }

    pub fn status(&self, name: &str) -> SyncStatus {
        self.record(name)
            .and_then(|r| r.status)
            .unwrap_or_default()
    }

    /// Edit the spec the way a user would, bumping the generation
    pub fn update_spec(&self, name: &str, edit: impl FnOnce(&mut NotificationRouterSpec)) {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(NAMESPACE.to_string(), name.to_string()))
            .expect("record exists");
        edit(&mut record.spec);
        record.metadata.generation = Some(record.metadata.generation.unwrap_or(0) + 1);
        bump(record);
    }

    /// Overwrite the status directly, bypassing the engine
    pub fn set_status(&self, name: &str, status: SyncStatus) {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(NAMESPACE.to_string(), name.to_string()))
            .expect("record exists");
        record.status = Some(status);
        bump(record);
    }

    /// Set the deletion timestamp, or remove the record if nothing holds it
    pub fn mark_deleted(&self, name: &str) {
        let mut records = self.records.lock().unwrap();
        let key = (NAMESPACE.to_string(), name.to_string());
        let Some(record) = records.get_mut(&key) else {
            return;
        };
        if record.finalizers().is_empty() {
            records.remove(&key);
            return;
        }
        record.metadata.deletion_timestamp = Some(
            serde_json::from_value::<Time>(serde_json::json!("2024-01-01T00:00:00Z"))
                .expect("valid timestamp"),
        );
        bump(record);
    }

    /// Fail the next `n` status writes with a conflict
    pub fn inject_conflicts(&self, n: usize) {
        self.conflicts.store(n, Ordering::SeqCst);
    }

    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    fn take_conflict(&self) -> bool {
        self.conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RecordStore<NotificationRouter> for FakeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<NotificationRouter>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn write_status(
        &self,
        record: &NotificationRouter,
        status: &SyncStatus,
    ) -> Result<NotificationRouter, StoreError> {
        if self.take_conflict() {
            return Err(StoreError::Conflict);
        }
        let mut records = self.records.lock().unwrap();
        let stored = records.get_mut(&key_of(record)).ok_or(StoreError::NotFound)?;
        if stored.metadata.resource_version != record.metadata.resource_version {
            return Err(StoreError::Conflict);
        }
        stored.status = Some(status.clone());
        bump(stored);
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }

    async fn set_guard_marker(
        &self,
        record: &NotificationRouter,
        present: bool,
    ) -> Result<NotificationRouter, StoreError> {
        let mut records = self.records.lock().unwrap();
        let key = key_of(record);
        let stored = records.get_mut(&key).ok_or(StoreError::NotFound)?;
        if stored.metadata.resource_version != record.metadata.resource_version {
            return Err(StoreError::Conflict);
        }
        let finalizers = stored.finalizers_mut();
        finalizers.retain(|f| f != console_sync_controller::constants::REMOTE_PROTECTION_FINALIZER);
        if present {
            finalizers.push(console_sync_controller::constants::REMOTE_PROTECTION_FINALIZER.to_string());
        }
        bump(stored);
        let updated = stored.clone();
        if updated.metadata.deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            records.remove(&key);
        }
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Console API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterAttributes {
    pub name: String,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRemote {
    pub id: String,
    pub name: String,
    pub events: Vec<String>,
    pub deleting: bool,
    pub ready: bool,
}

impl RemoteObject for FakeRemote {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_deleting(&self) -> bool {
        self.deleting
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn message(&self) -> Option<String> {
        (!self.ready).then(|| "provisioning".to_string())
    }
}

/// How the fake Console API answers a delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteBehavior {
    /// The object disappears at once
    #[default]
    Immediate,
    /// The object is marked for deletion and disappears on `finish_deletions`
    Deferred,
    /// The delete is refused until dependents go away
    Pending,
}

/// In-memory Console API
#[derive(Debug, Default)]
pub struct FakeConsole {
    objects: Mutex<HashMap<String, FakeRemote>>,
    next_id: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<HashMap<&'static str, RemoteError>>,
    delete_behavior: Mutex<DeleteBehavior>,
    not_ready: AtomicBool,
}

impl FakeConsole {
    /// Add an object created outside the controller and return its ID
    pub fn seed(&self, name: &str, events: &[&str]) -> String {
        let id = format!("router-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.objects.lock().unwrap().insert(
            id.clone(),
            FakeRemote {
                id: id.clone(),
                name: name.to_string(),
                events: events.iter().map(|e| (*e).to_string()).collect(),
                deleting: false,
                ready: true,
            },
        );
        id
    }

    pub fn object(&self, id: &str) -> Option<FakeRemote> {
        self.objects.lock().unwrap().get(id).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<FakeRemote> {
        self.objects
            .lock()
            .unwrap()
            .values()
            .find(|o| o.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Delete an object behind the controller's back
    pub fn remove(&self, id: &str) {
        self.objects.lock().unwrap().remove(id);
    }

    pub fn set_ready(&self, id: &str, ready: bool) {
        if let Some(object) = self.objects.lock().unwrap().get_mut(id) {
            object.ready = ready;
        }
    }

    /// Complete every deferred deletion
    pub fn finish_deletions(&self) {
        self.objects.lock().unwrap().retain(|_, o| !o.deleting);
    }

    pub fn set_delete_behavior(&self, behavior: DeleteBehavior) {
        *self.delete_behavior.lock().unwrap() = behavior;
    }

    /// Make `attributes` report a missing dependency
    pub fn set_not_ready(&self, not_ready: bool) {
        self.not_ready.store(not_ready, Ordering::SeqCst);
    }

    /// Fail the next call of `operation` with `error`
    pub fn fail_next(&self, operation: &'static str, error: RemoteError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == operation)
            .count()
    }

    /// Calls that change remote state
    pub fn mutations(&self) -> usize {
        ["create", "update", "delete", "detach"]
            .iter()
            .map(|op| self.calls(op))
            .sum()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call(&self, operation: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(operation);
        match self.failures.lock().unwrap().remove(operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Adapter over [`FakeConsole`], shaped like the notification router adapter
#[derive(Debug)]
pub struct FakeAdapter {
    pub console: Arc<FakeConsole>,
    pub adoption: bool,
    pub detach: bool,
}

impl FakeAdapter {
    fn router_name(resource: &NotificationRouter) -> String {
        resource
            .spec
            .name
            .clone()
            .unwrap_or_else(|| resource.name_any())
    }
}

#[async_trait]
impl Syncable for FakeAdapter {
    type Resource = NotificationRouter;
    type Attributes = RouterAttributes;
    type Remote = FakeRemote;

    const KIND: &'static str = "NotificationRouter";

    fn natural_key(&self, resource: &NotificationRouter) -> String {
        Self::router_name(resource)
    }

    fn supports_adoption(&self) -> bool {
        self.adoption
    }

    fn detach_on_delete(&self, _resource: &NotificationRouter) -> bool {
        self.detach
    }

    async fn attributes(&self, resource: &NotificationRouter) -> Result<RouterAttributes, SyncError> {
        if self.console.not_ready.load(Ordering::SeqCst) {
            return Err(SyncError::NotReady("sink is not synchronized yet".to_string()));
        }
        Ok(RouterAttributes {
            name: Self::router_name(resource),
            events: resource.spec.events.clone(),
        })
    }

    async fn fetch_observed(
        &self,
        _session: &ConsoleSession,
        id: &str,
    ) -> Result<Option<FakeRemote>, RemoteError> {
        self.console.call("fetch_observed")?;
        Ok(self.console.object(id))
    }

    async fn fetch_by_natural_key(
        &self,
        _session: &ConsoleSession,
        key: &str,
    ) -> Result<Option<FakeRemote>, RemoteError> {
        self.console.call("fetch_by_natural_key")?;
        Ok(self.console.by_name(key))
    }

    async fn create(
        &self,
        _session: &ConsoleSession,
        attributes: &RouterAttributes,
    ) -> Result<FakeRemote, RemoteError> {
        self.console.call("create")?;
        if self.console.by_name(&attributes.name).is_some() {
            return Err(RemoteError::AlreadyExists("name has already been taken".to_string()));
        }
        let events: Vec<&str> = attributes.events.iter().map(String::as_str).collect();
        let id = self.console.seed(&attributes.name, &events);
        Ok(self.console.object(&id).expect("just created"))
    }

    async fn update(
        &self,
        _session: &ConsoleSession,
        id: &str,
        attributes: &RouterAttributes,
    ) -> Result<FakeRemote, RemoteError> {
        self.console.call("update")?;
        let mut objects = self.console.objects.lock().unwrap();
        let object = objects
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound("could not find resource".to_string()))?;
        object.name = attributes.name.clone();
        object.events = attributes.events.clone();
        Ok(object.clone())
    }

    async fn delete(&self, _session: &ConsoleSession, id: &str) -> Result<(), RemoteError> {
        self.console.call("delete")?;
        let behavior = *self.console.delete_behavior.lock().unwrap();
        let mut objects = self.console.objects.lock().unwrap();
        match behavior {
            DeleteBehavior::Immediate => objects
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| RemoteError::NotFound("could not find resource".to_string())),
            DeleteBehavior::Deferred => {
                let object = objects
                    .get_mut(id)
                    .ok_or_else(|| RemoteError::NotFound("could not find resource".to_string()))?;
                object.deleting = true;
                Ok(())
            }
            DeleteBehavior::Pending => Err(RemoteError::DeletionPending(
                "router is still in use".to_string(),
            )),
        }
    }

    async fn detach(&self, _session: &ConsoleSession, _id: &str) -> Result<(), RemoteError> {
        self.console.call("detach")
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Token resolver over a secret name to token map
#[derive(Debug, Default)]
pub struct FakeResolver {
    tokens: Mutex<HashMap<String, String>>,
    resolutions: AtomicUsize,
}

impl FakeResolver {
    pub fn with(tokens: &[(&str, &str)]) -> Arc<Self> {
        let resolver = Self::default();
        for (secret, token) in tokens {
            resolver.set(secret, token);
        }
        Arc::new(resolver)
    }

    pub fn set(&self, secret: &str, token: &str) {
        self.tokens
            .lock()
            .unwrap()
            .insert(secret.to_string(), token.to_string());
    }

    pub fn remove(&self, secret: &str) {
        self.tokens.lock().unwrap().remove(secret);
    }

    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenResolver for FakeResolver {
    async fn resolve(&self, secret_ref: &SecretReference) -> Result<Token, CredentialsError> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .get(&secret_ref.name)
            .map(Token::new)
            .ok_or_else(|| CredentialsError::SecretNotFound {
                namespace: secret_ref
                    .namespace
                    .clone()
                    .unwrap_or_else(|| "default".to_string()),
                name: secret_ref.name.clone(),
            })
    }
}

/// Claim source returning a fixed list in registration order
#[derive(Debug, Default)]
pub struct FakeClaims {
    claims: Mutex<Vec<CredentialsClaim>>,
}

impl FakeClaims {
    pub fn with(claims: Vec<CredentialsClaim>) -> Arc<Self> {
        Arc::new(Self {
            claims: Mutex::new(claims),
        })
    }

    pub fn set(&self, claims: Vec<CredentialsClaim>) {
        *self.claims.lock().unwrap() = claims;
    }
}

#[async_trait]
impl ClaimSource for FakeClaims {
    async fn list_claims(&self) -> Result<Vec<CredentialsClaim>, CredentialsError> {
        Ok(self.claims.lock().unwrap().clone())
    }
}

pub fn claim(name: &str, namespaces: &[&str], secret: &str) -> CredentialsClaim {
    CredentialsClaim {
        name: name.to_string(),
        namespaces: namespaces.iter().map(|n| (*n).to_string()).collect(),
        secret_ref: SecretReference {
            name: secret.to_string(),
            namespace: None,
        },
        registered_at: None,
    }
}

/// Claim created at `created` (RFC 3339)
pub fn claim_at(name: &str, namespaces: &[&str], secret: &str, created: &str) -> CredentialsClaim {
    CredentialsClaim {
        registered_at: Some(
            serde_json::from_value::<Time>(serde_json::json!(created)).expect("valid timestamp"),
        ),
        ..claim(name, namespaces, secret)
    }
}

pub fn cache(
    default_token: &str,
    resolver: Arc<FakeResolver>,
    claims: Arc<FakeClaims>,
) -> Arc<NamespaceCredentialsCache> {
    Arc::new(NamespaceCredentialsCache::new(
        Token::new(default_token),
        resolver,
        claims,
    ))
}

// ---------------------------------------------------------------------------
// Engine harness
// ---------------------------------------------------------------------------

pub const WAIT_FOR_RESOURCES: Duration = Duration::from_secs(5);
pub const REQUEUE_INTERVAL: Duration = Duration::from_secs(30);

pub struct Harness {
    pub engine: Engine<FakeAdapter>,
    pub store: Arc<FakeStore>,
    pub console: Arc<FakeConsole>,
    pub credentials: Arc<NamespaceCredentialsCache>,
    pub resolver: Arc<FakeResolver>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HarnessOptions {
    pub adoption: bool,
    pub detach: bool,
}

pub fn harness(options: HarnessOptions) -> Harness {
    harness_with_default_token(options, DEFAULT_TOKEN)
}

pub fn harness_with_default_token(options: HarnessOptions, default_token: &str) -> Harness {
    init_rustls();
    let store = FakeStore::new();
    let console = Arc::new(FakeConsole::default());
    let resolver = FakeResolver::with(&[]);
    let credentials = cache(default_token, Arc::clone(&resolver), FakeClaims::with(Vec::new()));
    let client = ConsoleClient::new("http://console.invalid", Duration::from_secs(5))
        .expect("valid console url");

    let engine = Engine::new(
        FakeAdapter {
            console: Arc::clone(&console),
            adoption: options.adoption,
            detach: options.detach,
        },
        Arc::clone(&store) as Arc<dyn RecordStore<NotificationRouter>>,
        Arc::clone(&credentials),
        client,
        EngineSettings {
            requeue_interval: REQUEUE_INTERVAL,
            wait_for_resources: WAIT_FOR_RESOURCES,
            remote_timeout: Duration::from_secs(5),
        },
    );

    Harness {
        engine,
        store,
        console,
        credentials,
        resolver,
    }
}

impl Harness {
    pub async fn reconcile(
        &self,
        name: &str,
    ) -> Result<
        console_sync_controller::engine::ReconcileOutcome,
        console_sync_controller::engine::ReconcileError,
    > {
        let key = console_sync_controller::engine::ReconcileKey::new(
            FakeAdapter::KIND,
            NAMESPACE,
            name,
        );
        self.engine.reconcile(&key).await
    }
}
