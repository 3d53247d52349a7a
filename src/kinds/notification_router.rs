//! # NotificationRouter Adapter
//!
//! Routers are identified by name and written with the Console's upsert
//! mutation, which serves both creates and updates.

use crate::console::{ConsoleSession, RemoteError};
use crate::crd::{NotificationRouter, Reconciliation, RouterFilter, SyncStatus};
use crate::engine::{RemoteObject, SyncError, Syncable, SyncedResource};
use async_trait::async_trait;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;

const ROUTER_FIELDS: &str = "id name";

impl SyncedResource for NotificationRouter {
    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    fn reconciliation(&self) -> Option<&Reconciliation> {
        self.spec.reconciliation.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRouterAttributes {
    pub name: String,
    /// Deduplicated and sorted
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RouterFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub router_sinks: Vec<RouterSinkAttributes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterSinkAttributes {
    pub sink_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationRouterFragment {
    pub id: String,
    pub name: String,
}

impl RemoteObject for NotificationRouterFragment {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Default)]
pub struct NotificationRouterAdapter;

impl NotificationRouterAdapter {
    fn router_name(resource: &NotificationRouter) -> String {
        resource
            .spec
            .name
            .clone()
            .unwrap_or_else(|| resource.name_any())
    }

    async fn upsert(
        session: &ConsoleSession,
        attributes: &NotificationRouterAttributes,
    ) -> Result<NotificationRouterFragment, RemoteError> {
        session
            .mutate_field(
                &format!("mutation UpsertNotificationRouter($attributes: NotificationRouterAttributes!) {{ upsertNotificationRouter(attributes: $attributes) {{ {ROUTER_FIELDS} }} }}"),
                json!({ "attributes": attributes }),
                "upsertNotificationRouter",
            )
            .await
    }
}

#[async_trait]
impl Syncable for NotificationRouterAdapter {
    type Resource = NotificationRouter;
    type Attributes = NotificationRouterAttributes;
    type Remote = NotificationRouterFragment;

    const KIND: &'static str = "NotificationRouter";

    fn natural_key(&self, resource: &NotificationRouter) -> String {
        Self::router_name(resource)
    }

    fn supports_adoption(&self) -> bool {
        true
    }

    async fn attributes(
        &self,
        resource: &NotificationRouter,
    ) -> Result<NotificationRouterAttributes, SyncError> {
        if resource.spec.sinks.iter().any(|sink| sink.trim().is_empty()) {
            return Err(SyncError::Invalid("spec.sinks cannot contain empty IDs".to_string()));
        }
        let events: BTreeSet<String> = resource.spec.events.iter().cloned().collect();
        Ok(NotificationRouterAttributes {
            name: Self::router_name(resource),
            events: events.into_iter().collect(),
            filters: resource.spec.filters.clone(),
            router_sinks: resource
                .spec
                .sinks
                .iter()
                .map(|sink| RouterSinkAttributes {
                    sink_id: sink.clone(),
                })
                .collect(),
        })
    }

    async fn fetch_observed(
        &self,
        session: &ConsoleSession,
        id: &str,
    ) -> Result<Option<NotificationRouterFragment>, RemoteError> {
        session
            .query_field(
                &format!("query NotificationRouter($id: ID!) {{ notificationRouter(id: $id) {{ {ROUTER_FIELDS} }} }}"),
                json!({ "id": id }),
                "notificationRouter",
            )
            .await
    }

    async fn fetch_by_natural_key(
        &self,
        session: &ConsoleSession,
        key: &str,
    ) -> Result<Option<NotificationRouterFragment>, RemoteError> {
        session
            .query_field(
                &format!("query NotificationRouterByName($name: String!) {{ notificationRouter(name: $name) {{ {ROUTER_FIELDS} }} }}"),
                json!({ "name": key }),
                "notificationRouter",
            )
            .await
    }

    async fn create(
        &self,
        session: &ConsoleSession,
        attributes: &NotificationRouterAttributes,
    ) -> Result<NotificationRouterFragment, RemoteError> {
        Self::upsert(session, attributes).await
    }

    /// The upsert is keyed by name, so the ID is implied by the attributes
    async fn update(
        &self,
        session: &ConsoleSession,
        _id: &str,
        attributes: &NotificationRouterAttributes,
    ) -> Result<NotificationRouterFragment, RemoteError> {
        Self::upsert(session, attributes).await
    }

    async fn delete(&self, session: &ConsoleSession, id: &str) -> Result<(), RemoteError> {
        session
            .execute(
                "mutation DeleteNotificationRouter($id: ID!) { deleteNotificationRouter(id: $id) { id } }",
                json!({ "id": id }),
            )
            .await
            .map(|_| ())
    }
}
