//! Pact contract tests for the Console GraphQL API
//!
//! These tests define the contract between the Console Sync Controller and the
//! Console API. Pact starts a mock server that answers the GraphQL documents
//! the adapters send.

mod common;

use common::init_rustls;
use console_sync_controller::console::{ConsoleClient, ConsoleSession, RemoteError};
use console_sync_controller::credentials::Token;
use console_sync_controller::engine::{RemoteObject, Syncable};
use console_sync_controller::kinds::{
    NotificationRouterAdapter, NotificationRouterAttributes, RouterSinkAttributes,
};
use pact_consumer::prelude::*;
use serde_json::json;
use std::time::Duration;

const CONSUMER: &str = "Console-Sync-Controller";
const PROVIDER: &str = "Console-API";

/// Session against the mock server, whose URL is passed as a string
fn session(mut base_url: String) -> ConsoleSession {
    if base_url.ends_with('/') {
        base_url.pop();
    }
    ConsoleClient::new(&base_url, Duration::from_secs(5))
        .expect("valid mock server url")
        .session(&Token::new("test-token"))
}

#[tokio::test]
async fn test_fetch_notification_router_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("fetch a notification router by id", "", |mut i| {
        i.given("notification router router-1 exists");
        i.request
            .method("POST")
            .path("/gql")
            .header("authorization", "Token test-token")
            .json_body(json_pattern!({
                "query": like!("query NotificationRouter($id: ID!) { notificationRouter(id: $id) { id name } }"),
                "variables": { "id": "router-1" }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": { "notificationRouter": { "id": "router-1", "name": "deploys" } }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let session = session(mock_server.url().to_string());

    let router = NotificationRouterAdapter
        .fetch_observed(&session, "router-1")
        .await
        .expect("Failed to fetch router")
        .expect("router exists");

    assert_eq!(router.id(), "router-1");
    assert_eq!(router.name, "deploys");
}

#[tokio::test]
async fn test_missing_notification_router_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("fetch a notification router that does not exist", "", |mut i| {
        i.given("notification router router-404 does not exist");
        i.request
            .method("POST")
            .path("/gql")
            .header("authorization", "Token test-token")
            .json_body(json_pattern!({
                "query": like!("query NotificationRouter($id: ID!) { notificationRouter(id: $id) { id name } }"),
                "variables": { "id": "router-404" }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": { "notificationRouter": null },
                "errors": [{ "message": "could not find resource", "path": ["notificationRouter"] }]
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let session = session(mock_server.url().to_string());

    let router = NotificationRouterAdapter
        .fetch_observed(&session, "router-404")
        .await
        .expect("a missing router is not an error");

    assert!(router.is_none());
}

#[tokio::test]
async fn test_upsert_notification_router_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("upsert a notification router", "", |mut i| {
        i.given("notification sink sink-1 exists");
        i.request
            .method("POST")
            .path("/gql")
            .header("authorization", "Token test-token")
            .json_body(json_pattern!({
                "query": like!("mutation UpsertNotificationRouter($attributes: NotificationRouterAttributes!) { upsertNotificationRouter(attributes: $attributes) { id name } }"),
                "variables": {
                    "attributes": {
                        "name": "deploys",
                        "events": ["pipeline.failed", "service.update"],
                        "routerSinks": [{ "sinkId": "sink-1" }]
                    }
                }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": { "upsertNotificationRouter": { "id": "router-1", "name": "deploys" } }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let session = session(mock_server.url().to_string());

    let attributes = NotificationRouterAttributes {
        name: "deploys".to_string(),
        events: vec!["pipeline.failed".to_string(), "service.update".to_string()],
        filters: Vec::new(),
        router_sinks: vec![RouterSinkAttributes {
            sink_id: "sink-1".to_string(),
        }],
    };
    let router = NotificationRouterAdapter
        .create(&session, &attributes)
        .await
        .expect("Failed to upsert router");

    assert_eq!(router.id(), "router-1");
}

#[tokio::test]
async fn test_delete_blocked_by_dependents_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("delete a notification router that is still in use", "", |mut i| {
        i.given("notification router router-1 has dependents");
        i.request
            .method("POST")
            .path("/gql")
            .header("authorization", "Token test-token")
            .json_body(json_pattern!({
                "query": like!("mutation DeleteNotificationRouter($id: ID!) { deleteNotificationRouter(id: $id) { id } }"),
                "variables": { "id": "router-1" }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "data": { "deleteNotificationRouter": null },
                "errors": [{ "message": "router is still in use" }]
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let session = session(mock_server.url().to_string());

    let err = NotificationRouterAdapter
        .delete(&session, "router-1")
        .await
        .expect_err("delete is blocked");

    assert!(err.is_deletion_pending());
}

#[tokio::test]
async fn test_rejected_token_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("call the Console API with a revoked token", "", |mut i| {
        i.given("token test-token is revoked");
        i.request
            .method("POST")
            .path("/gql")
            .header("authorization", "Token test-token");
        i.response.status(401).body("invalid token");
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let session = session(mock_server.url().to_string());

    let err = session
        .execute("query { me { id } }", json!({}))
        .await
        .expect_err("token is rejected");

    assert!(matches!(err, RemoteError::Unauthorized(_)));
}
