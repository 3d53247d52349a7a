//! # Console API Client
//!
//! Thin GraphQL-over-HTTP client for the Console API.
//!
//! A [`ConsoleClient`] holds the shared HTTP connection pool. Every
//! reconciliation binds it to the token resolved for its namespace with
//! [`ConsoleClient::session`], so requests never leak across credentials.

mod error;

pub use error::RemoteError;

use crate::constants::CONSOLE_GRAPHQL_PATH;
use crate::credentials::Token;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct ConsoleClient {
    http: reqwest::Client,
    endpoint: String,
}

impl std::fmt::Debug for ConsoleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ConsoleClient {
    /// Create a client for the Console at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("console-sync-controller/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Api(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CONSOLE_GRAPHQL_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bind the client to a token
    pub fn session(&self, token: &Token) -> ConsoleSession {
        ConsoleSession {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            token: token.clone(),
        }
    }
}

/// Console API client bound to one token
#[derive(Clone)]
pub struct ConsoleSession {
    http: reqwest::Client,
    endpoint: String,
    token: Token,
}

impl std::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl ConsoleSession {
    /// Run a GraphQL document and return its `data` object
    ///
    /// # Errors
    ///
    /// Returns a classified [`RemoteError`] for HTTP failures and GraphQL errors.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value, RemoteError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.token.expose()),
            )
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status, &body));
        }

        let body: GraphQlResponse = response.json().await?;
        if let Some(first) = body.errors.first() {
            debug!("Console API returned {} error(s)", body.errors.len());
            return Err(RemoteError::from_graphql_message(&first.message));
        }
        body.data
            .ok_or_else(|| RemoteError::Decode("response carried no data".to_string()))
    }

    /// Run a GraphQL document and decode one top-level field of `data`
    ///
    /// A `null` field or a not-found error yields `None`.
    ///
    /// # Errors
    ///
    /// Returns every other [`RemoteError`], or a decode error if the field
    /// does not match `T`.
    pub async fn query_field<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        field: &str,
    ) -> Result<Option<T>, RemoteError> {
        match self.execute(query, variables).await {
            Ok(data) => decode_field(data, field),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run a GraphQL mutation and decode one required top-level field of `data`
    ///
    /// # Errors
    ///
    /// Returns every [`RemoteError`], or a decode error if the field is
    /// missing or does not match `T`.
    pub async fn mutate_field<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        field: &str,
    ) -> Result<T, RemoteError> {
        let data = self.execute(query, variables).await?;
        decode_field(data, field)?
            .ok_or_else(|| RemoteError::Decode(format!("mutation returned no '{field}'")))
    }
}

fn decode_field<T: DeserializeOwned>(mut data: Value, field: &str) -> Result<Option<T>, RemoteError> {
    match data.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| RemoteError::Decode(format!("field '{field}': {e}"))),
    }
}
