//! HTTP client for the entry API.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::{EntryPage, RemoteEntries, RemoteError, RemoteResult, MAX_PAGE_SIZE};
use crate::auth::{await_ready, AuthError, IdentityProvider, RetryPolicy};
use crate::config::JournalConfig;
use crate::models::{Entry, EntryId, EntryUpdate};
use crate::util::compact_text;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
    Get,
    List,
    Delete,
}

impl Operation {
    const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Get => "get",
            Self::List => "list",
            Self::Delete => "delete",
        }
    }
}

/// [`RemoteEntries`] over HTTPS with bearer authentication
#[derive(Debug)]
pub struct HttpRemoteClient<A> {
    client: reqwest::Client,
    entries_url: String,
    health_url: String,
    identity: A,
    auth_ready: RetryPolicy,
    ready: OnceCell<()>,
}

impl<A: IdentityProvider> HttpRemoteClient<A> {
    pub fn new(config: &JournalConfig, identity: A) -> RemoteResult<Self> {
        let (Some(entries_url), Some(health_url)) = (config.entries_url(), config.health_url())
        else {
            return Err(RemoteError::InvalidConfiguration(
                "api_base_url is not set".to_string(),
            ));
        };

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| RemoteError::InvalidConfiguration(error.to_string()))?;

        Ok(Self {
            client,
            entries_url,
            health_url,
            identity,
            auth_ready: config.auth_ready,
            ready: OnceCell::new(),
        })
    }

    pub const fn identity(&self) -> &A {
        &self.identity
    }

    pub fn entries_url(&self) -> &str {
        &self.entries_url
    }

    /// Check whether the API host answers its health endpoint.
    ///
    /// Used by hosts without a platform connectivity signal.
    pub async fn probe_health(&self) -> bool {
        match self
            .client
            .get(&self.health_url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                let healthy = response.status().is_success();
                tracing::debug!("Health probe returned {}", response.status());
                healthy
            }
            Err(error) => {
                tracing::debug!("Health probe failed: {error}");
                false
            }
        }
    }

    fn entry_url(&self, id: &EntryId) -> String {
        format!("{}/{}", self.entries_url, urlencoding::encode(id.as_str()))
    }

    async fn token(&self) -> RemoteResult<String> {
        if !self.identity.is_authenticated().await {
            return Err(RemoteError::AuthRequired(
                AuthError::NotAuthenticated.to_string(),
            ));
        }
        self.identity
            .get_token()
            .await
            .map_err(|error| RemoteError::AuthRequired(error.to_string()))
    }

    async fn send(
        &self,
        operation: Operation,
        id: Option<&EntryId>,
        request: RequestBuilder,
    ) -> RemoteResult<Response> {
        self.prepare().await?;
        let token = self.token().await?;

        let response = request
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| transport_error(operation, &error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = map_status(operation, id, status, &body);
        tracing::debug!("Remote {} failed: {error}", operation.label());
        Err(error)
    }
}

impl<A: IdentityProvider> RemoteEntries for HttpRemoteClient<A> {
    async fn prepare(&self) -> RemoteResult<()> {
        self.ready
            .get_or_try_init(|| await_ready(&self.identity, self.auth_ready))
            .await
            .map(|_| ())
            .map_err(|error| RemoteError::AuthRequired(error.to_string()))
    }

    async fn create(&self, entry: &Entry) -> RemoteResult<Entry> {
        let request = self.client.post(&self.entries_url).json(entry);
        let response = self.send(Operation::Create, Some(entry.id()), request).await?;
        let envelope: EntryEnvelope = decode(Operation::Create, response).await?;
        Ok(envelope.into_entry())
    }

    async fn update(&self, id: &EntryId, update: &EntryUpdate) -> RemoteResult<Entry> {
        let request = self.client.put(self.entry_url(id)).json(update);
        let response = self.send(Operation::Update, Some(id), request).await?;
        let envelope: EntryEnvelope = decode(Operation::Update, response).await?;
        Ok(envelope.into_entry())
    }

    async fn get(&self, id: &EntryId) -> RemoteResult<Entry> {
        let request = self.client.get(self.entry_url(id));
        let response = self.send(Operation::Get, Some(id), request).await?;
        let envelope: EntryEnvelope = decode(Operation::Get, response).await?;
        Ok(envelope.into_entry())
    }

    async fn list(&self, limit: u32, offset: u32) -> RemoteResult<EntryPage> {
        let request = self.client.get(&self.entries_url).query(&[
            ("limit", limit.clamp(1, MAX_PAGE_SIZE)),
            ("offset", offset),
        ]);
        let response = self.send(Operation::List, None, request).await?;
        let envelope: PageEnvelope = decode(Operation::List, response).await?;
        Ok(envelope.into_page())
    }

    async fn delete(&self, id: &EntryId) -> RemoteResult<()> {
        let request = self.client.delete(self.entry_url(id));
        self.send(Operation::Delete, Some(id), request).await?;
        Ok(())
    }
}

/// Create/update answer `{message, data}`; get answers the bare entry
#[derive(Deserialize)]
#[serde(untagged)]
enum EntryEnvelope {
    Wrapped { data: Entry },
    Bare(Entry),
}

impl EntryEnvelope {
    fn into_entry(self) -> Entry {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageEnvelope {
    Wrapped {
        #[serde(alias = "entries")]
        data: Vec<Entry>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<Entry>),
}

impl PageEnvelope {
    fn into_page(self) -> EntryPage {
        let (entries, total) = match self {
            Self::Wrapped { data, total } => (data, total),
            Self::Bare(data) => (data, None),
        };
        let total = total.unwrap_or(entries.len() as u64);
        EntryPage { entries, total }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn decode<T: DeserializeOwned>(operation: Operation, response: Response) -> RemoteResult<T> {
    let body = response
        .text()
        .await
        .map_err(|error| transport_error(operation, &error))?;
    serde_json::from_str(&body).map_err(|error| {
        RemoteError::Server(format!(
            "Malformed {} response: {error}",
            operation.label()
        ))
    })
}

fn transport_error(operation: Operation, error: &reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Network(format!("{} request timed out", operation.label()))
    } else if error.is_decode() {
        RemoteError::Server(format!("Malformed {} response: {error}", operation.label()))
    } else {
        RemoteError::Network(format!("{} request failed: {error}", operation.label()))
    }
}

fn map_status(
    operation: Operation,
    id: Option<&EntryId>,
    status: StatusCode,
    body: &str,
) -> RemoteError {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::AuthRequired(message),
        StatusCode::NOT_FOUND => {
            let target = id.map_or_else(|| message.clone(), ToString::to_string);
            match operation {
                Operation::Update => RemoteError::NotFoundOrUnauthorized(target),
                Operation::Get | Operation::Delete => RemoteError::NotFound(target),
                Operation::Create | Operation::List => RemoteError::Server(message),
            }
        }
        _ => RemoteError::Server(message),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}
