//! Firestore REST client for the `users/{uid}/todos` collection.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::RemoteStore;
use crate::error::{Error, Result};
use crate::models::{NewTask, Task, TaskId, UserId};
use crate::util::{compact_text, format_timestamp, is_http_url, parse_timestamp};

/// Public Firestore REST endpoint.
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

const PAGE_SIZE: usize = 300;

/// Connection settings for a Firestore project.
#[derive(Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    /// Firebase project id
    pub project_id: String,
    /// Optional web API key appended as `key=`
    pub api_key: Option<String>,
    /// REST base URL (emulators use `http://localhost:8080/v1`)
    pub base_url: String,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: None,
            base_url: DEFAULT_FIRESTORE_URL.to_string(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

impl fmt::Debug for FirestoreConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Firestore-backed [`RemoteStore`].
#[derive(Clone)]
pub struct FirestoreStore {
    config: FirestoreConfig,
    id_token: String,
    client: Client,
}

impl fmt::Debug for FirestoreStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FirestoreStore")
            .field("config", &self.config)
            .field("id_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl FirestoreStore {
    /// Build a client authenticated with a Firebase id token.
    pub fn new(config: FirestoreConfig, id_token: impl Into<String>) -> Result<Self> {
        if config.project_id.trim().is_empty() {
            return Err(Error::Config(
                "Firestore project id must not be empty".to_string(),
            ));
        }
        if !is_http_url(&config.base_url) {
            return Err(Error::Config(
                "Firestore base URL must include http:// or https://".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            config,
            id_token: id_token.into(),
            client,
        })
    }

    pub const fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn collection_url(&self, user_id: &UserId) -> String {
        format!(
            "{}/users/{}/todos",
            self.config.documents_url(),
            urlencoding::encode(user_id.as_str())
        )
    }

    fn document_url(&self, user_id: &UserId, id: &TaskId) -> String {
        format!(
            "{}/{}",
            self.collection_url(user_id),
            urlencoding::encode(id.as_str())
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .bearer_auth(&self.id_token)
            .header(reqwest::header::ACCEPT, "application/json");
        match self.config.api_key.as_deref() {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn fetch_page(&self, user_id: &UserId, page_token: Option<&str>) -> Result<ListResponse> {
        let page_size = PAGE_SIZE.to_string();
        let mut query = vec![("orderBy", "createdAt desc"), ("pageSize", page_size.as_str())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let request = self
            .authorized(self.client.get(self.collection_url(user_id)))
            .query(&query);
        let response = request
            .send()
            .await
            .map_err(|error| Error::RemoteUnavailable(error.to_string()))?;
        let response = check_status(response)
            .await
            .map_err(Error::RemoteUnavailable)?;

        response
            .json::<ListResponse>()
            .await
            .map_err(|error| Error::RemoteUnavailable(format!("invalid list response: {error}")))
    }
}

#[async_trait]
impl RemoteStore for FirestoreStore {
    async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(user_id, page_token.as_deref()).await?;
            tasks.extend(
                page.documents
                    .iter()
                    .filter_map(|document| decode_task(document, user_id)),
            );

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Fetched {} remote tasks for {}", tasks.len(), user_id);
        Ok(tasks)
    }

    async fn create(&self, user_id: &UserId, task: &NewTask) -> Result<TaskId> {
        let payload = encode_new_task(task, &format_timestamp(&Utc::now()));
        let request = self
            .authorized(self.client.post(self.collection_url(user_id)))
            .json(&payload);

        let response = request
            .send()
            .await
            .map_err(|error| Error::RemoteWrite(error.to_string()))?;
        let response = check_status(response).await.map_err(Error::RemoteWrite)?;
        let document = response
            .json::<Document>()
            .await
            .map_err(|error| Error::RemoteWrite(format!("invalid create response: {error}")))?;

        document_id(&document.name)
            .ok_or_else(|| Error::RemoteWrite("create response did not include a document name".into()))
    }

    async fn delete(&self, user_id: &UserId, id: &TaskId) -> Result<()> {
        let request = self.authorized(self.client.delete(self.document_url(user_id, id)));
        let response = request
            .send()
            .await
            .map_err(|error| Error::RemoteWrite(error.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Remote task {} already absent", id);
            return Ok(());
        }
        check_status(response).await.map_err(Error::RemoteWrite)?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
    create_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

async fn check_status(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(parse_api_error(status, &body))
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorEnvelope { error: Some(error) }) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = error.message {
            let label = error.status.unwrap_or_default();
            return compact_text(&format!(
                "{} {} ({})",
                label,
                message.trim(),
                status.as_u16()
            ));
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn encode_new_task(task: &NewTask, created_at: &str) -> Value {
    json!({
        "fields": {
            "title": { "stringValue": task.title },
            "completed": { "booleanValue": task.completed },
            "createdAt": { "timestampValue": created_at },
        }
    })
}

fn document_id(name: &str) -> Option<TaskId> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(TaskId::from)
}

fn decode_task(document: &Document, user_id: &UserId) -> Option<Task> {
    let id = document_id(&document.name)?;

    let Some(title) = field(document, "title", "stringValue").and_then(Value::as_str) else {
        tracing::warn!("Skipping remote task {} without a title", id);
        return None;
    };

    let completed = field(document, "completed", "booleanValue")
        .and_then(Value::as_bool)
        .or_else(|| {
            field(document, "completed", "integerValue")
                .and_then(Value::as_str)
                .map(|value| value == "1")
        })
        .unwrap_or(false);

    // Other clients may write createdAt as text; the cache keeps milliseconds
    let created_at = field(document, "createdAt", "timestampValue")
        .or_else(|| field(document, "createdAt", "stringValue"))
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .or_else(|| document.create_time.as_deref().and_then(parse_timestamp))
        .map(|created_at| created_at.trunc_subsecs(3));
    let Some(created_at) = created_at else {
        tracing::warn!("Skipping remote task {} without a creation time", id);
        return None;
    };

    Some(Task {
        id,
        title: title.to_string(),
        completed,
        created_at,
        user_id: user_id.clone(),
    })
}

fn field<'a>(document: &'a Document, name: &str, kind: &str) -> Option<&'a Value> {
    document.fields.get(name)?.get(kind)
}
