//! Audit records stored in Firestore through its REST API.
//!
//! Records land in the `file_events` collection. The document carries the
//! headline fields (`filename`, `original_backed_up`, `timestamp`,
//! `file_type`, `sanitized`, `error`) followed by the full transaction record.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use cleanslate_core::{
    AuditLog, CollaboratorError, CollaboratorResult, RecordId, RunState, TransactionRecord,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::{AdapterError, AdapterResult};

/// Collection receiving audit documents.
pub const COLLECTION: &str = "file_events";

const PRODUCTION_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Connection settings for [`FirestoreAuditLog`].
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Google Cloud project id.
    pub project_id: String,
    /// Bearer token presented on each request.
    pub access_token: Option<String>,
    /// API root, e.g. `https://firestore.googleapis.com/v1`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct ServiceAccount {
    project_id: Option<String>,
}

impl FirestoreConfig {
    /// Build settings from a service-account file.
    ///
    /// `emulator_host` (`host:port`) switches the API root to the local
    /// emulator over plain HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error when the credentials file cannot be read, is not JSON,
    /// or lacks a `project_id`.
    pub fn from_credentials(
        path: &Path,
        access_token: Option<String>,
        emulator_host: Option<&str>,
        timeout: Duration,
    ) -> AdapterResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| AdapterError::CredentialsRead {
            path: path.to_path_buf(),
            source,
        })?;
        let account: ServiceAccount =
            serde_json::from_str(&raw).map_err(|source| AdapterError::CredentialsParse {
                path: path.to_path_buf(),
                source,
            })?;
        let project_id = account
            .project_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AdapterError::MissingProjectId {
                path: path.to_path_buf(),
            })?;
        let base_url = emulator_host.map_or_else(
            || PRODUCTION_BASE_URL.to_string(),
            |host| format!("http://{host}/v1"),
        );
        Ok(Self {
            project_id,
            access_token,
            base_url,
            timeout,
        })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{COLLECTION}",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

/// [`AuditLog`] writing documents into Firestore.
#[derive(Debug, Clone)]
pub struct FirestoreAuditLog {
    client: reqwest::Client,
    config: FirestoreConfig,
}

impl FirestoreAuditLog {
    /// Construct the sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: FirestoreConfig) -> AdapterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| AdapterError::HttpClient { source })?;
        Ok(Self { client, config })
    }
}

#[derive(Deserialize)]
struct CreatedDocument {
    name: String,
}

/// Encode a JSON value as a Firestore `Value`.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => number.as_i64().map_or_else(
            || json!({ "doubleValue": number.as_f64() }),
            |int| json!({ "integerValue": int.to_string() }),
        ),
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Build the Firestore document body for a record.
fn document_body(record: &TransactionRecord) -> CollaboratorResult<Value> {
    let Value::Object(mut fields) = serde_json::to_value(record)
        .map_err(|err| CollaboratorError::fatal("audit", format!("record not serializable: {err}")))?
    else {
        return Err(CollaboratorError::fatal("audit", "record did not serialize to an object"));
    };
    fields.insert("filename".into(), Value::String(record.file_name.clone()));
    fields.insert(
        "original_backed_up".into(),
        Value::Bool(record.original_backed_up()),
    );
    fields.insert(
        "sanitized".into(),
        Value::Bool(matches!(
            record.state,
            RunState::Sanitized | RunState::Relocated | RunState::Audited | RunState::RelocateFailed
        )),
    );
    fields.insert(
        "error".into(),
        record.failure.clone().map_or(Value::Null, Value::String),
    );
    fields.insert(
        "remote".into(),
        record
            .remote_ref
            .as_ref()
            .map_or(Value::Null, |remote| Value::String(remote.to_string())),
    );

    let mut encoded = encode_fields(&fields);
    encoded.insert(
        "timestamp".into(),
        json!({
            "timestampValue": record.finished_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        }),
    );
    Ok(json!({ "fields": encoded }))
}

fn classify_status(status: StatusCode, body: &str) -> CollaboratorError {
    let detail = format!("firestore responded with {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        CollaboratorError::transient("audit", detail)
    } else {
        CollaboratorError::fatal("audit", detail)
    }
}

#[async_trait]
impl AuditLog for FirestoreAuditLog {
    async fn record(&self, record: &TransactionRecord) -> CollaboratorResult<RecordId> {
        let body = document_body(record)?;
        let mut request = self.client.post(self.config.collection_url()).json(&body);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| {
            CollaboratorError::transient("audit", format!("firestore request failed: {err}"))
        })?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = classify_status(status, &text);
            warn!(run_id = %record.run_id, %status, transient = err.is_transient(), "audit write rejected");
            return Err(err);
        }

        let created: CreatedDocument = response.json().await.map_err(|err| {
            CollaboratorError::transient("audit", format!("unreadable firestore response: {err}"))
        })?;
        let record_id = created
            .name
            .rsplit('/')
            .next()
            .unwrap_or(created.name.as_str())
            .to_string();
        info!(run_id = %record.run_id, record_id = %record_id, "audit record stored");
        Ok(record_id)
    }
}
