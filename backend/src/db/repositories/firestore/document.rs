//! Firestore REST document encoding for log entries.

use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::LogEntry;

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn null_value() -> Value {
    json!({ "nullValue": null })
}

fn optional_string(value: Option<&str>) -> Value {
    value.map(string_value).unwrap_or_else(null_value)
}

/// Encode an entry as a Firestore `Document` body (`{"fields": {...}}`).
///
/// Absent optional fields are written as `nullValue` so every document has
/// the same five fields.
pub fn encode_entry(entry: &LogEntry) -> RepositoryResult<Value> {
    let timestamp = entry.timestamp.ok_or_else(|| {
        RepositoryError::validation_with_context(
            "entry has no timestamp",
            ErrorContext::new("encode_document"),
        )
    })?;

    let meta = match &entry.meta {
        Some(meta) => {
            let fields: Map<String, Value> = meta
                .iter()
                .map(|(k, v)| (k.clone(), string_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
        None => null_value(),
    };

    Ok(json!({
        "fields": {
            "user_id": optional_string(entry.user_id.as_deref()),
            "event_type": string_value(&entry.event_type),
            "path": optional_string(entry.path.as_deref()),
            "meta": meta,
            "timestamp": {
                "timestampValue": timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            },
        }
    }))
}

/// The part of a created document the store cares about.
#[derive(Debug, Deserialize)]
pub struct CreatedDocument {
    /// `projects/{p}/databases/{d}/documents/event_logs/{id}`
    pub name: String,
}

impl CreatedDocument {
    /// Trailing document id of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Summarize a Google API error body, falling back to the raw text.
pub fn describe_error(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) => match (error.status, error.message) {
            (Some(status), Some(message)) => format!("{}: {}", status, message),
            (None, Some(message)) => message,
            (Some(status), None) => status,
            (None, None) => body.trim().to_string(),
        },
        Err(_) => body.trim().to_string(),
    }
}
