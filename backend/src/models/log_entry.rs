//! Analytics event record accepted by the ingestion endpoint.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Unix seconds of `0001-01-01T00:00:00Z`, the zero time emitted by some clients.
const ZERO_TIME_UNIX: i64 = -62_135_596_800;

/// Error raised when an inbound payload cannot become a [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    /// Body is not JSON, or a field has the wrong type.
    #[error("invalid JSON: {0}")]
    Malformed(String),

    /// A required field is absent or empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },
}

/// One analytics event.
///
/// Field names are the wire names, both on the HTTP body and in the
/// persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Originating user or session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Event kind, e.g. `view_page`. Must be non-empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub event_type: String,

    /// Originating page or route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Free-form string attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, String>>,

    /// When the event happened. Filled in at receipt if absent or zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl LogEntry {
    /// Create an entry with only the event type set.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            event_type: event_type.into(),
            path: None,
            meta: None,
            timestamp: None,
        }
    }

    /// Parse and validate a JSON request body.
    ///
    /// Type errors carry the line and column of the offending value.
    pub fn from_json(body: &[u8]) -> Result<Self, EntryError> {
        let entry: LogEntry =
            serde_json::from_slice(body).map_err(|e| EntryError::Malformed(e.to_string()))?;

        entry.validate()?;
        Ok(entry)
    }

    /// Check the required fields.
    pub fn validate(&self) -> Result<(), EntryError> {
        if self.event_type.is_empty() {
            return Err(EntryError::MissingField {
                field: "event_type",
            });
        }
        Ok(())
    }

    /// Whether a usable (non-zero) timestamp is present.
    pub fn has_timestamp(&self) -> bool {
        self.timestamp.as_ref().is_some_and(|ts| !is_zero_time(ts))
    }

    /// Set the timestamp to `now` unless a non-zero one is already present.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        if !self.has_timestamp() {
            self.timestamp = Some(now);
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// `0001-01-01T00:00:00Z` counts as "no timestamp".
fn is_zero_time(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == ZERO_TIME_UNIX && ts.timestamp_subsec_nanos() == 0
}
