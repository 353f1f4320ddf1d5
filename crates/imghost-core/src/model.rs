//! Records exchanged with the image-hosting service.
//!
//! Field names follow the service's JSON (camelCase). Records are owned by
//! the service; the client only keeps read-mostly cached copies.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a remote record.
///
/// The service is free to send either a JSON number or a string. The value
/// is sent back in whatever form it arrived so request bodies stay
/// byte-compatible with what the service expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::Text(value)
    }
}

/// A point in time as the service sends it: epoch milliseconds or an ISO
/// 8601 string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Iso(String),
}

impl Timestamp {
    /// Parsed instant, `None` when the text is not a recognised ISO form.
    ///
    /// Strings without an offset are read as UTC.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Timestamp::Iso(text) => parse_iso(text.trim()),
        }
    }

    /// Zero and blank values carry no date.
    pub fn is_blank(&self) -> bool {
        match self {
            Timestamp::Millis(ms) => *ms == 0,
            Timestamp::Iso(text) => text.trim().is_empty(),
        }
    }
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<i64> for Timestamp {
    fn from(ms: i64) -> Self {
        Timestamp::Millis(ms)
    }
}

impl From<&str> for Timestamp {
    fn from(text: &str) -> Self {
        Timestamp::Iso(text.to_string())
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Fields the client does not interpret but must not drop when the
    /// record is persisted and restored.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A label that can be attached to images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// Number of images carrying this tag.
    #[serde(default)]
    pub count: u64,
}

/// One uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: RecordId,
    /// Locator the browser loads the image from.
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub file_name: String,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<Timestamp>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl ImageRecord {
    /// Upload instant, if the service sent a readable one.
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.upload_time.as_ref().and_then(Timestamp::instant)
    }

    /// Overlay a partial record returned by the service onto this one.
    ///
    /// Keys present in `patch` replace the cached values; everything else is
    /// kept. A patch that would produce an invalid record is rejected and the
    /// record stays untouched.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}

/// Server-side pagination of the image listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            total: 0,
            total_pages: 0,
        }
    }
}

/// Pagination fields the service may return; absent fields keep the
/// client's current values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationPatch {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub total: Option<u64>,
    pub total_pages: Option<u32>,
}

impl Pagination {
    pub fn apply(&mut self, patch: PaginationPatch) {
        if let Some(page) = patch.page {
            self.page = page;
        }
        if let Some(limit) = patch.limit {
            self.limit = limit;
        }
        if let Some(total) = patch.total {
            self.total = total;
        }
        if let Some(total_pages) = patch.total_pages {
            self.total_pages = total_pages;
        }
    }
}
