use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object of a bucket as known to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub key: String,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredObject {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
            last_modified: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }
}

/// One page of a paginated listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPage {
    pub items: Vec<StoredObject>,
    pub next_cursor: Option<String>,
    pub is_truncated: bool,
}

/// Whole-object download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectBody {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_length: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFailure {
    pub key: String,
    pub reason: String,
}

/// Per-key outcome of a bulk delete. Partial failure is a normal result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted: Vec<String>,
    pub errors: Vec<KeyFailure>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResult {
    pub success: bool,
    pub count: u64,
}
