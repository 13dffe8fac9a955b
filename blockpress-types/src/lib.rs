//! Shared types for blockpress
//!
//! Identifiers used across the editor core, the save pipeline and the
//! document service, plus the media reference shape stored on documents.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate a fresh random document id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId(id.to_string())
    }
}

/// Block identifier
///
/// Opaque and stable across edits. Fresh ids come from [`BlockId::generate`]
/// and are never handed out twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        BlockId(id.to_string())
    }
}

/// Owner of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to externally hosted media (cover or icon image).
///
/// `time_stamp` is a cache-busting value bumped whenever the asset behind
/// `url` is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    pub time_stamp: i64,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, time_stamp: i64) -> Self {
        Self {
            url: url.into(),
            time_stamp,
        }
    }

    /// URL with the cache-busting timestamp appended as a query parameter.
    pub fn versioned_url(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}t={}", self.url, sep, self.time_stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_block_ids_are_unique() {
        let a = BlockId::generate();
        let b = BlockId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = DocId::new("doc-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"doc-1\"");
    }

    #[test]
    fn test_media_ref_versioned_url() {
        let media = MediaRef::new("https://cdn.example.com/a.png", 42);
        assert_eq!(media.versioned_url(), "https://cdn.example.com/a.png?t=42");

        let media = MediaRef::new("https://cdn.example.com/a.png?w=200", 7);
        assert_eq!(media.versioned_url(), "https://cdn.example.com/a.png?w=200&t=7");

        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["timeStamp"], 7);
    }
}
