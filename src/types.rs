use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata attached to a content item
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Type of content entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// A file or directory in the content tree
///
/// Always computed fresh from the filesystem. Directory paths never end
/// in `/`, and the root has the empty path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Final path segment
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Root-relative logical path
    pub path: String,
    /// Size in bytes, 0 for directories
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Display priority, lower sorts first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ContentItem {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    /// The `title` metadata value, if it is a non-empty string
    pub fn title(&self) -> Option<&str> {
        self.metadata
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Normalized tags, empty if none were declared
    pub fn tags(&self) -> Vec<&str> {
        self.metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|tags| tags.iter().filter_map(|t| t.as_str()).collect())
            .unwrap_or_default()
    }
}

/// A markdown document read together with its derived presentation data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub item: ContentItem,
    /// Text after the front matter block
    pub body: String,
    /// Front matter title, first heading, or the file stem, in that order
    pub title: String,
    pub headings: Vec<String>,
    /// Hex SHA-256 of the raw file text
    pub etag: String,
}

/// A directory together with its sorted immediate children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// The path that was listed
    pub path: String,
    pub item: ContentItem,
    /// Entries found in the directory
    pub entries: Vec<ContentItem>,
}

/// A related-document suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedDocument {
    pub path: String,
    pub title: String,
    pub score: f64,
}
