use async_trait::async_trait;
use crate::{error::Result, types::ContentItem};

/// Core abstraction for a content tree
///
/// Paths are logical: root-relative and `/`-separated. Adapters (HTTP
/// handlers, CLIs) hold an `Arc<dyn ContentSource>` and call these.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Describe the item at `path`
    ///
    /// Returns `ContentError::NotFound` if nothing exists there
    async fn get(&self, path: &str) -> Result<ContentItem>;

    /// Read the full text of a file
    ///
    /// Returns `ContentError::InvalidOperation` for directories
    async fn read_body(&self, path: &str) -> Result<String>;

    /// List a directory, either its children or every descendant
    async fn list(&self, path: &str, recursive: bool) -> Result<Vec<ContentItem>>;

    /// Write `body` to `path`, creating missing parent directories
    async fn save(&self, path: &str, body: &str) -> Result<ContentItem>;

    /// Remove a file or a whole directory tree
    ///
    /// Returns `false` if there was nothing to delete
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Get a human-readable identifier for this source (for logging/debugging)
    fn identifier(&self) -> String;

    /// Check if a path exists
    ///
    /// Default implementation calls `get`; `NotFound` means `false` and any
    /// other error, traversal included, is returned
    async fn exists(&self, path: &str) -> Result<bool> {
        match self.get(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
