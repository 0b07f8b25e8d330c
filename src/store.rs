use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::{
    config::StoreConfig,
    error::{ContentError, Result},
    metadata,
    path::{self, PathResolver},
    related::RelatedDocumentScorer,
    scanner::{not_found_or_io, ContentTreeScanner},
    source::ContentSource,
    types::{ContentItem, DirectoryListing, Document, RelatedDocument},
};

/// Filesystem-backed content tree
///
/// Composes path resolution, scanning, metadata extraction and related
/// document scoring behind [`ContentSource`]. Holds nothing but immutable
/// configuration, so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct ContentStore {
    config: Arc<StoreConfig>,
    resolver: PathResolver,
    scanner: ContentTreeScanner,
    scorer: RelatedDocumentScorer,
}

impl ContentStore {
    /// Create a store without touching the filesystem
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let resolver = PathResolver::new(&config.root)?;
        let scanner = ContentTreeScanner::new(resolver.clone(), config.clone());
        let scorer = RelatedDocumentScorer::new(scanner.clone());

        Ok(Self {
            config,
            resolver,
            scanner,
            scorer,
        })
    }

    /// Create a store, creating the content root if it does not exist yet
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let store = Self::new(config)?;
        let root = store.root();
        fs::create_dir_all(root)
            .await
            .map_err(|e| ContentError::io(root, e))?;

        tracing::info!("content store ready at {}", root.display());
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The absolute content root
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Read a document with its metadata-stripped body and derived title
    ///
    /// A path that does not exist is retried with `.md` appended.
    pub async fn read_document(&self, path: &str) -> Result<Document> {
        let item = match self.scanner.item_at(path).await {
            Err(e) if e.is_not_found() => {
                let logical = self.resolver.clean(path)?;
                if logical.is_empty() || self.config.is_markdown(path::file_name_of(&logical)) {
                    return Err(e);
                }
                self.scanner.item_at(&format!("{}.md", logical)).await?
            }
            other => other?,
        };

        if item.is_dir() {
            return Err(ContentError::invalid_operation(
                item.path,
                "cannot read a directory as a document",
            ));
        }

        let raw = self.read_text(&item.path).await?;
        let body = if self.config.is_markdown(&item.name) {
            metadata::extract(&raw).body
        } else {
            raw.clone()
        };

        let title = metadata::derive_title(&item.metadata, &body, &item.name);
        let headings = metadata::headings(&body);
        let etag = format!("{:x}", Sha256::digest(raw.as_bytes()));

        Ok(Document {
            item,
            body,
            title,
            headings,
            etag,
        })
    }

    /// A directory item together with its sorted children
    pub async fn structure(&self, path: &str) -> Result<DirectoryListing> {
        let item = self.scanner.item_at(path).await?;
        if !item.is_dir() {
            return Err(ContentError::invalid_operation(item.path, "not a directory"));
        }

        let entries = self.scanner.list_children(&item.path).await?;
        Ok(DirectoryListing {
            path: item.path.clone(),
            item,
            entries,
        })
    }

    /// Path of the first markdown document below `dir`, in display order
    pub async fn first_document(&self, dir: &str) -> Result<Option<String>> {
        let found = self
            .scanner
            .list_descendants(dir)
            .await?
            .into_iter()
            .find(|item| item.is_file() && self.config.is_markdown(&item.name))
            .map(|item| item.path);

        tracing::debug!("first document under {:?}: {:?}", dir, found);
        Ok(found)
    }

    /// Related-document suggestions for `path`; empty on any failure
    pub async fn related(&self, path: &str, limit: usize) -> Vec<RelatedDocument> {
        self.scorer.find_related(path, limit).await
    }

    async fn read_text(&self, logical: &str) -> Result<String> {
        let absolute = self.resolver.resolve(logical)?;
        fs::read_to_string(&absolute)
            .await
            .map_err(|e| not_found_or_io(logical, &absolute, e))
    }

    /// Remove a directory tree children first
    async fn remove_tree(&self, dir: &Path) -> Result<()> {
        let mut stack: Vec<(PathBuf, bool)> = vec![(dir.to_path_buf(), false)];

        while let Some((current, emptied)) = stack.pop() {
            if emptied {
                fs::remove_dir(&current)
                    .await
                    .map_err(|e| ContentError::io(&current, e))?;
                continue;
            }

            let mut read_dir = fs::read_dir(&current)
                .await
                .map_err(|e| ContentError::io(&current, e))?;
            stack.push((current.clone(), true));

            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| ContentError::io(&current, e))?
            {
                let child = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| ContentError::io(&child, e))?;

                if file_type.is_dir() {
                    stack.push((child, false));
                } else {
                    fs::remove_file(&child)
                        .await
                        .map_err(|e| ContentError::io(&child, e))?;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ContentSource for ContentStore {
    async fn get(&self, path: &str) -> Result<ContentItem> {
        self.scanner.item_at(path).await
    }

    async fn read_body(&self, path: &str) -> Result<String> {
        let logical = self.resolver.clean(path)?;
        let absolute = self.resolver.resolve(&logical)?;

        let meta = fs::metadata(&absolute)
            .await
            .map_err(|e| not_found_or_io(&logical, &absolute, e))?;
        if meta.is_dir() {
            return Err(ContentError::invalid_operation(
                logical,
                "cannot read the body of a directory",
            ));
        }

        self.read_text(&logical).await
    }

    async fn list(&self, path: &str, recursive: bool) -> Result<Vec<ContentItem>> {
        if recursive {
            self.scanner.list_descendants(path).await
        } else {
            self.scanner.list_children(path).await
        }
    }

    async fn save(&self, path: &str, body: &str) -> Result<ContentItem> {
        let logical = self.resolver.clean(path)?;
        if logical.is_empty() {
            return Err(ContentError::invalid_operation(
                logical,
                "cannot write to the content root",
            ));
        }
        let absolute = self.resolver.resolve(&logical)?;

        if let Ok(meta) = fs::metadata(&absolute).await {
            if meta.is_dir() {
                return Err(ContentError::invalid_operation(
                    logical,
                    "a directory exists at this path",
                ));
            }
        }

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ContentError::io(parent, e))?;
        }
        fs::write(&absolute, body)
            .await
            .map_err(|e| ContentError::io(&absolute, e))?;

        tracing::debug!("saved {} bytes to {:?}", body.len(), logical);
        self.scanner.item_at(&logical).await
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let logical = self.resolver.clean(path)?;
        if logical.is_empty() {
            return Err(ContentError::invalid_operation(
                logical,
                "cannot delete the content root",
            ));
        }
        let absolute = self.resolver.resolve(&logical)?;

        let meta = match fs::symlink_metadata(&absolute).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(ContentError::io(&absolute, e)),
        };

        if meta.is_dir() {
            self.remove_tree(&absolute).await?;
        } else {
            fs::remove_file(&absolute)
                .await
                .map_err(|e| ContentError::io(&absolute, e))?;
        }

        tracing::debug!("deleted {:?}", logical);
        Ok(true)
    }

    fn identifier(&self) -> String {
        format!("file://{}", self.root().display())
    }
}
