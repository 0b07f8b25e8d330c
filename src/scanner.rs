use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::fs;

use crate::{
    config::StoreConfig,
    error::{ContentError, Result},
    metadata,
    path::{self, PathResolver},
    types::{ContentItem, EntryType, Metadata},
};

/// Enumerates directories below the content root
///
/// Hidden entries, the sidecar file and ignored directories are never
/// listed. With `markdown_only` set, non-markdown files are dropped too.
#[derive(Debug, Clone)]
pub struct ContentTreeScanner {
    resolver: PathResolver,
    config: Arc<StoreConfig>,
}

/// A listed child plus what the walk needs to know about it
struct Entry {
    item: ContentItem,
    absolute: PathBuf,
    is_symlink: bool,
}

impl ContentTreeScanner {
    pub fn new(resolver: PathResolver, config: Arc<StoreConfig>) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Build the item for a single logical path
    ///
    /// Returns `NotFound` if nothing exists there.
    pub async fn item_at(&self, path: &str) -> Result<ContentItem> {
        let logical = self.resolver.clean(path)?;
        let absolute = self.resolver.resolve(&logical)?;

        let meta = fs::metadata(&absolute)
            .await
            .map_err(|e| not_found_or_io(&logical, &absolute, e))?;

        Ok(self.build_item(&logical, &absolute, &meta).await)
    }

    /// Immediate children of a directory in display order
    pub async fn list_children(&self, dir: &str) -> Result<Vec<ContentItem>> {
        let (logical, absolute) = self.open_dir(dir).await?;
        let entries = self.read_children(&logical, &absolute).await?;

        tracing::debug!("listed {} children of {:?}", entries.len(), logical);
        Ok(entries.into_iter().map(|e| e.item).collect())
    }

    /// Every entry below a directory, pre-order, the directory itself excluded
    ///
    /// Each directory's children appear in display order right after it.
    /// Unreadable subtrees are skipped, and symlinked directories are listed
    /// without being entered.
    pub async fn list_descendants(&self, dir: &str) -> Result<Vec<ContentItem>> {
        let (logical, absolute) = self.open_dir(dir).await?;

        let mut stack: Vec<Entry> = self.read_children(&logical, &absolute).await?;
        stack.reverse();

        let mut descendants = Vec::new();
        while let Some(entry) = stack.pop() {
            if entry.item.is_dir() && !entry.is_symlink {
                match self.read_children(&entry.item.path, &entry.absolute).await {
                    Ok(children) => stack.extend(children.into_iter().rev()),
                    Err(e) => {
                        tracing::warn!("skipping unreadable directory {:?}: {}", entry.item.path, e)
                    }
                }
            }
            descendants.push(entry.item);
        }

        tracing::debug!("walked {} descendants of {:?}", descendants.len(), logical);
        Ok(descendants)
    }

    /// Whether a directory entry with this name is surfaced in listings
    pub fn is_listed(&self, name: &str, is_dir: bool) -> bool {
        if name.starts_with('.') || name == self.config.sidecar_name {
            return false;
        }
        if is_dir {
            !self.config.is_ignored_dir(name)
        } else {
            !self.config.markdown_only || self.config.is_markdown(name)
        }
    }

    async fn open_dir(&self, dir: &str) -> Result<(String, PathBuf)> {
        let logical = self.resolver.clean(dir)?;
        let absolute = self.resolver.resolve(&logical)?;

        let meta = fs::metadata(&absolute)
            .await
            .map_err(|e| not_found_or_io(&logical, &absolute, e))?;
        if !meta.is_dir() {
            return Err(ContentError::invalid_operation(logical, "not a directory"));
        }

        Ok((logical, absolute))
    }

    async fn read_children(&self, logical: &str, absolute: &Path) -> Result<Vec<Entry>> {
        let mut read_dir = fs::read_dir(absolute)
            .await
            .map_err(|e| ContentError::io(absolute, e))?;

        let mut entries = Vec::new();
        loop {
            let dir_entry = match read_dir.next_entry().await {
                Ok(Some(dir_entry)) => dir_entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stopped reading {}: {}", absolute.display(), e);
                    break;
                }
            };

            let name = dir_entry.file_name().to_string_lossy().into_owned();
            let child = dir_entry.path();

            let is_symlink = match dir_entry.file_type().await {
                Ok(file_type) => file_type.is_symlink(),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", child.display(), e);
                    continue;
                }
            };
            let meta = match fs::metadata(&child).await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!("skipping {}: {}", child.display(), e);
                    continue;
                }
            };

            if !self.is_listed(&name, meta.is_dir()) {
                continue;
            }

            let child_logical = path::join(logical, &name);
            let item = self.build_item(&child_logical, &child, &meta).await;
            entries.push(Entry {
                item,
                absolute: child,
                is_symlink,
            });
        }

        entries.sort_by(|a, b| display_order(&a.item, &b.item));
        Ok(entries)
    }

    async fn build_item(
        &self,
        logical: &str,
        absolute: &Path,
        meta: &std::fs::Metadata,
    ) -> ContentItem {
        let entry_type = if meta.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        };
        let name = path::file_name_of(logical).to_string();

        let extracted = match entry_type {
            EntryType::Directory => self.read_sidecar(absolute).await,
            EntryType::File if self.config.is_markdown(&name) => {
                self.read_front_matter(absolute).await
            }
            EntryType::File => None,
        };
        let (order, metadata) = extracted
            .map(|e| (e.order, e.metadata))
            .unwrap_or((None, Metadata::new()));

        ContentItem {
            name,
            entry_type,
            path: logical.to_string(),
            size: if meta.is_dir() { 0 } else { meta.len() },
            last_modified: meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default(),
            order,
            metadata,
        }
    }

    async fn read_sidecar(&self, dir: &Path) -> Option<metadata::Extracted> {
        let sidecar = dir.join(&self.config.sidecar_name);
        match fs::read_to_string(&sidecar).await {
            Ok(text) => Some(metadata::extract_directory(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("ignoring unreadable sidecar {}: {}", sidecar.display(), e);
                None
            }
        }
    }

    async fn read_front_matter(&self, file: &Path) -> Option<metadata::Extracted> {
        match fs::read_to_string(file).await {
            Ok(text) => Some(metadata::extract(&text)),
            Err(e) => {
                tracing::warn!("ignoring front matter of {}: {}", file.display(), e);
                None
            }
        }
    }
}

/// Display order: `order` ascending with unordered entries last, then
/// directories before files, then case-insensitive name
pub fn display_order(a: &ContentItem, b: &ContentItem) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) if x != y => return x.cmp(&y),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        _ => {}
    }

    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort items in place by [`display_order`]
pub fn sort_items(items: &mut [ContentItem]) {
    items.sort_by(display_order);
}

pub(crate) fn not_found_or_io(logical: &str, absolute: &Path, e: std::io::Error) -> ContentError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ContentError::NotFound {
            path: logical.to_string(),
        }
    } else {
        ContentError::io(absolute, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn item(name: &str, entry_type: EntryType, order: Option<i64>) -> ContentItem {
        ContentItem {
            name: name.to_string(),
            entry_type,
            path: name.to_string(),
            size: 0,
            last_modified: DateTime::<Utc>::default(),
            order,
            metadata: Metadata::new(),
        }
    }

    fn scanner(root: &Path) -> ContentTreeScanner {
        let config = Arc::new(StoreConfig::new(root));
        ContentTreeScanner::new(PathResolver::new(root).unwrap(), config)
    }

    fn write(root: &Path, relative: &str, text: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    fn names(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_sort_order() {
        let mut items = vec![
            item("b", EntryType::File, Some(2)),
            item("a", EntryType::File, None),
            item("c", EntryType::File, Some(1)),
            item("z", EntryType::Directory, None),
        ];
        sort_items(&mut items);
        assert_eq!(names(&items), vec!["c", "b", "z", "a"]);
    }

    #[test]
    fn test_sort_ties() {
        let mut items = vec![
            item("beta", EntryType::File, Some(1)),
            item("Alpha", EntryType::File, Some(1)),
            item("docs", EntryType::Directory, Some(1)),
            item("alpha", EntryType::File, None),
            item("Zed", EntryType::File, None),
        ];
        sort_items(&mut items);
        assert_eq!(names(&items), vec!["docs", "Alpha", "beta", "alpha", "Zed"]);
    }

    #[tokio::test]
    async fn test_list_children_filters_and_metadata() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "intro.md", "---\norder: 1\ntitle: Intro\n---\n# Intro");
        write(root, "notes.txt", "plain text");
        write(root, ".hidden.md", "secret");
        write(root, ".metadata", "title: Root");
        write(root, "guides/.metadata", "title: Guides\norder: 2");
        write(root, "guides/setup.md", "# Setup");
        write(root, "node_modules/pkg/readme.md", "# pkg");

        let scanner = scanner(root);
        let children = scanner.list_children("").await.unwrap();
        assert_eq!(names(&children), vec!["intro.md", "guides"]);

        let guides = &children[1];
        assert!(guides.is_dir());
        assert_eq!(guides.size, 0);
        assert_eq!(guides.path, "guides");
        assert_eq!(guides.order, Some(2));
        assert_eq!(guides.metadata.get("title"), Some(&json!("Guides")));

        let intro = &children[0];
        assert_eq!(intro.order, Some(1));
        assert_eq!(intro.title(), Some("Intro"));

        let nested = scanner.list_children("/guides/").await.unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].path, "guides/setup.md");
        assert!(nested[0].metadata.is_empty());
    }

    #[tokio::test]
    async fn test_non_markdown_files_when_enabled() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.md", "a");
        write(temp.path(), "b.txt", "b");

        let config = Arc::new(StoreConfig::new(temp.path()).with_markdown_only(false));
        let scanner = ContentTreeScanner::new(PathResolver::new(temp.path()).unwrap(), config);

        let children = scanner.list_children("").await.unwrap();
        assert_eq!(names(&children), vec!["a.md", "b.txt"]);
        assert_eq!(children[1].size, 1);
    }

    #[tokio::test]
    async fn test_list_descendants_pre_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "docs/x.md", "x");
        write(root, "docs/sub/z.md", "z");
        write(root, "docs/sub/.metadata", "order: 1");
        write(root, "docs/a.md", "a");
        write(root, "docs/.git/config.md", "ignored");

        let scanner = scanner(root);
        let all = scanner.list_descendants("docs").await.unwrap();
        let paths: Vec<&str> = all.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/sub", "docs/sub/z.md", "docs/a.md", "docs/x.md"]);

        let everything = scanner.list_descendants("").await.unwrap();
        assert_eq!(everything.first().map(|i| i.path.as_str()), Some("docs"));
        assert_eq!(everything.len(), 5);
    }

    #[tokio::test]
    async fn test_listing_errors() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "file.md", "x");
        let scanner = scanner(temp.path());

        assert!(matches!(
            scanner.list_children("missing").await,
            Err(ContentError::NotFound { .. })
        ));
        assert!(matches!(
            scanner.list_children("file.md").await,
            Err(ContentError::InvalidOperation { .. })
        ));
        assert!(matches!(
            scanner.list_descendants("../outside").await,
            Err(ContentError::PathTraversalDenied { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_subtree_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "a_locked/secret.md", "hidden");
        write(root, "b_open/inner.md", "inner");

        let locked = root.join("a_locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::read_dir(&locked).is_ok() {
            // Permission bits do not bind this user (root).
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let all = scanner(root).list_descendants("").await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let all = all.unwrap();
        let paths: Vec<&str> = all.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["a_locked", "b_open", "b_open/inner.md"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_cycle_is_not_followed() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "docs/a.md", "a");
        std::os::unix::fs::symlink(root.join("docs"), root.join("docs/loop")).unwrap();

        let scanner = scanner(root);
        let all = scanner.list_descendants("").await.unwrap();
        let paths: Vec<&str> = all.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["docs", "docs/loop", "docs/a.md"]);
    }
}
