use crate::{
    error::Result,
    metadata,
    path,
    scanner::ContentTreeScanner,
    types::RelatedDocument,
};

/// Score for a candidate in the same directory as the document
pub const SIBLING_SCORE: f64 = 2.0;
/// Score for a candidate deeper below the document's directory
pub const DESCENDANT_SCORE: f64 = 1.0;

/// Suggests documents near a given document in the content tree
///
/// Relevance is a step function of directory proximity: siblings score
/// [`SIBLING_SCORE`], anything nested below the parent directory scores
/// [`DESCENDANT_SCORE`].
#[derive(Debug, Clone)]
pub struct RelatedDocumentScorer {
    scanner: ContentTreeScanner,
}

impl RelatedDocumentScorer {
    pub fn new(scanner: ContentTreeScanner) -> Self {
        Self { scanner }
    }

    /// Up to `limit` related documents, best first
    ///
    /// Best effort: any failure is logged and yields an empty list.
    pub async fn find_related(&self, document: &str, limit: usize) -> Vec<RelatedDocument> {
        match self.try_find_related(document, limit).await {
            Ok(related) => related,
            Err(e) => {
                tracing::warn!("related documents for {:?} unavailable: {}", document, e);
                Vec::new()
            }
        }
    }

    async fn try_find_related(&self, document: &str, limit: usize) -> Result<Vec<RelatedDocument>> {
        let document = self.document_path(document)?;
        let parent = path::parent_of(&document);
        tracing::debug!("finding related documents for {:?} under {:?}", document, parent);

        let config = self.scanner.config();
        let mut related: Vec<RelatedDocument> = self
            .scanner
            .list_descendants(parent)
            .await?
            .into_iter()
            .filter(|item| item.is_file() && item.path != document && config.is_markdown(&item.name))
            .map(|item| {
                let score = if path::parent_of(&item.path) == parent {
                    SIBLING_SCORE
                } else {
                    DESCENDANT_SCORE
                };
                RelatedDocument {
                    title: metadata::humanize_file_name(&item.name),
                    path: item.path,
                    score,
                }
            })
            .collect();

        // Stable, so equal scores keep walk order.
        related.sort_by(|a, b| b.score.total_cmp(&a.score));
        related.truncate(limit);

        tracing::debug!("found {} related documents for {:?}", related.len(), document);
        Ok(related)
    }

    /// Canonical logical path of the document, `.md` added when it has no
    /// markdown extension
    fn document_path(&self, document: &str) -> Result<String> {
        let logical = self.scanner.resolver().clean(document)?;
        if logical.is_empty() || self.scanner.config().is_markdown(path::file_name_of(&logical)) {
            Ok(logical)
        } else {
            Ok(format!("{}.md", logical))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::path::PathResolver;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn scorer(root: &Path) -> RelatedDocumentScorer {
        let config = Arc::new(StoreConfig::new(root));
        let scanner = ContentTreeScanner::new(PathResolver::new(root).unwrap(), config);
        RelatedDocumentScorer::new(scanner)
    }

    fn write(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "# doc").unwrap();
    }

    #[tokio::test]
    async fn test_siblings_rank_above_nested() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/x.md");
        write(temp.path(), "docs/sub/z.md");
        write(temp.path(), "docs/y.md");
        write(temp.path(), "other/w.md");

        let related = scorer(temp.path()).find_related("docs/x.md", 5).await;
        assert_eq!(related.len(), 2);
        assert_eq!(related[0].path, "docs/y.md");
        assert_eq!(related[0].score, 2.0);
        assert_eq!(related[0].title, "Y");
        assert_eq!(related[1].path, "docs/sub/z.md");
        assert_eq!(related[1].score, 1.0);
    }

    #[tokio::test]
    async fn test_limit_and_clean_url() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "guide/intro.md");
        write(temp.path(), "guide/getting-started.md");
        write(temp.path(), "guide/advanced_usage.md");
        write(temp.path(), "guide/notes.txt");

        let related = scorer(temp.path()).find_related("/guide/intro", 1).await;
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].path, "guide/advanced_usage.md");
        assert_eq!(related[0].title, "Advanced Usage");

        let none = scorer(temp.path()).find_related("guide/intro.md", 0).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_failures_yield_empty_list() {
        let temp = TempDir::new().unwrap();
        let scorer = scorer(temp.path());

        assert!(scorer.find_related("../../etc/passwd", 5).await.is_empty());
        assert!(scorer.find_related("missing/dir/doc.md", 5).await.is_empty());
    }
}
