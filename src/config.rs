use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};

/// Environment variable consulted by [`StoreConfig::from_env`]
pub const CONTENT_ROOT_ENV: &str = "CONTENT_ROOT";

pub const DEFAULT_SIDECAR_NAME: &str = ".metadata";

/// Configuration for a [`ContentStore`](crate::ContentStore)
///
/// Built once at startup and handed to the store; nothing here is global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Directory every logical path is resolved against
    pub root: PathBuf,
    /// File name inside a directory that carries the directory's own metadata
    pub sidecar_name: String,
    /// Directory names skipped together with their whole subtree
    pub ignored_dirs: Vec<String>,
    /// Only surface files with one of `markdown_extensions`
    pub markdown_only: bool,
    /// Extensions (without the dot, compared case-insensitively) treated as markdown
    pub markdown_extensions: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./content"),
            sidecar_name: DEFAULT_SIDECAR_NAME.to_string(),
            ignored_dirs: ["node_modules", ".git", ".svn", ".hg", "__pycache__"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            markdown_only: true,
            markdown_extensions: vec!["md".to_string(), "markdown".to_string()],
        }
    }
}

impl StoreConfig {
    /// Create a configuration with defaults for everything but the root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Read the content root from `CONTENT_ROOT`, falling back to `./content`
    pub fn from_env() -> Self {
        match std::env::var_os(CONTENT_ROOT_ENV) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::default(),
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_sidecar_name(mut self, name: impl Into<String>) -> Self {
        self.sidecar_name = name.into();
        self
    }

    pub fn with_ignored_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_markdown_only(mut self, markdown_only: bool) -> Self {
        self.markdown_only = markdown_only;
        self
    }

    pub fn with_markdown_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markdown_extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Check the configuration for values the store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(ContentError::InvalidConfig {
                message: "content root must not be empty".to_string(),
            });
        }

        let sidecar = self.sidecar_name.trim();
        if sidecar.is_empty() || sidecar.contains('/') || sidecar.contains('\\') {
            return Err(ContentError::InvalidConfig {
                message: format!("invalid sidecar file name: {:?}", self.sidecar_name),
            });
        }

        if self.markdown_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ContentError::InvalidConfig {
                message: "at least one markdown extension is required".to_string(),
            });
        }

        Ok(())
    }

    /// Whether `file_name` ends in one of the configured markdown extensions
    pub fn is_markdown(&self, file_name: &str) -> bool {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .markdown_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }
}
