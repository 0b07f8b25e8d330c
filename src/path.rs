use std::path::{Component, Path, PathBuf};

use crate::error::{ContentError, Result};

/// Maps logical content paths onto the filesystem below a single root
///
/// Logical paths are root-relative, `/`-separated and carry no leading or
/// trailing slash. The root itself is the empty string.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`, made absolute and lexically normalized
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let absolute = std::path::absolute(root).map_err(|e| ContentError::io(root, e))?;
        Ok(Self {
            root: lexical_normalize(&absolute),
        })
    }

    /// The absolute content root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical logical form of a user supplied path
    ///
    /// Backslashes count as separators and repeated separators collapse.
    /// Whitespace is trimmed from the whole path only, so segment names keep
    /// their own spaces. `""`, `"/"` and blank input all map to the root.
    pub fn normalize(path: &str) -> String {
        path.replace('\\', "/")
            .trim_matches(|c: char| c == '/' || c.is_whitespace())
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Normalize `path` and resolve `.`/`..` segments without touching the disk
    ///
    /// Fails with `PathTraversalDenied` if the path climbs above the root.
    pub fn clean(&self, path: &str) -> Result<String> {
        let normalized = Self::normalize(path);
        let mut segments: Vec<&str> = Vec::new();

        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            match segment {
                "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(ContentError::PathTraversalDenied {
                            path: path.to_string(),
                        });
                    }
                }
                other => segments.push(other),
            }
        }

        Ok(segments.join("/"))
    }

    /// Resolve a logical path to an absolute path inside the root
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let logical = self.clean(path)?;
        let resolved = if logical.is_empty() {
            self.root.clone()
        } else {
            lexical_normalize(&self.root.join(&logical))
        };

        if !resolved.starts_with(&self.root) {
            return Err(ContentError::PathTraversalDenied {
                path: path.to_string(),
            });
        }

        Ok(resolved)
    }

    /// Logical path of an absolute path, `None` if it is outside the root
    pub fn to_logical(&self, absolute: &Path) -> Option<String> {
        let relative = lexical_normalize(absolute)
            .strip_prefix(&self.root)
            .ok()?
            .to_path_buf();

        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

/// Parent of a logical path; the parent of a top-level entry is the root
pub fn parent_of(logical: &str) -> &str {
    logical.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Final segment of a logical path
pub fn file_name_of(logical: &str) -> &str {
    logical
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(logical)
}

/// Join a child name onto a logical directory path
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
