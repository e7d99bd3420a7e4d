//! Optional path filtering applied while the tree is walked.
//!
//! With a default [`SearchConfig`] no filter is active and every regular file
//! under the root is scanned. Ignore globs are matched against the path
//! relative to the search root, using `/` as the separator on every platform.
use glob::Pattern;
use std::path::{Path, PathBuf};

use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};

/// Common binary file extensions
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "obj", "o", "class", "jar", "war", "ear", "png", "jpg",
    "jpeg", "gif", "bmp", "ico", "pdf", "doc", "docx", "xls", "xlsx", "zip", "tar", "gz", "7z",
    "rar",
];

/// Checks if a file should be included in the search based on its extension
pub fn has_valid_extension(path: &Path, extensions: &Option<Vec<String>>) -> bool {
    match extensions {
        None => true,
        Some(exts) => {
            if let Some(ext) = path.extension() {
                if let Some(ext_str) = ext.to_str() {
                    return exts.iter().any(|e| e.eq_ignore_ascii_case(ext_str));
                }
            }
            false
        }
    }
}

/// Checks if a file is likely to be binary
pub fn is_likely_binary(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        if let Some(ext_str) = ext.to_str() {
            return BINARY_EXTENSIONS
                .iter()
                .any(|&bin_ext| bin_ext.eq_ignore_ascii_case(ext_str));
        }
    }
    false
}

/// Compiled path filter shared by all workers of a session
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    extensions: Option<Vec<String>>,
    ignore: Vec<Pattern>,
    skip_binary: bool,
}

impl PathFilter {
    /// A filter that lets every file and directory through
    pub fn allow_all(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: None,
            ignore: Vec::new(),
            skip_binary: false,
        }
    }

    /// Compiles the filter options of `config`, rejecting malformed globs
    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        let ignore = config
            .ignore_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| SearchError::invalid_pattern(format!("{}: {}", p, e)))
            })
            .collect::<SearchResult<Vec<_>>>()?;

        let extensions = config.file_extensions.as_ref().map(|exts| {
            exts.iter()
                .map(|e| e.trim().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect()
        });

        Ok(Self {
            root: config.root_path.clone(),
            extensions,
            ignore,
            skip_binary: config.skip_binary,
        })
    }

    /// Re-anchors relative ignore globs at `root`
    pub fn rooted_at(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// True when no option narrows the walk
    pub fn is_pass_through(&self) -> bool {
        self.extensions.is_none() && self.ignore.is_empty() && !self.skip_binary
    }

    fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.ignore.iter().any(|p| p.matches(&normalized))
    }

    /// Whether a discovered sub-directory should be queued
    pub fn should_descend(&self, dir: &Path) -> bool {
        !self.is_ignored(dir)
    }

    /// Whether a discovered file should be scanned
    pub fn should_scan(&self, file: &Path) -> bool {
        if self.skip_binary && is_likely_binary(file) {
            return false;
        }
        has_valid_extension(file, &self.extensions) && !self.is_ignored(file)
    }
}
