//! Error types for the search engine.
//!
//! Only precondition and session-control failures ever reach a caller.
//! File- and directory-level failures are still modelled here so workers can
//! log a precise cause before absorbing them.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while configuring or running a search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search pattern must not be empty")]
    EmptyPattern,
    #[error("No root folder selected")]
    MissingRoot,
    #[error("A search session is already running")]
    SessionActive,
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn worker_panicked(msg: impl Into<String>) -> Self {
        Self::WorkerPanicked(msg.into())
    }

    /// Keeps `path` as walked; no filesystem lookup happens here.
    pub fn encoding_error(path: impl Into<PathBuf>, source: std::string::FromUtf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    /// Maps an I/O failure on `path` to the most specific variant.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Returns true for failures the caller must fix before a session can start
    pub fn is_precondition(&self) -> bool {
        matches!(self, SearchError::EmptyPattern | SearchError::MissingRoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let path = Path::new("test.txt");
        let err = SearchError::file_not_found(path);
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::permission_denied(path);
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::invalid_pattern("[unclosed");
        assert!(matches!(err, SearchError::InvalidPattern(_)));

        let err = SearchError::worker_panicked("worker-3");
        assert!(matches!(err, SearchError::WorkerPanicked(_)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SearchError::EmptyPattern.to_string(),
            "Search pattern must not be empty"
        );
        assert_eq!(SearchError::MissingRoot.to_string(), "No root folder selected");
        assert_eq!(
            SearchError::SessionActive.to_string(),
            "A search session is already running"
        );

        let err = SearchError::config_error("Missing required field".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );

        let err = SearchError::file_not_found("test.txt");
        assert_eq!(err.to_string(), "File not found: test.txt");
    }

    #[test]
    fn test_from_io_picks_specific_variant() {
        let path = Path::new("gone.txt");
        let err = SearchError::from_io(path, io::Error::new(io::ErrorKind::NotFound, "x"));
        assert!(matches!(err, SearchError::FileNotFound(p) if p == path));

        let err = SearchError::from_io(path, io::Error::new(io::ErrorKind::PermissionDenied, "x"));
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::from_io(path, io::Error::new(io::ErrorKind::Other, "x"));
        assert!(matches!(err, SearchError::IoError(_)));
    }

    #[test]
    fn test_precondition_classification() {
        assert!(SearchError::EmptyPattern.is_precondition());
        assert!(SearchError::MissingRoot.is_precondition());
        assert!(!SearchError::SessionActive.is_precondition());
        assert!(!SearchError::file_not_found("a").is_precondition());
    }

    #[test]
    fn test_encoding_error_keeps_walked_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("bad.txt"), b"\xff").unwrap();

        let walked = dir.path().join("sub").join("..").join("bad.txt");
        let source = String::from_utf8(vec![0xff]).unwrap_err();
        let err = SearchError::encoding_error(&walked, source);
        assert!(matches!(err, SearchError::EncodingError { ref path, .. } if *path == walked));
    }
}
