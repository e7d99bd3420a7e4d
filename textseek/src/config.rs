use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{SearchError, SearchResult};
use crate::search::SearchRequest;

/// Worker count used when nothing else is configured
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Rows shown per results page when nothing else is configured
pub const DEFAULT_PAGE_SIZE: usize = 28;

/// How a file's bytes are turned into lines of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// The first undecodable line ends the readable part of the file
    #[default]
    FailFast,
    /// Invalid UTF-8 sequences are replaced and scanning continues
    Lossy,
}

impl FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "failfast" | "fail-fast" | "strict" => Ok(EncodingMode::FailFast),
            "lossy" => Ok(EncodingMode::Lossy),
            other => Err(SearchError::config_error(format!(
                "unknown encoding mode '{}' (expected failfast or lossy)",
                other
            ))),
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingMode::FailFast => write!(f, "failfast"),
            EncodingMode::Lossy => write!(f, "lossy"),
        }
    }
}

/// Configuration for a search session.
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config`
/// 2. Local `.textseek.yaml` in the current directory
/// 3. Global `$CONFIG_DIR/textseek/config.yaml`
///
/// Example:
/// ```yaml
/// pattern: "hello"
/// root_path: "."
/// worker_count: 10
/// file_extensions: ["txt", "log"]
/// ignore_patterns: ["target/**", "**/*.tmp"]
/// skip_binary: true
/// encoding_mode: lossy
/// page_size: 28
/// log_level: "info"
/// ```
///
/// Command-line arguments take precedence over file values, see
/// [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Literal substring to look for
    #[serde(default)]
    pub pattern: String,

    /// Directory the walk starts from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Number of workers draining the directory queue
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Optional list of file extensions to include (e.g., ["rs", "toml"])
    /// If None, all file extensions are included
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Glob patterns, relative to the root, for paths to leave out.
    /// A matching directory is never descended into.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Skip files whose extension marks them as binary
    #[serde(default)]
    pub skip_binary: bool,

    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Number of results shown per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Whether to only show the counters instead of individual matches
    #[serde(default)]
    pub stats_only: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings given on the command line. `None` (or `false` for the flags)
/// leaves the file value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub pattern: Option<String>,
    pub root_path: Option<PathBuf>,
    pub worker_count: Option<NonZeroUsize>,
    pub file_extensions: Option<Vec<String>>,
    pub ignore_patterns: Option<Vec<String>>,
    pub skip_binary: bool,
    pub encoding_mode: Option<EncodingMode>,
    pub page_size: Option<usize>,
    pub stats_only: bool,
    pub log_level: Option<String>,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_WORKER_COUNT).unwrap_or(NonZeroUsize::MIN)
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            root_path: default_root_path(),
            worker_count: default_worker_count(),
            file_extensions: None,
            ignore_patterns: Vec::new(),
            skip_binary: false,
            encoding_mode: EncodingMode::default(),
            page_size: default_page_size(),
            stats_only: false,
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for `pattern` under `root_path` with defaults elsewhere
    pub fn new(root_path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("textseek/config.yaml")),
            Some(PathBuf::from(".textseek.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist; the default locations are optional.
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Applies command-line values over the file values.
    ///
    /// Only what was actually given on the command line replaces a file
    /// value, even when it equals the built-in default.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(pattern) = cli.pattern {
            self.pattern = pattern;
        }
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if let Some(worker_count) = cli.worker_count {
            self.worker_count = worker_count;
        }
        if cli.file_extensions.is_some() {
            self.file_extensions = cli.file_extensions;
        }
        if let Some(ignore_patterns) = cli.ignore_patterns {
            self.ignore_patterns = ignore_patterns;
        }
        if cli.skip_binary {
            self.skip_binary = true;
        }
        if let Some(encoding_mode) = cli.encoding_mode {
            self.encoding_mode = encoding_mode;
        }
        if let Some(page_size) = cli.page_size {
            self.page_size = page_size;
        }
        if cli.stats_only {
            self.stats_only = true;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Validates the root and pattern and produces the immutable request
    pub fn request(&self) -> SearchResult<SearchRequest> {
        SearchRequest::new(self.root_path.clone(), self.pattern.clone())
    }

    /// Renders the effective configuration as YAML
    pub fn to_yaml(&self) -> SearchResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        config_path
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = write_config(
            &dir,
            r#"
            pattern: "hello"
            root_path: "src"
            worker_count: 4
            file_extensions: ["rs", "toml"]
            ignore_patterns: ["target/**"]
            skip_binary: true
            encoding_mode: lossy
            page_size: 50
            stats_only: true
            log_level: "debug"
        "#,
        );

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.pattern, "hello");
        assert_eq!(config.root_path, PathBuf::from("src"));
        assert_eq!(config.worker_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(
            config.file_extensions,
            Some(vec!["rs".to_string(), "toml".to_string()])
        );
        assert_eq!(config.ignore_patterns, vec!["target/**".to_string()]);
        assert!(config.skip_binary);
        assert_eq!(config.encoding_mode, EncodingMode::Lossy);
        assert_eq!(config.page_size, 50);
        assert!(config.stats_only);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = write_config(&dir, "pattern: \"needle\"\n");

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.pattern, "needle");
        assert_eq!(config.root_path, PathBuf::from("."));
        assert_eq!(config.worker_count.get(), DEFAULT_WORKER_COUNT);
        assert_eq!(config.file_extensions, None);
        assert!(config.ignore_patterns.is_empty());
        assert!(!config.skip_binary);
        assert_eq!(config.encoding_mode, EncodingMode::FailFast);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = SearchConfig {
            pattern: "TODO".to_string(),
            root_path: PathBuf::from("src"),
            worker_count: NonZeroUsize::new(4).unwrap(),
            file_extensions: Some(vec!["rs".to_string()]),
            ignore_patterns: vec!["target/**".to_string()],
            log_level: "info".to_string(),
            ..SearchConfig::default()
        };

        let cli = CliOverrides {
            pattern: Some("FIXME".to_string()),
            root_path: Some(PathBuf::from("tests")),
            worker_count: NonZeroUsize::new(16),
            ignore_patterns: Some(vec!["*.tmp".to_string()]),
            skip_binary: true,
            encoding_mode: Some(EncodingMode::Lossy),
            ..CliOverrides::default()
        };

        let merged = file_config.merge_with_cli(cli);
        assert_eq!(merged.pattern, "FIXME");
        assert_eq!(merged.root_path, PathBuf::from("tests"));
        assert_eq!(merged.worker_count.get(), 16);
        assert_eq!(merged.file_extensions, Some(vec!["rs".to_string()]));
        assert_eq!(merged.ignore_patterns, vec!["*.tmp".to_string()]);
        assert!(merged.skip_binary);
        assert_eq!(merged.encoding_mode, EncodingMode::Lossy);
        // Not given on the CLI, so the file value survives
        assert_eq!(merged.log_level, "info");
    }

    #[test]
    fn test_cli_values_equal_to_defaults_still_override_file() {
        let file_config = SearchConfig {
            root_path: PathBuf::from("elsewhere"),
            worker_count: NonZeroUsize::new(4).unwrap(),
            encoding_mode: EncodingMode::Lossy,
            page_size: 50,
            log_level: "debug".to_string(),
            ..SearchConfig::default()
        };

        let cli = CliOverrides {
            root_path: Some(PathBuf::from(".")),
            worker_count: NonZeroUsize::new(DEFAULT_WORKER_COUNT),
            encoding_mode: Some(EncodingMode::FailFast),
            page_size: Some(DEFAULT_PAGE_SIZE),
            log_level: Some("warn".to_string()),
            ..CliOverrides::default()
        };

        let merged = file_config.merge_with_cli(cli);
        assert_eq!(merged.root_path, PathBuf::from("."));
        assert_eq!(merged.worker_count.get(), 10);
        assert_eq!(merged.encoding_mode, EncodingMode::FailFast);
        assert_eq!(merged.page_size, 28);
        assert_eq!(merged.log_level, "warn");
    }

    #[test]
    fn test_empty_overrides_keep_file_config() {
        let file_config = SearchConfig {
            pattern: "keep".to_string(),
            worker_count: NonZeroUsize::new(3).unwrap(),
            ..SearchConfig::default()
        };

        let merged = file_config.merge_with_cli(CliOverrides::default());
        assert_eq!(merged.pattern, "keep");
        assert_eq!(merged.worker_count.get(), 3);
        assert_eq!(merged.encoding_mode, EncodingMode::FailFast);
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = write_config(
            &dir,
            r#"
            root_path: []
            worker_count: "many"
        "#,
        );

        let result = SearchConfig::load_from(Some(&config_path));
        assert!(result.is_err(), "Expected error loading invalid config");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SearchConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_request_validates_preconditions() {
        let err = SearchConfig::new("/tmp", "").request().unwrap_err();
        assert!(matches!(err, SearchError::EmptyPattern));

        let err = SearchConfig::new("", "hello").request().unwrap_err();
        assert!(matches!(err, SearchError::MissingRoot));

        let request = SearchConfig::new("/tmp", "hello").request().unwrap();
        assert_eq!(request.pattern(), "hello");
        assert_eq!(request.root_path(), Path::new("/tmp"));
    }

    #[test]
    fn test_encoding_mode_parsing() {
        assert_eq!("lossy".parse::<EncodingMode>().unwrap(), EncodingMode::Lossy);
        assert_eq!(
            "FailFast".parse::<EncodingMode>().unwrap(),
            EncodingMode::FailFast
        );
        assert!("utf-16".parse::<EncodingMode>().is_err());
        assert_eq!(EncodingMode::Lossy.to_string(), "lossy");
    }

    #[test]
    fn test_to_yaml_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        let config = SearchConfig {
            worker_count: NonZeroUsize::new(3).unwrap(),
            ..SearchConfig::new("src", "hello")
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("pattern: hello"));

        let config_path = write_config(&dir, &yaml);
        let loaded = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(loaded.worker_count.get(), 3);
        assert_eq!(loaded.root_path, PathBuf::from("src"));
    }
}
