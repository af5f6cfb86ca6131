//! Configuration loading and name-based ignore rules.
//!
//! Configuration is read from TOML. Every key is optional; missing keys fall back to
//! the defaults shown below.
//!
//! ```toml
//! [catalog]
//! exclusions_file = "folder_exclusions.txt"
//! csv_delimiter = "|"
//! tabular_format = "csv"   # or "xlsx"
//! progress_interval = 1000
//! preview_limit = 5
//!
//! [ignore]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["**/.git/**"]
//! extensions = ["tmp"]
//! regex = []
//!
//! [extractor]
//! program = "winrar"
//! args = ["x", "-o+"]
//! ```

use crate::report::TabularFormat;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading and compilation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// The CSV delimiter is not a single ASCII character.
    #[error("Invalid CSV delimiter '{0}': expected a single ASCII character")]
    InvalidDelimiter(char),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,

    /// Name-based rules for files the scanner should skip.
    #[serde(default)]
    pub ignore: IgnoreRules,

    #[serde(default)]
    pub extractor: ExtractorSettings,
}

/// Scan and report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Persisted exclusion list, one absolute path per line.
    #[serde(default = "default_exclusions_file")]
    pub exclusions_file: PathBuf,

    /// Field delimiter of the tabular export.
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,

    /// Format of the tabular export, unless overridden on the command line.
    #[serde(default)]
    pub tabular_format: TabularFormat,

    /// Number of files between progress log lines while scanning.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Operations shown per category by the organizer when not verbose.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

fn default_exclusions_file() -> PathBuf {
    PathBuf::from("folder_exclusions.txt")
}

fn default_csv_delimiter() -> char {
    '|'
}

fn default_progress_interval() -> u64 {
    1000
}

fn default_preview_limit() -> usize {
    5
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            exclusions_file: default_exclusions_file(),
            csv_delimiter: default_csv_delimiter(),
            tabular_format: TabularFormat::default(),
            progress_interval: default_progress_interval(),
            preview_limit: default_preview_limit(),
        }
    }
}

/// Rules for skipping files by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IgnoreRules {
    /// Exact filenames to skip (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the full path (e.g., "**/.git/**").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to skip, without the dot (e.g., "tmp", "part").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// External unarchiver used by the `extract` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorSettings {
    #[serde(default = "default_extractor_program")]
    pub program: String,

    /// Arguments placed before the archive path and the target directory.
    #[serde(default = "default_extractor_args")]
    pub args: Vec<String>,
}

fn default_extractor_program() -> String {
    "winrar".to_string()
}

fn default_extractor_args() -> Vec<String> {
    vec!["x".to_string(), "-o+".to_string()]
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            program: default_extractor_program(),
            args: default_extractor_args(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.filecatrc.toml` in the current directory
    /// 3. Look for `~/.config/filecat/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".filecatrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("filecat")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Returns the CSV delimiter as a byte.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDelimiter` unless the delimiter is a single ASCII character.
    pub fn delimiter(&self) -> Result<u8, ConfigError> {
        let c = self.catalog.csv_delimiter;
        if c.is_ascii() {
            Ok(c as u8)
        } else {
            Err(ConfigError::InvalidDelimiter(c))
        }
    }

    /// Compile the ignore rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_ignore_rules(&self) -> Result<CompiledIgnoreRules, ConfigError> {
        CompiledIgnoreRules::new(&self.ignore)
    }
}

/// Pre-compiled ignore rules.
#[derive(Debug, Clone, Default)]
pub struct CompiledIgnoreRules {
    filenames: HashSet<String>,
    extensions: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl CompiledIgnoreRules {
    fn new(rules: &IgnoreRules) -> Result<Self, ConfigError> {
        let patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = rules
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            filenames: rules.filenames.iter().cloned().collect(),
            extensions: rules
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            patterns,
            regexes,
        })
    }

    /// Returns true if no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
            && self.extensions.is_empty()
            && self.patterns.is_empty()
            && self.regexes.is_empty()
    }

    /// Check if a file should be skipped.
    ///
    /// Checks exact file name, then extension, then glob patterns against the
    /// full path, then regexes against the file name.
    pub fn is_ignored(&self, file_path: &Path) -> bool {
        if self.is_empty() {
            return false;
        }

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.filenames.contains(file_name.as_ref()) {
            return true;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.extensions.contains(&ext_lower) {
                return true;
            }
        }

        if self
            .patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return true;
        }

        self.regexes.iter().any(|regex| regex.is_match(&file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(ignore: IgnoreRules) -> CompiledIgnoreRules {
        CatalogConfig {
            ignore,
            ..Default::default()
        }
        .compile_ignore_rules()
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(
            config.catalog.exclusions_file,
            PathBuf::from("folder_exclusions.txt")
        );
        assert_eq!(config.delimiter().unwrap(), b'|');
        assert_eq!(config.catalog.progress_interval, 1000);
        assert_eq!(config.catalog.preview_limit, 5);
        assert_eq!(config.catalog.tabular_format, TabularFormat::Csv);
        assert_eq!(config.extractor.program, "winrar");
        assert_eq!(config.extractor.args, vec!["x", "-o+"]);
    }

    #[test]
    fn test_default_ignore_rules_skip_nothing() {
        let compiled = CatalogConfig::default().compile_ignore_rules().unwrap();
        assert!(compiled.is_empty());
        assert!(!compiled.is_ignored(Path::new(".DS_Store")));
        assert!(!compiled.is_ignored(Path::new("/a/b/photo.jpg")));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CatalogConfig::from_toml(
            r#"
            [catalog]
            csv_delimiter = ";"
            "#,
        )
        .unwrap();
        assert_eq!(config.delimiter().unwrap(), b';');
        assert_eq!(config.catalog.progress_interval, 1000);
        assert_eq!(config.extractor.program, "winrar");
    }

    #[test]
    fn test_full_toml() {
        let config = CatalogConfig::from_toml(
            r#"
            [catalog]
            exclusions_file = "/etc/filecat/exclusions.txt"
            progress_interval = 50
            preview_limit = 2
            tabular_format = "xlsx"

            [ignore]
            filenames = ["Thumbs.db"]
            extensions = ["part"]

            [extractor]
            program = "7z"
            args = ["x", "-y"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.catalog.exclusions_file,
            PathBuf::from("/etc/filecat/exclusions.txt")
        );
        assert_eq!(config.catalog.progress_interval, 50);
        assert_eq!(config.catalog.preview_limit, 2);
        assert_eq!(config.catalog.tabular_format, TabularFormat::Xlsx);
        assert_eq!(config.ignore.filenames, vec!["Thumbs.db"]);
        assert_eq!(config.extractor.program, "7z");
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let result = CatalogConfig::from_toml("[catalog\nfoo = ");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let result = CatalogConfig::load(Some(Path::new("/non/existent/filecat.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let mut config = CatalogConfig::default();
        config.catalog.csv_delimiter = '¦';
        assert!(matches!(
            config.delimiter(),
            Err(ConfigError::InvalidDelimiter('¦'))
        ));
    }

    #[test]
    fn test_ignore_exact_filename() {
        let compiled = rules(IgnoreRules {
            filenames: vec!["Thumbs.db".to_string(), ".DS_Store".to_string()],
            ..Default::default()
        });

        assert!(compiled.is_ignored(Path::new("/photos/Thumbs.db")));
        assert!(compiled.is_ignored(Path::new(".DS_Store")));
        assert!(!compiled.is_ignored(Path::new("image.jpg")));
    }

    #[test]
    fn test_ignore_extensions_case_insensitive() {
        let compiled = rules(IgnoreRules {
            extensions: vec!["part".to_string(), ".tmp".to_string()],
            ..Default::default()
        });

        assert!(compiled.is_ignored(Path::new("movie.mkv.part")));
        assert!(compiled.is_ignored(Path::new("file.TMP")));
        assert!(!compiled.is_ignored(Path::new("file.txt")));
    }

    #[test]
    fn test_ignore_glob_respects_directory_boundaries() {
        let compiled = rules(IgnoreRules {
            patterns: vec!["**/cache/**".to_string()],
            ..Default::default()
        });

        assert!(compiled.is_ignored(Path::new("cache/data.bin")));
        assert!(compiled.is_ignored(Path::new("app/cache/data.bin")));
        assert!(!compiled.is_ignored(Path::new("my_cache/data.bin")));
    }

    #[test]
    fn test_ignore_regex_on_file_name() {
        let compiled = rules(IgnoreRules {
            regex: vec![r"^~\$".to_string()],
            ..Default::default()
        });

        assert!(compiled.is_ignored(Path::new("/docs/~$report.docx")));
        assert!(!compiled.is_ignored(Path::new("/docs/report.docx")));
    }

    #[test]
    fn test_invalid_regex_returns_error() {
        let config = CatalogConfig {
            ignore: IgnoreRules {
                regex: vec!["[invalid(".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.compile_ignore_rules(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_glob_pattern_returns_error() {
        let config = CatalogConfig {
            ignore: IgnoreRules {
                patterns: vec!["[invalid".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.compile_ignore_rules(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }
}
