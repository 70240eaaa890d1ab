//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Action inputs (`INPUT_*` environment variables or CLI flags)
//! 3. The config file named by `config_file`
//!
//! # Leniency
//!
//! Loading never fails. An unreadable or malformed file, or an invalid
//! value for any key, produces a [`ConfigWarning`] and the default is used.
//!
//! # Example
//!
//! ```no_run
//! use changelog_ci::core::config::{Config, ConfigInputs};
//! use std::path::PathBuf;
//!
//! let inputs = ConfigInputs {
//!     config_file: Some(PathBuf::from("changelog-ci-config.yaml")),
//!     ..Default::default()
//! };
//! let result = Config::load(&inputs);
//! for warning in &result.warnings {
//!     eprintln!("{}", warning.message);
//! }
//! println!("Writing to {}", result.config.changelog_filename);
//! ```

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::grouping::{GroupingConfig, DEFAULT_UNLABELED_TITLE};
use crate::core::types::{ChangelogType, FileType};
use crate::core::version::{DEFAULT_TITLE_REGEX, DEFAULT_VERSION_REGEX};
use schema::{
    clean_bool, clean_changelog_filename, clean_changelog_type, clean_group_config, clean_regex,
    clean_string, ConfigFormat,
};

/// Errors from reading a config file.
///
/// These never abort a run; [`Config::load`] reports them as warnings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("unsupported config file '{0}', expected a .json, .yml, .yaml or .toml file")]
    UnsupportedFormat(PathBuf),

    #[error("config file '{0}' must contain a mapping at the top level")]
    NotAMapping(PathBuf),
}

/// How serious a [`ConfigWarning`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// How the warning should be surfaced.
    pub severity: Severity,
    /// The warning message.
    pub message: String,
    /// The config file that triggered the warning, if any.
    pub path: Option<PathBuf>,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>, path: Option<&Path>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            path: path.map(Path::to_path_buf),
        }
    }

    fn error(message: impl Into<String>, path: Option<&Path>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            path: path.map(Path::to_path_buf),
        }
    }
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Raw action inputs, before cleaning.
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
    pub changelog_filename: Option<String>,
    pub committer_username: Option<String>,
    pub committer_email: Option<String>,
    pub release_version: Option<String>,
    pub github_token: Option<String>,
    pub config_file: Option<PathBuf>,
    pub api_base: Option<String>,
}

/// Fully resolved configuration for one run.
#[derive(Clone)]
pub struct Config {
    pub changelog_type: ChangelogType,
    pub header_prefix: String,
    pub commit_changelog: bool,
    pub comment_changelog: bool,
    pub pull_request_title_regex: Regex,
    pub version_regex: Regex,
    pub grouping: GroupingConfig,
    pub changelog_filename: String,
    pub git_committer_username: String,
    pub git_committer_email: String,
    pub release_version: Option<String>,
    pub github_token: Option<String>,
    /// REST API root, without a trailing slash
    pub api_base: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("changelog_type", &self.changelog_type)
            .field("header_prefix", &self.header_prefix)
            .field("commit_changelog", &self.commit_changelog)
            .field("comment_changelog", &self.comment_changelog)
            .field("pull_request_title_regex", &self.pull_request_title_regex.as_str())
            .field("version_regex", &self.version_regex.as_str())
            .field("grouping", &self.grouping)
            .field("changelog_filename", &self.changelog_filename)
            .field("git_committer_username", &self.git_committer_username)
            .field("git_committer_email", &self.git_committer_email)
            .field("release_version", &self.release_version)
            .field("github_token", &self.github_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            changelog_type: ChangelogType::default(),
            header_prefix: schema::DEFAULT_HEADER_PREFIX.to_string(),
            commit_changelog: true,
            comment_changelog: false,
            pull_request_title_regex: default_regex(DEFAULT_TITLE_REGEX),
            version_regex: default_regex(DEFAULT_VERSION_REGEX),
            grouping: GroupingConfig {
                rules: Vec::new(),
                include_unlabeled: true,
                unlabeled_title: DEFAULT_UNLABELED_TITLE.to_string(),
            },
            changelog_filename: schema::DEFAULT_CHANGELOG_FILENAME.to_string(),
            git_committer_username: schema::DEFAULT_COMMITTER_USERNAME.to_string(),
            git_committer_email: schema::DEFAULT_COMMITTER_EMAIL.to_string(),
            release_version: None,
            github_token: None,
            api_base: schema::DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Look up `key`, warning when it is explicitly null.
fn present<'v>(
    values: &'v Map<String, Value>,
    key: &str,
    source: Option<&Path>,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<&'v Value> {
    let value = values.get(key)?;
    if value.is_null() {
        warnings.push(ConfigWarning::warning(
            format!("`{}` was not provided, falling back to default value.", key),
            source,
        ));
        return None;
    }
    Some(value)
}

// The built-in patterns are covered by tests in core::version.
fn default_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| unreachable!("built-in pattern {} is valid", pattern))
}

impl Config {
    /// Load configuration from inputs and the optional config file.
    pub fn load(inputs: &ConfigInputs) -> ConfigLoadResult {
        let mut warnings = Vec::new();
        let mut values = Map::new();

        let input_pairs = [
            ("changelog_filename", &inputs.changelog_filename),
            ("git_committer_username", &inputs.committer_username),
            ("git_committer_email", &inputs.committer_email),
            ("release_version", &inputs.release_version),
            ("github_token", &inputs.github_token),
        ];
        for (key, value) in input_pairs {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                values.insert(key.to_string(), Value::String(v.to_string()));
            }
        }

        let file = inputs.config_file.as_deref().filter(|p| !p.as_os_str().is_empty());
        match file {
            Some(path) => match Self::read_config_file(path) {
                Ok(file_values) => values.extend(file_values),
                Err(e) => warnings.push(ConfigWarning::error(
                    format!("{}, falling back to default configuration", e),
                    Some(path),
                )),
            },
            None => warnings.push(ConfigWarning::warning(
                "No configuration file found, falling back to default configuration",
                None,
            )),
        }

        let mut config = Self::from_values(&values, file, &mut warnings);
        if let Some(api) = inputs.api_base.as_deref().filter(|a| !a.is_empty()) {
            config.api_base = api.trim_end_matches('/').to_string();
        }

        ConfigLoadResult { config, warnings }
    }

    /// Read a config file into its top-level mapping.
    pub fn read_config_file(path: &Path) -> Result<Map<String, Value>, ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        match format.parse(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            // An empty YAML document parses as null.
            Ok(Value::Null) => Ok(Map::new()),
            Ok(_) => Err(ConfigError::NotAMapping(path.to_path_buf())),
            Err(message) => Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            }),
        }
    }

    /// Build a configuration from a mapping of raw values.
    ///
    /// Unknown keys are ignored. Absent keys keep their defaults silently;
    /// present but invalid keys keep their defaults with a warning.
    pub fn from_values(
        values: &Map<String, Value>,
        source: Option<&Path>,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Self {
        let mut config = Config::default();

        macro_rules! clean {
            ($key:literal, $cleaner:expr, $field:expr) => {
                if let Some(value) = present(values, $key, source, warnings) {
                    match $cleaner(value) {
                        Ok(cleaned) => $field = cleaned,
                        Err(message) => warnings.push(ConfigWarning::warning(message, source)),
                    }
                }
            };
        }

        clean!("changelog_type", clean_changelog_type, config.changelog_type);
        clean!("header_prefix", |v| clean_string("header_prefix", v), config.header_prefix);
        clean!("commit_changelog", |v| clean_bool("commit_changelog", v), config.commit_changelog);
        clean!("comment_changelog", |v| clean_bool("comment_changelog", v), config.comment_changelog);
        clean!(
            "pull_request_title_regex",
            |v| clean_regex("pull_request_title_regex", v),
            config.pull_request_title_regex
        );
        clean!("version_regex", |v| clean_regex("version_regex", v), config.version_regex);
        clean!(
            "include_unlabeled_changes",
            |v| clean_bool("include_unlabeled_changes", v),
            config.grouping.include_unlabeled
        );
        clean!(
            "unlabeled_group_title",
            |v| clean_string("unlabeled_group_title", v),
            config.grouping.unlabeled_title
        );
        clean!("changelog_filename", clean_changelog_filename, config.changelog_filename);
        clean!(
            "git_committer_username",
            |v| clean_string("git_committer_username", v),
            config.git_committer_username
        );
        clean!(
            "git_committer_email",
            |v| clean_string("git_committer_email", v),
            config.git_committer_email
        );
        clean!(
            "release_version",
            |v| clean_string("release_version", v).map(Some),
            config.release_version
        );
        clean!(
            "github_token",
            |v| clean_string("github_token", v).map(Some),
            config.github_token
        );

        if let Some(value) = present(values, "group_config", source, warnings) {
            match clean_group_config(value) {
                Ok((rules, dropped)) => {
                    config.grouping.rules = rules;
                    warnings.extend(dropped.into_iter().map(|m| ConfigWarning::error(m, source)));
                }
                Err(message) => warnings.push(ConfigWarning::error(message, source)),
            }
        }

        config
    }

    /// File type derived from the changelog filename.
    pub fn file_type(&self) -> FileType {
        FileType::from_filename(&self.changelog_filename).unwrap_or_default()
    }

    /// `"{username} <{email}>"`, the git author of changelog commits.
    pub fn git_commit_author(&self) -> String {
        format!("{} <{}>", self.git_committer_username, self.git_committer_email)
    }
}
