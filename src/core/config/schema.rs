//! core::config::schema
//!
//! Configuration keys, defaults, and per-key cleaning.
//!
//! # File Format
//!
//! ```yaml
//! changelog_type: pull_request
//! header_prefix: "Version:"
//! commit_changelog: true
//! comment_changelog: false
//! pull_request_title_regex: "^(?i:release)"
//! include_unlabeled_changes: true
//! unlabeled_group_title: Other Changes
//! group_config:
//!   - title: Bug Fixes
//!     labels: [bug, bugfix]
//!   - title: Documentation
//!     labels: [docs]
//! ```
//!
//! The same keys are accepted from JSON and TOML documents.
//!
//! # Validation
//!
//! Every key is cleaned independently. A cleaner returns `Ok` with the
//! typed value or `Err` with a message; the loader turns the message into a
//! warning and keeps the default.

use std::path::Path;

use regex::Regex;
use serde_json::Value;

use crate::core::grouping::GroupRule;
use crate::core::types::{ChangelogType, FileType};

pub const DEFAULT_HEADER_PREFIX: &str = "Version:";
pub const DEFAULT_CHANGELOG_FILENAME: &str = "CHANGELOG.md";
pub const DEFAULT_COMMITTER_USERNAME: &str = "github-actions[bot]";
pub const DEFAULT_COMMITTER_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Config file syntax, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Detect the format of `path` from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(ConfigFormat::Json),
            Some("yml") | Some("yaml") => Some(ConfigFormat::Yaml),
            Some("toml") => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    /// Parse `contents` into a generic document.
    pub fn parse(&self, contents: &str) -> Result<Value, String> {
        match self {
            ConfigFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
        }
    }
}

/// A non-empty string.
pub fn clean_string(key: &str, value: &Value) -> Result<String, String> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(format!(
            "`{}` was not provided or not valid, falling back to default value.",
            key
        )),
    }
}

/// A boolean, also accepting the integers `0` and `1`.
pub fn clean_bool(key: &str, value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        _ => Err(format!(
            "`{}` was not provided or not valid, falling back to default value.",
            key
        )),
    }
}

/// A non-empty, compilable regular expression.
pub fn clean_regex(key: &str, value: &Value) -> Result<Regex, String> {
    let pattern = value
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("`{}` was not provided, falling back to default value.", key))?;

    Regex::new(pattern)
        .map_err(|e| format!("`{}` is not valid ({}), falling back to default value.", key, e))
}

pub fn clean_changelog_type(value: &Value) -> Result<ChangelogType, String> {
    value
        .as_str()
        .ok_or_else(|| "`changelog_type` must be a string".to_string())
        .and_then(|s| ChangelogType::parse(s).map_err(|e| e.to_string()))
        .map_err(|e| format!("{}, falling back to default.", e))
}

/// A changelog filename ending in `.md` or `.rst`.
pub fn clean_changelog_filename(value: &Value) -> Result<String, String> {
    match value.as_str() {
        Some(name) if FileType::from_filename(name).is_some() => Ok(name.to_string()),
        _ => Err(
            "Changelog filename was not provided or not valid, it must end with \
             \".md\" or \".rst\". Falling back to default value."
                .to_string(),
        ),
    }
}

/// The `group_config` list.
///
/// Returns the rules that cleaned successfully together with one message per
/// dropped item. A value that is not a list is an error for the whole key.
pub fn clean_group_config(value: &Value) -> Result<(Vec<GroupRule>, Vec<String>), String> {
    let items = value
        .as_array()
        .ok_or_else(|| "`group_config` is not valid, it must be an array.".to_string())?;

    let mut rules = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();

    for item in items {
        match clean_group_rule(item) {
            Ok(rule) => rules.push(rule),
            Err(message) => dropped.push(message),
        }
    }

    Ok((rules, dropped))
}

fn clean_group_rule(item: &Value) -> Result<GroupRule, String> {
    let map = item
        .as_object()
        .ok_or("`group_config` items must be mappings with `title` and `labels`")?;

    let title = match map.get("title").and_then(Value::as_str) {
        Some(t) if !t.is_empty() => t,
        _ => {
            return Err(format!(
                "`group_config` item must contain a string title, but got `{}`",
                display(map.get("title"))
            ))
        }
    };

    let labels = match map.get("labels").and_then(Value::as_array) {
        Some(l) if !l.is_empty() => l,
        _ => {
            return Err(format!(
                "`group_config` item must contain an array of labels, but got `{}`",
                display(map.get("labels"))
            ))
        }
    };

    let labels: Option<Vec<&str>> = labels.iter().map(Value::as_str).collect();
    let labels = labels.ok_or_else(|| {
        format!(
            "`group_config` labels for `{}` must all be strings",
            title
        )
    })?;

    Ok(GroupRule::new(title, labels))
}

fn display(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_else(|| "null".to_string())
}
