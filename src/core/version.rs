//! core::version
//!
//! Release version resolution.
//!
//! # Sources
//!
//! - **Pull request events**: the title must match the configured
//!   "release PR" pattern, then the version is the first match of the
//!   version pattern in the title. An explicit `release_version` input
//!   takes precedence over the title.
//! - **Manual dispatch**: the `release_version` input is required.
//!
//! A title that does not look like a release PR is not an error: it means
//! this pull request is not a release, and the run is skipped.

use regex::Regex;
use thiserror::Error;

/// Default pattern a pull request title must match to be a release PR.
pub const DEFAULT_TITLE_REGEX: &str = r"^(?i:release)";

/// Default pattern used to extract a semver-like version from a title.
pub const DEFAULT_VERSION_REGEX: &str = concat!(
    r"v?(0|[1-9]\d*)\.(0|[1-9]\d*)\.?(0|[1-9]\d*)?(?:-((",
    r"?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[",
    r"1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([",
    r"0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?"
);

/// Errors from release version resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The pull request title is not a release title. Not fatal.
    #[error("the title of the pull request did not match, regex tried: \"{regex}\"")]
    NotAReleaseTitle {
        /// The title pattern that was tried
        regex: String,
    },

    /// The title looked like a release but carried no version.
    #[error("could not find a matching version number in the pull request title, regex tried: {regex}")]
    NotFoundInTitle {
        /// The version pattern that was tried
        regex: String,
    },

    /// Manual runs must name the version explicitly.
    #[error("`release_version` input must be provided to generate a changelog")]
    MissingInput,
}

impl VersionError {
    /// Whether this error means "nothing to do" rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, VersionError::NotAReleaseTitle { .. })
    }
}

/// Resolve the release version for a pull request event.
///
/// # Example
///
/// ```
/// use changelog_ci::core::version::{from_pull_request_title, DEFAULT_TITLE_REGEX, DEFAULT_VERSION_REGEX};
/// use regex::Regex;
///
/// let title = Regex::new(DEFAULT_TITLE_REGEX).unwrap();
/// let version = Regex::new(DEFAULT_VERSION_REGEX).unwrap();
///
/// let v = from_pull_request_title("Release v1.4.0 🎉", &title, &version, None).unwrap();
/// assert_eq!(v, "v1.4.0");
/// ```
pub fn from_pull_request_title(
    title: &str,
    title_regex: &Regex,
    version_regex: &Regex,
    explicit: Option<&str>,
) -> Result<String, VersionError> {
    if !title_regex.is_match(title) {
        return Err(VersionError::NotAReleaseTitle {
            regex: title_regex.as_str().to_string(),
        });
    }

    if let Some(version) = explicit.filter(|v| !v.is_empty()) {
        return Ok(version.to_string());
    }

    version_regex
        .find(title)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| VersionError::NotFoundInTitle {
            regex: version_regex.as_str().to_string(),
        })
}

/// Resolve the release version for a manually dispatched run.
pub fn from_input(explicit: Option<&str>) -> Result<String, VersionError> {
    explicit
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(VersionError::MissingInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> (Regex, Regex) {
        (
            Regex::new(DEFAULT_TITLE_REGEX).unwrap(),
            Regex::new(DEFAULT_VERSION_REGEX).unwrap(),
        )
    }

    #[test]
    fn default_patterns_compile() {
        let _ = defaults();
    }

    #[test]
    fn version_from_release_title() {
        let (title, version) = defaults();
        let cases = [
            ("Release 1.2.0", "1.2.0"),
            ("release v0.9.12", "v0.9.12"),
            ("RELEASE 2.0.0-beta.1 final", "2.0.0-beta.1"),
            ("Release 3.1", "3.1"),
            ("Release 1.0.0+build.5", "1.0.0+build.5"),
        ];

        for (pr_title, expected) in cases {
            assert_eq!(
                from_pull_request_title(pr_title, &title, &version, None).unwrap(),
                expected,
                "title: {}",
                pr_title
            );
        }
    }

    #[test]
    fn non_release_title_is_skip() {
        let (title, version) = defaults();
        let err = from_pull_request_title("Fix 1.2.0 regression", &title, &version, None)
            .unwrap_err();
        assert!(err.is_skip());
        assert_eq!(
            err,
            VersionError::NotAReleaseTitle {
                regex: DEFAULT_TITLE_REGEX.to_string()
            }
        );
    }

    #[test]
    fn release_title_without_version_is_fatal() {
        let (title, version) = defaults();
        let err = from_pull_request_title("Release next", &title, &version, None).unwrap_err();
        assert!(!err.is_skip());
        assert!(matches!(err, VersionError::NotFoundInTitle { .. }));
    }

    #[test]
    fn explicit_version_wins_over_title() {
        let (title, version) = defaults();
        let v = from_pull_request_title("Release 1.2.0", &title, &version, Some("2024.05")).unwrap();
        assert_eq!(v, "2024.05");
    }

    #[test]
    fn explicit_version_still_requires_release_title() {
        let (title, version) = defaults();
        let err = from_pull_request_title("Bump deps", &title, &version, Some("1.0.0")).unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn custom_patterns() {
        let title = Regex::new("^Ship").unwrap();
        let version = Regex::new(r"\d{4}\.\d{2}").unwrap();
        let v = from_pull_request_title("Ship 2024.06 train", &title, &version, None).unwrap();
        assert_eq!(v, "2024.06");
    }

    #[test]
    fn input_version() {
        assert_eq!(from_input(Some("1.0.0")).unwrap(), "1.0.0");
        assert_eq!(from_input(None), Err(VersionError::MissingInput));
        assert_eq!(from_input(Some("")), Err(VersionError::MissingInput));
    }
}
