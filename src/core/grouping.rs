//! core::grouping
//!
//! Partition change records into titled sections by label.
//!
//! # Algorithm
//!
//! Rules are evaluated in configuration order. Each rule claims every
//! still-unclaimed record whose labels intersect the rule's label set, in
//! input order, so a record lands in at most one section (first matching
//! rule wins). Rules that claim nothing produce no section. Records left
//! unclaimed after all rules form a trailing catch-all section when
//! `include_unlabeled` is set; otherwise they are dropped.
//!
//! With no rules at all, grouping is skipped: the result is a single
//! untitled group holding every record in input order.
//!
//! The input slice is never mutated. Claims are tracked with a parallel
//! marker vector, so the same records can be partitioned any number of
//! times with identical results.
//!
//! # Example
//!
//! ```
//! use changelog_ci::core::grouping::{partition, GroupRule, GroupingConfig};
//! use changelog_ci::core::types::ChangeRecord;
//!
//! let records = vec![
//!     ChangeRecord::pull_request(3, "Fix X", "u3", ["bug"]),
//!     ChangeRecord::pull_request(5, "Add Y", "u5", Vec::<String>::new()),
//! ];
//! let config = GroupingConfig {
//!     rules: vec![GroupRule::new("Fixes", ["bug"])],
//!     include_unlabeled: true,
//!     unlabeled_title: "Other Changes".to_string(),
//! };
//!
//! let groups = partition(&records, &config);
//! assert_eq!(groups.len(), 2);
//! assert_eq!(groups[0].title, Some("Fixes"));
//! assert_eq!(groups[1].title, Some("Other Changes"));
//! ```

use serde::{Deserialize, Serialize};

use super::types::ChangeRecord;

/// Default title of the catch-all section.
pub const DEFAULT_UNLABELED_TITLE: &str = "Other Changes";

/// A named section defined by the labels that select records into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRule {
    /// Section heading
    pub title: String,
    /// A record matches if it carries any of these labels
    pub labels: Vec<String>,
}

impl GroupRule {
    /// Create a rule from a title and its labels.
    pub fn new<L, S>(title: impl Into<String>, labels: L) -> Self
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `record` belongs in this rule's section.
    pub fn matches(&self, record: &ChangeRecord) -> bool {
        record.has_any_label(&self.labels)
    }
}

/// Grouping settings for one changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingConfig {
    /// Ordered rules; order decides both priority and section order
    pub rules: Vec<GroupRule>,
    /// Whether unmatched records get a trailing catch-all section
    pub include_unlabeled: bool,
    /// Heading of the catch-all section
    pub unlabeled_title: String,
}

impl GroupingConfig {
    /// Configuration that renders every record without sections.
    pub fn ungrouped() -> Self {
        Self {
            rules: Vec::new(),
            include_unlabeled: true,
            unlabeled_title: DEFAULT_UNLABELED_TITLE.to_string(),
        }
    }

    /// Whether any grouping rules are configured.
    pub fn is_grouped(&self) -> bool {
        !self.rules.is_empty()
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self::ungrouped()
    }
}

/// One section of a partitioned changelog.
///
/// `title` is `None` only for the single group produced when grouping is
/// disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<'a> {
    pub title: Option<&'a str>,
    pub records: Vec<&'a ChangeRecord>,
}

/// Partition `records` into sections according to `config`.
///
/// Input order is preserved inside every section. See the module docs for
/// the full rule set.
pub fn partition<'a>(records: &'a [ChangeRecord], config: &'a GroupingConfig) -> Vec<Group<'a>> {
    if !config.is_grouped() {
        return vec![Group {
            title: None,
            records: records.iter().collect(),
        }];
    }

    let mut claimed = vec![false; records.len()];
    let mut unclaimed = records.len();
    let mut groups = Vec::with_capacity(config.rules.len() + 1);

    for rule in &config.rules {
        if unclaimed == 0 {
            break;
        }

        let bucket: Vec<&ChangeRecord> = records
            .iter()
            .zip(claimed.iter_mut())
            .filter_map(|(record, taken)| {
                if !*taken && rule.matches(record) {
                    *taken = true;
                    Some(record)
                } else {
                    None
                }
            })
            .collect();

        unclaimed -= bucket.len();

        if !bucket.is_empty() {
            groups.push(Group {
                title: Some(rule.title.as_str()),
                records: bucket,
            });
        }
    }

    // Unmatched records are dropped entirely when the catch-all is disabled.
    if unclaimed > 0 && config.include_unlabeled {
        let leftovers = records
            .iter()
            .zip(&claimed)
            .filter(|(_, taken)| !**taken)
            .map(|(record, _)| record)
            .collect();

        groups.push(Group {
            title: Some(config.unlabeled_title.as_str()),
            records: leftovers,
        });
    }

    groups
}
