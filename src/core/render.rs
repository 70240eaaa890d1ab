//! core::render
//!
//! Render partitioned change records as a changelog document.
//!
//! # Formats
//!
//! Two dialects are supported, selected by [`FileType`]:
//!
//! | Element   | Markdown                 | reStructuredText                       |
//! |-----------|--------------------------|----------------------------------------|
//! | Document  | `# {header}`             | `{header}` underlined with `=`         |
//! | Section   | `#### {title}`           | `{title}` underlined with `-`          |
//! | Line      | `* [{label}]({url}): {text}` | ``* `{label} <{url}>`__: {text}``  |
//!
//! reStructuredText underlines are exactly as long as the text above them,
//! counted in characters.
//!
//! # Purity
//!
//! [`render`] performs no I/O and reads no external state, so identical
//! inputs always produce byte-identical output. Callers may cache results
//! per format.

use super::grouping::Group;
use super::types::{ChangeRecord, FileType};

/// Render a full changelog document.
///
/// Titled groups get a section heading; the untitled group produced when
/// grouping is disabled renders its lines directly under the document
/// header.
///
/// # Example
///
/// ```
/// use changelog_ci::core::grouping::{partition, GroupingConfig};
/// use changelog_ci::core::render::render;
/// use changelog_ci::core::types::{ChangeRecord, FileType};
///
/// let records = vec![
///     ChangeRecord::pull_request(3, "Fix X", "u3", Vec::<String>::new()),
///     ChangeRecord::pull_request(5, "Add Y", "u5", Vec::<String>::new()),
/// ];
/// let config = GroupingConfig::ungrouped();
/// let groups = partition(&records, &config);
///
/// assert_eq!(
///     render("Version: 1.2.0", &groups, FileType::Markdown),
///     "# Version: 1.2.0\n\n* [#3](u3): Fix X\n* [#5](u5): Add Y\n"
/// );
/// ```
pub fn render(header: &str, groups: &[Group<'_>], file_type: FileType) -> String {
    let mut out = document_header(header, file_type);

    for group in groups {
        if let Some(title) = group.title {
            out.push_str(&section_heading(title, file_type));
        }
        for record in &group.records {
            out.push_str(&record_line(record, file_type));
        }
    }

    out
}

/// The document title block, including its trailing blank line.
pub fn document_header(header: &str, file_type: FileType) -> String {
    match file_type {
        FileType::Markdown => format!("# {}\n\n", header),
        FileType::RestructuredText => format!("{}\n{}\n\n", header, underline(header, '=')),
    }
}

/// A section heading, surrounded by blank lines.
pub fn section_heading(title: &str, file_type: FileType) -> String {
    match file_type {
        FileType::Markdown => format!("\n#### {}\n\n", title),
        FileType::RestructuredText => format!("\n{}\n{}\n\n", title, underline(title, '-')),
    }
}

/// One bullet line for a change record.
pub fn record_line(record: &ChangeRecord, file_type: FileType) -> String {
    let label = record.id.display_label();
    match file_type {
        FileType::Markdown => format!("* [{}]({}): {}\n", label, record.url, record.text),
        FileType::RestructuredText => {
            format!("* `{} <{}>`__: {}\n", label, record.url, record.text)
        }
    }
}

fn underline(text: &str, marker: char) -> String {
    std::iter::repeat(marker).take(text.chars().count()).collect()
}
