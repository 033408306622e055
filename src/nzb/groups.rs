//! Newsgroup extraction from Xref headers

use regex::Regex;
use std::sync::LazyLock;

/// `group:article-number` pairs; the capture is the group name
#[allow(clippy::expect_used)]
static XREF_GROUP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+):\S+").expect("Invalid xref group pattern"));

/// Newsgroups named in an Xref header, in header order
///
/// Tokens without a `:number` suffix (such as the leading server name) are
/// skipped. Duplicates are kept as they appear.
///
/// # Examples
///
/// ```
/// use nzb_writer::nzb::extract_groups;
///
/// let groups = extract_groups("news.example.com alt.binaries.test:12345 alt.binaries.other:67890");
/// assert_eq!(groups, vec!["alt.binaries.test", "alt.binaries.other"]);
/// ```
pub fn extract_groups(xref: &str) -> Vec<&str> {
    XREF_GROUP_PATTERN
        .captures_iter(xref)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}
