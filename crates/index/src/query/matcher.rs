//! Name and extension predicates.

use crate::record::FileRecord;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Case-insensitive file name predicate.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    /// Empty pattern: every name matches.
    Any,
    /// Lowercased needle, matched anywhere in the name.
    Substring(String),
    /// Anchored wildcard pattern (`*` any run, `?` one character).
    Wildcard(Regex),
}

impl NameMatcher {
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Self::Any;
        }
        if pattern.contains(['*', '?'])
            && let Some(regex) = wildcard(pattern)
        {
            return Self::Wildcard(regex);
        }
        Self::Substring(pattern.to_lowercase())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Substring(needle) => name.to_lowercase().contains(needle.as_str()),
            Self::Wildcard(regex) => regex.is_match(name),
        }
    }
}

/// Compile a wildcard pattern into an anchored, case-insensitive regex.
///
/// Falls back to `None` (substring matching) if the result does not compile.
fn wildcard(pattern: &str) -> Option<Regex> {
    let translated = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    RegexBuilder::new(&format!("^{translated}$"))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .ok()
}

/// Extension allow-set; empty allows everything.
#[derive(Debug, Clone, Default)]
pub struct ExtensionSet(HashSet<String>);

impl ExtensionSet {
    /// Build the set from user input: trimmed, lowercased and dot-prefixed.
    /// Blank entries are dropped.
    pub fn new<S: AsRef<str>>(extensions: impl IntoIterator<Item = S>) -> Self {
        let set = extensions
            .into_iter()
            .filter_map(|ext| {
                let ext = ext.as_ref().trim().to_lowercase();
                if ext.is_empty() || ext == "." {
                    None
                } else if ext.starts_with('.') {
                    Some(ext)
                } else {
                    Some(format!(".{ext}"))
                }
            })
            .collect();
        Self(set)
    }

    /// Files without an extension never match a non-empty set.
    pub fn matches(&self, record: &FileRecord) -> bool {
        if self.0.is_empty() {
            return true;
        }
        record.extension().is_some_and(|ext| self.0.contains(&ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::OffsetDateTime;

    #[rstest]
    #[case("", "anything.txt", true)]
    #[case("   ", "anything.txt", true)]
    #[case("port", "Report.PDF", true)]
    #[case("PORT", "report.pdf", true)]
    #[case("xyz", "report.pdf", false)]
    #[case("*.txt", "notes.TXT", true)]
    #[case("*.txt", "notes.txt.bak", false)]
    #[case("a?c.md", "abc.md", true)]
    #[case("a?c.md", "abbc.md", false)]
    #[case("r*t", "report", true)]
    #[case("(*)", "(x)", true)]
    #[case("[a].txt", "[a].txt", true)]
    #[case("a.c", "abc", false)]
    fn test_name_matcher(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        assert_eq!(NameMatcher::new(pattern).matches(name), expected);
    }

    #[test]
    fn test_wildcard_is_anchored() {
        assert!(matches!(NameMatcher::new("*.rs"), NameMatcher::Wildcard(_)));
        assert!(!NameMatcher::new("*.rs").matches("main.rs.orig"));
    }

    #[rstest]
    #[case(&[], "/d/a.bin", true)]
    #[case(&["txt"], "/d/a.TXT", true)]
    #[case(&[".TXT"], "/d/a.txt", true)]
    #[case(&[" .md "], "/d/a.md", true)]
    #[case(&[".txt"], "/d/a.md", false)]
    #[case(&[".txt"], "/d/Makefile", false)]
    #[case(&["", "."], "/d/Makefile", true)]
    fn test_extension_set(#[case] extensions: &[&str], #[case] path: &str, #[case] expected: bool) {
        let set = ExtensionSet::new(extensions.iter());
        let record = FileRecord::new(path, 0, OffsetDateTime::UNIX_EPOCH, "/d");
        assert_eq!(set.matches(&record), expected);
    }
}
