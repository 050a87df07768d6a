//! Query engine: filtering, sorting and pagination over an index snapshot.
//!
//! A [`Query`] is built once and never mutated by the engine. Execution
//! makes a single pass over every record, sorts the survivors under a strict
//! total order (requested field, then case-insensitive name, then path) and
//! slices out the requested page. Because the order is total, paging through
//! an unchanged index with repeated queries is stable.

mod category;
mod matcher;

pub use self::category::{Category, resolve_categories};
pub use self::matcher::{ExtensionSet, NameMatcher};
use crate::record::FileRecord;
use derive_more::Display;
use serde::Serialize;
use std::cmp::Ordering;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

/// How often the filter loop polls its cancellation token.
/// Using a power of 2 allows efficient modulo via bitwise AND.
const CANCEL_CHECK_INTERVAL: usize = 0x400; // 1,024
/// Page size used by [`Query::page`] when none is given.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page size accepted by [`Query::page`].
pub const MAX_PAGE_SIZE: usize = 200;

/// Primary sort key.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    #[display("name")]
    Name,
    #[display("size")]
    Size,
    #[display("modified")]
    Modified,
    #[display("path")]
    Path,
}

impl SortField {
    /// Lenient parse: unknown or empty input sorts by name.
    pub fn parse(field: &str) -> Self {
        match field.trim().to_lowercase().as_str() {
            "size" => Self::Size,
            "modified" | "time" => Self::Modified,
            "path" => Self::Path,
            _ => Self::Name,
        }
    }
}

/// Filter, sort and paging specification for a search.
///
/// Zero sizes and unset timestamps leave that side unbounded; a zero limit
/// returns everything from the offset onward.
///
/// # Examples
///
/// ```
/// use seekfile_index::query::{Query, SortField};
///
/// let largest_text_file = Query::new()
///     .extension(".txt")
///     .sort(SortField::Size)
///     .descending(true)
///     .limit(1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    pattern: String,
    min_size: u64,
    max_size: u64,
    modified_after: Option<OffsetDateTime>,
    modified_before: Option<OffsetDateTime>,
    extensions: Vec<String>,
    sort: SortField,
    descending: bool,
    offset: usize,
    limit: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name pattern: a case-insensitive substring, or a wildcard pattern if
    /// it contains `*` or `?`.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = bytes;
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    pub fn modified_after(mut self, after: OffsetDateTime) -> Self {
        self.modified_after = Some(after);
        self
    }

    pub fn modified_before(mut self, before: OffsetDateTime) -> Self {
        self.modified_before = Some(before);
        self
    }

    /// Add one extension to the allow-list (dot optional, any case).
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extensions.push(extension.into());
        self
    }

    pub fn extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions.extend(extensions.into_iter().map(Into::into));
        self
    }

    /// Add every extension of a category to the allow-list.
    pub fn category(self, category: Category) -> Self {
        self.extensions(category.extensions().iter().copied())
    }

    pub fn sort(mut self, field: SortField) -> Self {
        self.sort = field;
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset and limit from a 1-based page number.
    ///
    /// A zero page is treated as the first page; a zero page size uses
    /// [`DEFAULT_PAGE_SIZE`] and larger sizes are capped at [`MAX_PAGE_SIZE`].
    pub fn page(self, page: usize, page_size: usize) -> Self {
        let page_size = match page_size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        };
        let offset = page.max(1).saturating_sub(1).saturating_mul(page_size);
        self.offset(offset).limit(page_size)
    }

    pub fn sort_field(&self) -> SortField {
        self.sort
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }
}

/// One page of matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// The requested page, in sorted order.
    pub files: Vec<FileRecord>,
    /// Number of matches before pagination.
    pub total: usize,
}

/// Predicates compiled once per query.
struct Filter<'q> {
    query: &'q Query,
    name: NameMatcher,
    extensions: ExtensionSet,
}

impl<'q> Filter<'q> {
    fn new(query: &'q Query) -> Self {
        Self {
            query,
            name: NameMatcher::new(&query.pattern),
            extensions: ExtensionSet::new(&query.extensions),
        }
    }

    fn matches(&self, record: &FileRecord) -> bool {
        let query = self.query;
        if !self.name.matches(&record.name) || !self.extensions.matches(record) {
            return false;
        }
        if query.min_size > 0 && record.size < query.min_size {
            return false;
        }
        if query.max_size > 0 && record.size > query.max_size {
            return false;
        }
        if let Some(after) = query.modified_after
            && record.modified < after
        {
            return false;
        }
        if let Some(before) = query.modified_before
            && record.modified > before
        {
            return false;
        }
        true
    }
}

/// A match with its case-folded sort keys computed once.
struct Candidate<'a> {
    record: &'a FileRecord,
    name: String,
    path: Option<String>,
}

impl<'a> Candidate<'a> {
    fn new(record: &'a FileRecord, field: SortField) -> Self {
        Self {
            record,
            name: record.name.to_lowercase(),
            path: (field == SortField::Path).then(|| record.path.to_string_lossy().to_lowercase()),
        }
    }

    /// Direction applies to the field and name; the final path tie-break is
    /// always ascending.
    fn cmp(&self, other: &Self, field: SortField, descending: bool) -> Ordering {
        let primary = match field {
            SortField::Size => self.record.size.cmp(&other.record.size),
            SortField::Modified => self.record.modified.cmp(&other.record.modified),
            SortField::Path => self.path.cmp(&other.path),
            SortField::Name => Ordering::Equal,
        };
        let ordering = primary.then_with(|| self.name.cmp(&other.name));
        let ordering = if descending { ordering.reverse() } else { ordering };
        ordering.then_with(|| self.record.path.cmp(&other.record.path))
    }
}

/// Run `query` over `records`.
///
/// Cancellation is polled every [`CANCEL_CHECK_INTERVAL`] records; a
/// cancelled search returns whatever matched so far, not an error.
pub(crate) fn execute<'a>(
    records: impl Iterator<Item = &'a FileRecord>,
    token: &CancellationToken,
    query: &Query,
) -> SearchResult {
    let filter = Filter::new(query);
    let field = query.sort;
    let mut matches = Vec::new();
    for (i, record) in records.enumerate() {
        if i & (CANCEL_CHECK_INTERVAL - 1) == 0 && token.is_cancelled() {
            tracing::debug!(inspected = i, "Search cancelled; returning partial result");
            break;
        }
        if filter.matches(record) {
            matches.push(Candidate::new(record, field));
        }
    }

    // Paths are unique, so the comparison is a strict total order and an
    // unstable sort is deterministic.
    matches.sort_unstable_by(|a, b| a.cmp(b, field, query.descending));

    let total = matches.len();
    let offset = query.offset.min(total);
    let remaining = total - offset;
    let limit = match query.limit {
        0 => remaining,
        limit => limit.min(remaining),
    };
    let files = matches[offset..offset + limit].iter().map(|c| c.record.clone()).collect();
    SearchResult { files, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::path::PathBuf;
    use time::Duration;
    use time::macros::datetime;

    const EPOCH: OffsetDateTime = datetime!(2024-01-01 0:00 UTC);

    fn record(path: &str, size: u64, minutes: i64) -> FileRecord {
        FileRecord::new(path, size, EPOCH + Duration::minutes(minutes), "/data")
    }

    #[fixture]
    fn records() -> Vec<FileRecord> {
        vec![
            record("/data/b.txt", 20, 2),
            record("/data/a.txt", 10, 1),
            record("/data/photos/Cat.PNG", 3000, 5),
            record("/data/photos/dog.png", 1500, 4),
            record("/data/notes.md", 15, 3),
            record("/data/Makefile", 5, 0),
        ]
    }

    fn run(records: &[FileRecord], query: &Query) -> SearchResult {
        execute(records.iter(), &CancellationToken::new(), query)
    }

    fn names(result: &SearchResult) -> Vec<&str> {
        result.files.iter().map(|f| f.name.as_str()).collect()
    }

    #[rstest]
    fn test_default_query_sorts_by_name(records: Vec<FileRecord>) {
        let result = run(&records, &Query::new());
        assert_eq!(result.total, 6);
        assert_eq!(names(&result), ["a.txt", "b.txt", "Cat.PNG", "dog.png", "Makefile", "notes.md"]);
    }

    #[rstest]
    #[case(Query::new().min_size(15), &["b.txt", "Cat.PNG", "dog.png", "notes.md"])]
    #[case(Query::new().max_size(15), &["a.txt", "Makefile", "notes.md"])]
    #[case(Query::new().min_size(10).max_size(20), &["a.txt", "b.txt", "notes.md"])]
    #[case(Query::new().pattern("*.png"), &["Cat.PNG", "dog.png"])]
    #[case(Query::new().pattern("OTE"), &["notes.md"])]
    #[case(Query::new().extension("txt"), &["a.txt", "b.txt"])]
    #[case(Query::new().category(Category::Images), &["Cat.PNG", "dog.png"])]
    #[case(Query::new().modified_after(EPOCH + Duration::minutes(3)), &["Cat.PNG", "dog.png", "notes.md"])]
    #[case(Query::new().modified_before(EPOCH + Duration::minutes(1)), &["a.txt", "Makefile"])]
    fn test_filters(records: Vec<FileRecord>, #[case] query: Query, #[case] expected: &[&str]) {
        let result = run(&records, &query);
        assert_eq!(names(&result), expected);
        assert_eq!(result.total, expected.len());
    }

    #[rstest]
    fn test_largest_text_file(records: Vec<FileRecord>) {
        let query = Query::new().extensions([".txt"]).sort(SortField::Size).descending(true).limit(1);
        let result = run(&records, &query);
        assert_eq!(result.total, 2);
        assert_eq!(names(&result), ["b.txt"]);
    }

    #[rstest]
    #[case(SortField::Size, false, &["Makefile", "a.txt", "notes.md", "b.txt", "dog.png", "Cat.PNG"])]
    #[case(SortField::Modified, true, &["Cat.PNG", "dog.png", "notes.md", "b.txt", "a.txt", "Makefile"])]
    #[case(SortField::Path, false, &["a.txt", "b.txt", "Makefile", "notes.md", "Cat.PNG", "dog.png"])]
    fn test_sort_fields(
        records: Vec<FileRecord>,
        #[case] field: SortField,
        #[case] descending: bool,
        #[case] expected: &[&str],
    ) {
        let result = run(&records, &Query::new().sort(field).descending(descending));
        assert_eq!(names(&result), expected);
    }

    #[test]
    fn test_ties_break_by_name_then_path() {
        let records = vec![
            FileRecord::new("/data/z/same.txt", 1, EPOCH, "/data"),
            FileRecord::new("/data/a/SAME.txt", 1, EPOCH, "/data"),
            FileRecord::new("/data/m/other.txt", 1, EPOCH, "/data"),
        ];
        let result = run(&records, &Query::new().sort(SortField::Size));
        let paths: Vec<_> = result.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            [PathBuf::from("/data/m/other.txt"), PathBuf::from("/data/a/SAME.txt"), PathBuf::from("/data/z/same.txt")]
        );
    }

    #[rstest]
    #[case(SortField::Size)]
    #[case(SortField::Name)]
    #[case(SortField::Modified)]
    fn test_descending_ties_keep_paths_ascending(#[case] field: SortField) {
        let records = vec![
            FileRecord::new("/data/z/same.txt", 1, EPOCH, "/data"),
            FileRecord::new("/data/a/same.txt", 1, EPOCH, "/data"),
        ];
        let result = run(&records, &Query::new().sort(field).descending(true));
        let paths: Vec<_> = result.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("/data/a/same.txt"), PathBuf::from("/data/z/same.txt")]);
    }

    #[rstest]
    fn test_order_is_stable_across_input_order(records: Vec<FileRecord>) {
        let mut reversed = records.clone();
        reversed.reverse();
        for field in [SortField::Name, SortField::Size, SortField::Modified, SortField::Path] {
            let query = Query::new().sort(field);
            assert_eq!(run(&records, &query), run(&reversed, &query));
        }
    }

    #[rstest]
    #[case(0, 0, 6)]
    #[case(0, 2, 2)]
    #[case(4, 10, 2)]
    #[case(5, 0, 1)]
    #[case(6, 3, 0)]
    #[case(100, 3, 0)]
    fn test_pagination(records: Vec<FileRecord>, #[case] offset: usize, #[case] limit: usize, #[case] len: usize) {
        let result = run(&records, &Query::new().offset(offset).limit(limit));
        assert_eq!(result.total, 6);
        assert_eq!(result.files.len(), len);
        assert!(result.total >= result.files.len());
    }

    #[rstest]
    fn test_pages_partition_results(records: Vec<FileRecord>) {
        let all = run(&records, &Query::new());
        let mut paged = Vec::new();
        for page in 1..=3 {
            paged.extend(run(&records, &Query::new().page(page, 2)).files);
        }
        assert_eq!(paged, all.files);
    }

    #[rstest]
    #[case(0, 0, 0, DEFAULT_PAGE_SIZE)]
    #[case(1, 10, 0, 10)]
    #[case(3, 10, 20, 10)]
    #[case(2, 1000, MAX_PAGE_SIZE, MAX_PAGE_SIZE)]
    fn test_page_helper(#[case] page: usize, #[case] size: usize, #[case] offset: usize, #[case] limit: usize) {
        let query = Query::new().page(page, size);
        assert_eq!((query.offset, query.limit), (offset, limit));
    }

    #[rstest]
    fn test_cancelled_search_is_partial_not_error(records: Vec<FileRecord>) {
        let token = CancellationToken::new();
        token.cancel();
        let result = execute(records.iter(), &token, &Query::new());
        assert_eq!(result.total, 0);
        assert!(result.files.is_empty());
    }

    #[rstest]
    #[case("size", SortField::Size)]
    #[case("Modified", SortField::Modified)]
    #[case("time", SortField::Modified)]
    #[case("path", SortField::Path)]
    #[case("name", SortField::Name)]
    #[case("", SortField::Name)]
    #[case("bogus", SortField::Name)]
    fn test_sort_field_parse(#[case] input: &str, #[case] expected: SortField) {
        assert_eq!(SortField::parse(input), expected);
    }
}
