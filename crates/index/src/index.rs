//! The in-memory index.

use crate::path::normalize;
use crate::query::{Query, SearchResult};
use crate::record::FileRecord;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Process-local map from normalized absolute path to [`FileRecord`].
///
/// Readers share the lock; every mutation takes it exclusively for its whole
/// duration. A search holds the shared lock across its entire filter and sort
/// pass, so each query observes one consistent snapshot (and a long search
/// stalls pending writes, and vice versa).
#[derive(Debug, Default)]
pub struct FileIndex {
    files: RwLock<HashMap<PathBuf, FileRecord>>,
}

impl FileIndex {
    /// Insert a record, replacing any existing record at the same path.
    pub fn upsert(&self, mut record: FileRecord) {
        record.path = normalize(&record.path);
        self.files.write().insert(record.path.clone(), record);
    }

    /// Remove the record at `path`, returning it if it was indexed.
    pub fn remove(&self, path: impl AsRef<Path>) -> Option<FileRecord> {
        self.files.write().remove(&normalize(path))
    }

    /// Exact lookup on the normalized path.
    pub fn lookup(&self, path: impl AsRef<Path>) -> Option<FileRecord> {
        self.files.read().get(&normalize(path)).cloned()
    }

    /// Current number of indexed records.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Atomically swap the whole index for `records`.
    pub fn replace(&self, records: impl IntoIterator<Item = FileRecord>) {
        let files = records
            .into_iter()
            .map(|mut record| {
                record.path = normalize(&record.path);
                (record.path.clone(), record)
            })
            .collect();
        *self.files.write() = files;
    }

    /// Filter, sort and paginate under a single shared lock.
    pub fn search(&self, token: &CancellationToken, query: &Query) -> SearchResult {
        let files = self.files.read();
        crate::query::execute(files.values(), token, query)
    }

    /// Paths of records that belong to one of `roots` but are missing from
    /// `seen`.
    pub(crate) fn unseen_in_roots(&self, roots: &HashSet<PathBuf>, seen: &HashSet<PathBuf>) -> Vec<PathBuf> {
        self.files
            .read()
            .values()
            .filter(|record| roots.contains(&record.root_path) && !seen.contains(&record.path))
            .map(|record| record.path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(path, size, OffsetDateTime::UNIX_EPOCH, "/data")
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let index = FileIndex::default();
        index.upsert(record("/data/a.txt", 10));
        let once = index.lookup("/data/a.txt");
        index.upsert(record("/data/a.txt", 10));
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("/data/a.txt"), once);
    }

    #[test]
    fn test_upsert_replaces_whole_record() {
        let index = FileIndex::default();
        index.upsert(record("/data/a.txt", 10));
        index.upsert(FileRecord::new("/data/a.txt", 99, OffsetDateTime::UNIX_EPOCH, "/other"));
        let found = index.lookup("/data/a.txt").unwrap();
        assert_eq!(found.size, 99);
        assert_eq!(found.root_path, PathBuf::from("/other"));
    }

    #[test]
    fn test_paths_are_normalized() {
        let index = FileIndex::default();
        index.upsert(record("/data/./docs/../a.txt", 1));
        assert!(index.lookup("/data/a.txt").is_some());
        assert!(index.lookup("/data//a.txt").is_some());
        assert_eq!(index.lookup("/data/a.txt").unwrap().path, PathBuf::from("/data/a.txt"));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let index = FileIndex::default();
        index.upsert(record("/data/a.txt", 1));
        assert!(index.remove("/data/b.txt").is_none());
        assert!(index.remove("/data/a.txt").is_some());
        assert!(index.is_empty());
    }

    #[test]
    fn test_replace_swaps_everything() {
        let index = FileIndex::default();
        index.upsert(record("/data/old.txt", 1));
        index.replace([record("/data/a.txt", 1), record("/data/b.txt", 2)]);
        assert_eq!(index.len(), 2);
        assert!(index.lookup("/data/old.txt").is_none());
    }

    #[test]
    fn test_unseen_in_roots() {
        let index = FileIndex::default();
        index.upsert(record("/data/a.txt", 1));
        index.upsert(record("/data/b.txt", 1));
        index.upsert(FileRecord::new("/other/c.txt", 1, OffsetDateTime::UNIX_EPOCH, "/other"));
        let roots = HashSet::from([PathBuf::from("/data")]);
        let seen = HashSet::from([PathBuf::from("/data/a.txt")]);
        assert_eq!(index.unseen_in_roots(&roots, &seen), vec![PathBuf::from("/data/b.txt")]);
    }
}
