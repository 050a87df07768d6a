//! Repository for file records and per-root scan state.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{RecordRow, ScanStateRow};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use seekfile_index::error::{ErrorKind as IndexErrorKind, Result as IndexResult};
use seekfile_index::store::RecordStore;
use seekfile_index::{FileRecord, ScanState};
use sqlx::SqlitePool;
use std::path::Path;

/// SQLite-backed record store.
///
/// Every write is a single-statement upsert or delete, so repeating one is
/// harmless.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn sqlx_hates_paths(path: impl AsRef<Path>) -> Result<String> {
        Ok(path.as_ref().to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
    }

    /// Every stored file record.
    pub async fn records(&self) -> Result<Vec<FileRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(include_str!("../queries/select_records.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    /// Insert a record, replacing every column of an existing row at the same
    /// path.
    pub async fn save_record(&self, record: &FileRecord) -> Result<()> {
        let row = RecordRow::try_from(record)?;
        sqlx::query(include_str!("../queries/upsert_record.sql"))
            .bind(row.path)
            .bind(row.name)
            .bind(row.size)
            .bind(row.mod_time)
            .bind(row.root_path)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Delete the record at `path`, returning whether one existed.
    pub async fn delete_record(&self, path: impl AsRef<Path>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_record.sql"))
            .bind(Self::sqlx_hates_paths(path)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of stored file records.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_records.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    /// Scan state for `root`, or `None` if the root was never recorded.
    pub async fn scan_state(&self, root: impl AsRef<Path>) -> Result<Option<ScanState>> {
        let row: Option<ScanStateRow> = sqlx::query_as(include_str!("../queries/select_scan_state.sql"))
            .bind(Self::sqlx_hates_paths(root)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(ScanState::try_from).transpose()
    }

    pub async fn save_scan_state(&self, state: &ScanState) -> Result<()> {
        let row = ScanStateRow::try_from(state)?;
        sqlx::query(include_str!("../queries/upsert_scan_state.sql"))
            .bind(row.root_path)
            .bind(row.last_full_scan)
            .bind(row.last_incremental_scan)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for Repository {
    async fn load_all(&self) -> IndexResult<Vec<FileRecord>> {
        self.records().await.or_raise(|| IndexErrorKind::StoreUnavailable)
    }

    async fn upsert(&self, record: &FileRecord) -> IndexResult<()> {
        self.save_record(record).await.or_raise(|| IndexErrorKind::StoreUnavailable)
    }

    async fn delete(&self, path: &Path) -> IndexResult<()> {
        self.delete_record(path).await.or_raise(|| IndexErrorKind::StoreUnavailable)?;
        Ok(())
    }

    async fn get_scan_state(&self, root: &Path) -> IndexResult<ScanState> {
        let state = self.scan_state(root).await.or_raise(|| IndexErrorKind::StoreUnavailable)?;
        Ok(state.unwrap_or_else(|| ScanState::empty(root)))
    }

    async fn put_scan_state(&self, state: &ScanState) -> IndexResult<()> {
        self.save_scan_state(state).await.or_raise(|| IndexErrorKind::StoreUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use seekfile_index::store::StoreHandle;
    use std::path::PathBuf;
    use std::sync::Arc;
    use time::macros::datetime;

    #[fixture]
    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(path, size, datetime!(2024-03-01 12:00:00.5 UTC), "/data")
    }

    #[rstest]
    #[tokio::test]
    async fn test_upsert_replaces_all_columns(#[future] repo: Repository) {
        let repo = repo.await;
        repo.save_record(&record("/data/a.txt", 10)).await.unwrap();
        let mut replacement = record("/data/a.txt", 99);
        replacement.root_path = PathBuf::from("/other");
        replacement.modified = datetime!(2025-01-01 0:00 UTC);
        repo.save_record(&replacement).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.records().await.unwrap(), vec![replacement]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_is_idempotent(#[future] repo: Repository) {
        let repo = repo.await;
        repo.save_record(&record("/data/a.txt", 10)).await.unwrap();
        assert!(repo.delete_record("/data/a.txt").await.unwrap());
        assert!(!repo.delete_record("/data/a.txt").await.unwrap());
        RecordStore::delete(&repo, Path::new("/data/a.txt")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_scan_state_round_trip(#[future] repo: Repository) {
        let repo = repo.await;
        let empty = repo.get_scan_state(Path::new("/data")).await.unwrap();
        assert_eq!(empty, ScanState::empty("/data"));
        assert_eq!(repo.scan_state("/data").await.unwrap(), None);

        let mut state = ScanState::empty("/data");
        state.last_incremental_scan = Some(datetime!(2024-03-01 12:00:00.000000001 UTC));
        repo.put_scan_state(&state).await.unwrap();
        assert_eq!(repo.get_scan_state(Path::new("/data")).await.unwrap(), state);

        state.last_full_scan = state.last_incremental_scan;
        repo.put_scan_state(&state).await.unwrap();
        assert_eq!(repo.get_scan_state(Path::new("/data")).await.unwrap(), state);
    }

    #[rstest]
    #[tokio::test]
    async fn test_invalid_rows_raise_store_unavailable(#[future] repo: Repository) {
        let repo = repo.await;
        sqlx::query("INSERT INTO file_records (path, name, size, mod_time, root_path) VALUES ('/x', 'x', -5, 0, '/')")
            .execute(&repo.pool)
            .await
            .unwrap();
        let err = repo.load_all().await.unwrap_err();
        assert_eq!(*err, IndexErrorKind::StoreUnavailable);
    }

    #[tokio::test]
    async fn test_indexer_round_trip_through_sqlite() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), [0_u8; 10]).unwrap();
        std::fs::write(dir.path().join("b.txt"), [0_u8; 20]).unwrap();
        let db = Database::connect(dir.path().join("cache/seekfile.db")).await.unwrap();
        let store: StoreHandle = Arc::new(Repository::from(&db));

        let indexer = seekfile_index::Indexer::new([dir.path()], store.clone()).unwrap();
        indexer.start_scan(&Default::default(), seekfile_index::ScanMode::Full).unwrap();
        let status = indexer.wait_idle().await;
        assert_eq!(status.error, None);

        let restored = seekfile_index::Indexer::new([dir.path()], store).unwrap();
        assert_eq!(restored.load_from_store().await.unwrap(), 2);
        assert!(restored.status().last_successful_run.is_some());
        let result = restored.search(&Default::default(), &seekfile_index::Query::new());
        assert_eq!(result.files.iter().map(|f| f.size).collect::<Vec<_>>(), [10, 20]);
        db.close().await;
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_invalid_utf8_names_keep_index_and_store_in_step() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("ok.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), b"xy").unwrap();
        let db = Database::connect(dir.path().join("cache/seekfile.db")).await.unwrap();
        let repo = Repository::from(&db);
        let store: StoreHandle = Arc::new(repo.clone());
        let indexer = seekfile_index::Indexer::new([dir.path()], store).unwrap();

        for mode in [seekfile_index::ScanMode::Full, seekfile_index::ScanMode::Incremental, seekfile_index::ScanMode::Full] {
            indexer.start_scan(&Default::default(), mode).unwrap();
            let status = indexer.wait_idle().await;
            assert_eq!(status.error, None, "{mode} scan");
            assert_eq!(indexer.count_files(), 1);
            assert_eq!(repo.count().await.unwrap(), 1);
        }
        assert!(indexer.lookup(dir.path().join("ok.txt")).is_some());
        db.close().await;
    }
}
