//! Record store capability.
//!
//! The indexer does not know how (or whether) its records are persisted; it
//! depends on the narrow [`RecordStore`] trait, injected at construction as
//! a [`StoreHandle`]. The SQLite implementation lives in the
//! `seekfile-cache` crate; tests use [`MemoryStore`].

#[cfg(any(test, feature = "mock"))]
mod memory;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryStore;
use crate::error::Result;
use crate::record::{FileRecord, ScanState};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to a record store.
pub type StoreHandle = Arc<dyn RecordStore + Send + Sync>;

/// Durable persistence for file records and per-root scan bookkeeping.
///
/// Implementations report every failure as
/// [`StoreUnavailable`](crate::error::ErrorKind::StoreUnavailable), raised on
/// top of their own error frames. Writes must be idempotent: upserting the
/// same record twice, or deleting a path that is not stored, succeeds.
///
/// # Examples
///
/// ```
/// use seekfile_index::error::Result;
/// use seekfile_index::store::RecordStore;
///
/// async fn total_bytes(store: &dyn RecordStore) -> Result<u64> {
///     let records = store.load_all().await?;
///     Ok(records.iter().map(|record| record.size).sum())
/// }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read every stored record.
    async fn load_all(&self) -> Result<Vec<FileRecord>>;

    /// Insert or fully replace the record stored at `record.path`.
    async fn upsert(&self, record: &FileRecord) -> Result<()>;

    /// Remove the record stored at `path`, if any.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Fetch the scan bookkeeping for a root.
    ///
    /// Returns [`ScanState::empty`] (never an error) for a root that has no
    /// state yet.
    async fn get_scan_state(&self, root: &Path) -> Result<ScanState>;

    /// Insert or replace the scan bookkeeping for `state.root_path`.
    async fn put_scan_state(&self, state: &ScanState) -> Result<()>;
}
