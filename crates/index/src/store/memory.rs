//! In-memory record store for testing.

use crate::error::{ErrorKind, Result};
use crate::path::normalize;
use crate::record::{FileRecord, ScanState};
use crate::store::RecordStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory record store for testing.
///
/// Records and scan states are kept in `HashMap`s behind a [`RwLock`], so all
/// trait methods can operate on `&self` without external synchronisation.
/// Every successful write is counted, and writes can be switched to fail, so
/// tests can assert on write-through behaviour without a real database.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<PathBuf, FileRecord>>,
    states: RwLock<HashMap<PathBuf, ScanState>>,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl MemoryStore {
    /// Create a store pre-populated with records (not counted as writes).
    pub fn with_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let records = records.into_iter().map(|record| (normalize(&record.path), record)).collect();
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Number of successful record upserts since construction.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of successful record deletions since construction.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Make every subsequent operation fail with
    /// [`StoreUnavailable`](ErrorKind::StoreUnavailable).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sleep for `delay` before every record write, to simulate a slow store.
    pub fn set_write_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Snapshot of a stored record, for assertions.
    pub async fn get(&self, path: impl AsRef<Path>) -> Option<FileRecord> {
        self.records.read().await.get(&normalize(path)).cloned()
    }

    /// Snapshot of a stored scan state, for assertions.
    pub async fn scan_state(&self, root: impl AsRef<Path>) -> Option<ScanState> {
        self.states.read().await.get(root.as_ref()).cloned()
    }

    /// Number of stored records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    async fn throttle(&self) {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::StoreUnavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<FileRecord>> {
        self.check()?;
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn upsert(&self, record: &FileRecord) -> Result<()> {
        self.throttle().await;
        self.check()?;
        self.records.write().await.insert(normalize(&record.path), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.check()?;
        if self.records.write().await.remove(&normalize(path)).is_some() {
            self.deletes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn get_scan_state(&self, root: &Path) -> Result<ScanState> {
        self.check()?;
        let state = self.states.read().await.get(root).cloned();
        Ok(state.unwrap_or_else(|| ScanState::empty(root)))
    }

    async fn put_scan_state(&self, state: &ScanState) -> Result<()> {
        self.check()?;
        self.states.write().await.insert(state.root_path.clone(), state.clone());
        Ok(())
    }
}
