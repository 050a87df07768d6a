//! The public indexer handle.

use crate::error::{ErrorKind, Result};
use crate::index::FileIndex;
use crate::path::{absolute_root, normalize};
use crate::query::{Query, SearchResult};
use crate::record::FileRecord;
use crate::scan::{ScanMode, ScanPass, ScanStatus, StatusTracker};
use crate::store::StoreHandle;
use exn::ResultExt;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// State shared between the handle and a running scan task.
pub(crate) struct Shared {
    pub roots: Vec<PathBuf>,
    pub index: FileIndex,
    pub store: StoreHandle,
    pub status: StatusTracker,
}

/// The tracked background scan.
struct ScanHandle {
    id: u64,
    token: CancellationToken,
}

struct Inner {
    shared: Shared,
    scan: Mutex<Option<ScanHandle>>,
    next_scan: AtomicU64,
}

/// Owned by a scan task; finishes the scan status however the task ends.
///
/// A task that is dropped or panics before the pass completes leaves
/// `processed` unset and finishes with [`ScanAborted`](ErrorKind::ScanAborted).
struct ScanGuard {
    inner: Arc<Inner>,
    id: u64,
    processed: Option<u64>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        let inner = &self.inner;
        // Release the slot before leaving the running state, so the next
        // accepted scan never finds a stale handle.
        {
            let mut slot = inner.scan.lock();
            if slot.as_ref().is_some_and(|handle| handle.id == self.id) {
                *slot = None;
            }
        }
        let processed = match self.processed {
            Some(processed) => processed,
            None => {
                inner.shared.status.record_error(&ErrorKind::ScanAborted);
                inner.shared.status.snapshot().processed
            },
        };
        let status = inner.shared.status.finish(processed, inner.shared.index.len());
        match &status.error {
            None => tracing::info!(scan = self.id, processed, known_files = status.known_files, "Scan complete"),
            Some(error) => tracing::warn!(scan = self.id, processed, error = %error, "Scan finished with error"),
        }
    }
}

/// File metadata index over a fixed set of root directories.
///
/// Cheap to clone; clones share the same index, store and scan state.
///
/// At most one scan runs at a time. Searches, lookups and status reads are
/// synchronous and only ever wait on lock acquisition.
#[derive(Clone)]
pub struct Indexer {
    inner: Arc<Inner>,
}

impl Indexer {
    /// Create an indexer over `roots`, persisting through `store`.
    ///
    /// Blank roots are ignored and duplicates collapsed. A root that does not
    /// exist yet is accepted (and walks as empty); one that exists but is not
    /// a directory is rejected. The index starts empty: call
    /// [`load_from_store`](Self::load_from_store) to hydrate it.
    pub fn new<P: AsRef<Path>>(roots: impl IntoIterator<Item = P>, store: StoreHandle) -> Result<Self> {
        let mut resolved: Vec<PathBuf> = Vec::new();
        for root in roots {
            let root = root.as_ref();
            if root.to_string_lossy().trim().is_empty() {
                continue;
            }
            let root = absolute_root(root)?;
            match std::fs::metadata(&root) {
                Ok(metadata) if !metadata.is_dir() => exn::bail!(ErrorKind::InvalidRoot(root)),
                Ok(_) => {},
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(root = %root.display(), "Scan root does not exist; it will be walked as empty");
                },
                Err(err) => return Err(err).or_raise(|| ErrorKind::InvalidRoot(root)),
            }
            if !resolved.contains(&root) {
                resolved.push(root);
            }
        }
        if resolved.is_empty() {
            exn::bail!(ErrorKind::NoRoots);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                shared: Shared {
                    roots: resolved,
                    index: FileIndex::default(),
                    store,
                    status: StatusTracker::default(),
                },
                scan: Mutex::new(None),
                next_scan: AtomicU64::new(0),
            }),
        })
    }

    /// Resolved absolute roots, in scan order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.inner.shared.roots
    }

    /// Exact lookup by path. The path is normalized before lookup.
    pub fn lookup(&self, path: impl AsRef<Path>) -> Option<FileRecord> {
        self.inner.shared.index.lookup(path)
    }

    pub fn count_files(&self) -> usize {
        self.inner.shared.index.len()
    }

    /// Run `query` against a consistent snapshot of the index.
    ///
    /// A cancelled `token` yields a partial result rather than an error.
    pub fn search(&self, token: &CancellationToken, query: &Query) -> SearchResult {
        self.inner.shared.index.search(token, query)
    }

    /// Start a scan in the background and return immediately.
    ///
    /// The scan runs under a child of `token`: cancelling `token` or calling
    /// [`stop_scan`](Self::stop_scan) stops it. Fails with
    /// [`ScanInProgress`](ErrorKind::ScanInProgress) if a scan is already
    /// running, in which case the running scan is left untouched.
    ///
    /// Must be called from within a Tokio runtime; otherwise it fails with
    /// [`ScanAborted`](ErrorKind::ScanAborted) and the status is unchanged.
    pub fn start_scan(&self, token: &CancellationToken, mode: ScanMode) -> Result<()> {
        let runtime = Handle::try_current().or_raise(|| ErrorKind::ScanAborted)?;
        let inner = &self.inner;
        let token = token.child_token();
        let guard = {
            let mut slot = inner.scan.lock();
            let known_files = inner.shared.index.len();
            if !inner.shared.status.try_begin(mode, known_files) {
                exn::bail!(ErrorKind::ScanInProgress);
            }
            let id = inner.next_scan.fetch_add(1, Ordering::Relaxed);
            *slot = Some(ScanHandle {
                id,
                token: token.clone(),
            });
            tracing::info!(%mode, scan = id, known_files, "Scan started");
            ScanGuard {
                inner: Arc::clone(inner),
                id,
                processed: None,
            }
        };
        runtime.spawn(async move {
            let mut guard = guard;
            let processed = ScanPass::new(&guard.inner.shared, &token, mode).run().await;
            guard.processed = Some(processed);
        });
        Ok(())
    }

    /// Signal the running scan, if any, to stop. Idempotent.
    pub fn stop_scan(&self) {
        if let Some(handle) = self.inner.scan.lock().as_ref() {
            tracing::info!(scan = handle.id, "Stopping scan");
            handle.token.cancel();
        }
    }

    /// Current scan status with a live file count.
    pub fn status(&self) -> ScanStatus {
        let mut status = self.inner.shared.status.snapshot();
        status.known_files = self.inner.shared.index.len();
        status
    }

    /// Watch status changes as they are published.
    ///
    /// Unlike [`status`](Self::status), `known_files` in these values is the
    /// count captured when the status was last written.
    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.inner.shared.status.subscribe()
    }

    /// Wait until no scan is running and return the resulting status.
    pub async fn wait_idle(&self) -> ScanStatus {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|status| !status.running).await;
        self.status()
    }

    /// Replace the index with everything in the record store.
    ///
    /// Publishes the latest recorded scan time across all roots as the last
    /// successful run. Intended for startup, before any scan is started.
    #[instrument(skip(self))]
    pub async fn load_from_store(&self) -> Result<usize> {
        let shared = &self.inner.shared;
        let records = shared.store.load_all().await?;
        let count = records.len();
        shared.index.replace(records);

        let mut latest = None;
        for root in &shared.roots {
            match shared.store.get_scan_state(root).await {
                Ok(state) => latest = latest.max(state.latest()),
                Err(err) => tracing::warn!(root = %root.display(), error = ?err, "Could not read scan state"),
            }
        }
        shared.status.restored(latest, shared.index.len());
        tracing::info!(records = count, "Index restored from record store");
        Ok(count)
    }

    /// Insert or replace one record, writing through to the store.
    ///
    /// The index is updated even if the store write fails.
    pub async fn update_file(&self, mut record: FileRecord) -> Result<()> {
        record.path = normalize(&record.path);
        self.inner.shared.index.upsert(record.clone());
        self.inner.shared.store.upsert(&record).await
    }

    /// Remove one record, writing through to the store.
    ///
    /// The index is updated even if the store delete fails.
    pub async fn remove_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = normalize(path);
        self.inner.shared.index.remove(&path);
        self.inner.shared.store.delete(&path).await
    }
}
