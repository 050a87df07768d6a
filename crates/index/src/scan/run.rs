use crate::error::{Error, ErrorKind, Result};
use crate::indexer::Shared;
use crate::path::normalize;
use crate::record::FileRecord;
use crate::scan::ScanMode;
use crate::scan::walk::walk;
use futures::StreamExt;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Await `fut` unless `token` is cancelled first.
///
/// Once the token is cancelled no further store call is allowed to start or
/// keep running.
pub(crate) async fn until_cancelled<T>(token: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::from(ErrorKind::Cancelled)),
        result = fut => result,
    }
}

/// One walk over every configured root followed by deletion reconciliation.
///
/// Errors never abort the pass except cancellation: the first one is
/// recorded on the status tracker and processing moves on.
pub(crate) struct ScanPass<'a> {
    shared: &'a Shared,
    token: &'a CancellationToken,
    mode: ScanMode,
    processed: u64,
    seen: HashSet<PathBuf>,
    scanned: HashSet<PathBuf>,
}

impl<'a> ScanPass<'a> {
    pub fn new(shared: &'a Shared, token: &'a CancellationToken, mode: ScanMode) -> Self {
        Self {
            shared,
            token,
            mode,
            processed: 0,
            seen: HashSet::new(),
            scanned: HashSet::new(),
        }
    }

    /// Run the pass, returning the number of files visited.
    ///
    /// Does not finalize the status; the caller owns that transition.
    #[instrument(name = "scan", skip(self), fields(mode = %self.mode))]
    pub async fn run(mut self) -> u64 {
        let shared = self.shared;
        for root in &shared.roots {
            if self.token.is_cancelled() {
                self.fail(&Error::from(ErrorKind::Cancelled));
                break;
            }
            if let Err(err) = self.walk_root(root).await {
                self.fail(&err);
                break;
            }
            self.scanned.insert(root.clone());
            self.save_state(root).await;
        }

        if self.token.is_cancelled() {
            tracing::info!(processed = self.processed, "Scan cancelled; skipping deletion reconciliation");
        } else {
            self.reconcile().await;
        }
        self.processed
    }

    fn fail(&self, err: &Error) {
        match &**err {
            ErrorKind::Cancelled => tracing::debug!("Scan observed cancellation"),
            _ => tracing::warn!(error = ?err, "Scan error recorded; continuing"),
        }
        self.shared.status.record_error(err);
    }

    /// Walk one root. Only cancellation ends the walk early.
    #[instrument(skip(self), fields(root = %root.display()))]
    async fn walk_root(&mut self, root: &Path) -> Result<()> {
        let mut files = walk(root);
        let mut written = 0_u64;
        while let Some(item) = files.next().await {
            if self.token.is_cancelled() {
                exn::bail!(ErrorKind::Cancelled);
            }
            let file = match item {
                Ok(file) => file,
                Err(err) => {
                    tracing::debug!(error = ?err, "Skipping unreadable entry");
                    continue;
                },
            };
            let path = normalize(&file.path);
            self.processed += 1;
            self.seen.insert(path.clone());
            self.shared.status.progress(self.processed, path.clone());

            if self.mode == ScanMode::Incremental
                && self.shared.index.lookup(&path).is_some_and(|r| r.is_unchanged(file.size, file.modified))
            {
                continue;
            }
            let record = FileRecord::new(path, file.size, file.modified, root);
            self.shared.index.upsert(record.clone());
            written += 1;
            if let Err(err) = until_cancelled(self.token, self.shared.store.upsert(&record)).await {
                if matches!(*err, ErrorKind::Cancelled) {
                    return Err(err);
                }
                self.fail(&err);
            }
        }
        tracing::debug!(written, "Root walk complete");
        Ok(())
    }

    async fn save_state(&self, root: &Path) {
        let now = OffsetDateTime::now_utc();
        let result = async {
            let mut state = until_cancelled(self.token, self.shared.store.get_scan_state(root)).await?;
            state.root_path = root.to_path_buf();
            state.last_incremental_scan = Some(now);
            if self.mode == ScanMode::Full {
                state.last_full_scan = Some(now);
            }
            until_cancelled(self.token, self.shared.store.put_scan_state(&state)).await
        }
        .await;
        if let Err(err) = result {
            self.fail(&err);
        }
    }

    /// Drop records under fully walked roots whose files are confirmed gone.
    async fn reconcile(&self) {
        let mut removed = 0_usize;
        for path in self.shared.index.unseen_in_roots(&self.scanned, &self.seen) {
            if self.token.is_cancelled() {
                self.fail(&Error::from(ErrorKind::Cancelled));
                return;
            }
            match tokio::fs::metadata(&path).await {
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
                // Still on disk, or unknown: keep.
                _ => continue,
            }
            self.shared.index.remove(&path);
            removed += 1;
            if let Err(err) = until_cancelled(self.token, self.shared.store.delete(&path)).await {
                self.fail(&err);
            }
        }
        if removed > 0 {
            tracing::info!(removed, "Removed records for deleted files");
        }
    }
}
