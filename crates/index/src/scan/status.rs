use crate::error::ErrorKind;
use crate::scan::ScanMode;
use serde::Serialize;
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio::sync::watch;

/// Snapshot of the current (or most recent) scan.
///
/// Only one status value exists per indexer; each scan overwrites the last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub mode: ScanMode,
    pub running: bool,
    /// File most recently visited by the running scan.
    pub current_path: Option<PathBuf>,
    /// Files visited by the current or last scan.
    pub processed: u64,
    /// Live size of the in-memory index at the time the status was read.
    pub known_files: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_successful_run: Option<OffsetDateTime>,
    /// First error recorded by the last scan, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owner of the single [`ScanStatus`] value.
///
/// Lives behind a watch channel rather than the index lock, so polling the
/// status never waits on a search or a scan write.
#[derive(Debug)]
pub(crate) struct StatusTracker {
    tx: watch::Sender<ScanStatus>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        let (tx, _) = watch::channel(ScanStatus::default());
        Self { tx }
    }
}

impl StatusTracker {
    pub fn snapshot(&self) -> ScanStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.tx.subscribe()
    }

    /// Transition to running unless a scan already is.
    ///
    /// The check and the update happen under one lock; returns `false`
    /// (leaving the status untouched) if another scan holds the slot.
    pub fn try_begin(&self, mode: ScanMode, known_files: usize) -> bool {
        self.tx.send_if_modified(|status| {
            if status.running {
                return false;
            }
            *status = ScanStatus {
                mode,
                running: true,
                current_path: None,
                processed: 0,
                known_files,
                started_at: Some(OffsetDateTime::now_utc()),
                finished_at: status.finished_at,
                last_successful_run: status.last_successful_run,
                error: None,
            };
            true
        })
    }

    pub fn progress(&self, processed: u64, path: PathBuf) {
        self.tx.send_modify(|status| {
            status.processed = processed;
            status.current_path = Some(path);
        });
    }

    /// Record `kind` as the scan's error unless an earlier one is already set.
    pub fn record_error(&self, kind: &ErrorKind) {
        self.tx.send_if_modified(|status| {
            if status.error.is_some() {
                return false;
            }
            status.error = Some(kind.to_string());
            true
        });
    }

    /// Leave the running state, returning the final status.
    pub fn finish(&self, processed: u64, known_files: usize) -> ScanStatus {
        let now = OffsetDateTime::now_utc();
        self.tx.send_modify(|status| {
            status.running = false;
            status.current_path = None;
            status.processed = processed;
            status.known_files = known_files;
            status.finished_at = Some(now);
            if status.error.is_none() {
                status.last_successful_run = Some(now);
            }
        });
        self.snapshot()
    }

    /// Publish the state of an index just hydrated from the record store.
    pub fn restored(&self, last_successful_run: Option<OffsetDateTime>, known_files: usize) {
        self.tx.send_modify(|status| {
            status.mode = ScanMode::Incremental;
            status.processed = 0;
            status.known_files = known_files;
            status.last_successful_run = last_successful_run;
            status.error = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight() {
        let tracker = StatusTracker::default();
        assert!(tracker.try_begin(ScanMode::Full, 3));
        let started = tracker.snapshot();
        assert!(!tracker.try_begin(ScanMode::Incremental, 7));
        assert_eq!(tracker.snapshot(), started);
        assert_eq!(started.mode, ScanMode::Full);
        assert_eq!(started.known_files, 3);
    }

    #[test]
    fn test_first_error_wins() {
        let tracker = StatusTracker::default();
        assert!(tracker.try_begin(ScanMode::Incremental, 0));
        tracker.record_error(&ErrorKind::StoreUnavailable);
        tracker.record_error(&ErrorKind::Cancelled);
        let status = tracker.finish(4, 4);
        assert_eq!(status.error.as_deref(), Some("record store unavailable"));
        assert!(status.last_successful_run.is_none());
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn test_begin_clears_previous_error() {
        let tracker = StatusTracker::default();
        tracker.try_begin(ScanMode::Incremental, 0);
        tracker.record_error(&ErrorKind::Cancelled);
        tracker.finish(0, 0);
        assert!(tracker.try_begin(ScanMode::Incremental, 0));
        let status = tracker.finish(2, 2);
        assert_eq!(status.error, None);
        assert_eq!(status.last_successful_run, status.finished_at);
    }

    #[test]
    fn test_progress() {
        let tracker = StatusTracker::default();
        tracker.try_begin(ScanMode::Incremental, 0);
        tracker.progress(1, PathBuf::from("/data/a.txt"));
        assert_eq!(tracker.snapshot().current_path, Some(PathBuf::from("/data/a.txt")));
        let status = tracker.finish(1, 1);
        assert_eq!(status.current_path, None);
        assert_eq!(status.processed, 1);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(ScanStatus::default()).unwrap();
        assert_eq!(json["mode"], "incremental");
        assert_eq!(json["knownFiles"], 0);
        assert!(json["lastSuccessfulRun"].is_null());
        assert!(json.get("error").is_none());
    }
}
