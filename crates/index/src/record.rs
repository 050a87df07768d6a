//! Index models.
//!
//! These types are shared between the in-memory index, the query engine and
//! the [`RecordStore`](crate::store::RecordStore) capability.

use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Metadata for one regular file under a configured root.
///
/// The normalized absolute `path` is the record's only identity. Writing a
/// record for a path that is already indexed replaces it entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute, normalized path of the file
    #[serde(serialize_with = "lossy_path")]
    pub path: PathBuf,
    /// Final path component
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
    /// The configured root this file was discovered under
    #[serde(serialize_with = "lossy_path")]
    pub root_path: PathBuf,
}
impl FileRecord {
    /// Create a record, deriving the name from the path's final component.
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime, root_path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Self {
            path,
            name,
            size,
            modified,
            root_path: root_path.into(),
        }
    }

    /// Lowercased suffix from the last dot of the name (`".txt"`), if any.
    ///
    /// A leading dot counts, so `.bashrc` has the extension `".bashrc"`.
    pub fn extension(&self) -> Option<String> {
        self.name.rfind('.').map(|dot| self.name[dot..].to_lowercase())
    }

    /// Whether the on-disk metadata still matches this record.
    ///
    /// Size and modification time are trusted as a cheap change proxy; file
    /// contents are never hashed.
    pub fn is_unchanged(&self, size: u64, modified: OffsetDateTime) -> bool {
        self.size == size && self.modified == modified
    }
}

/// Paths are written as UTF-8, replacing any invalid sequences.
fn lossy_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Durable per-root scan bookkeeping.
///
/// A root without any completed scan has both timestamps unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanState {
    #[serde(serialize_with = "lossy_path")]
    pub root_path: PathBuf,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_full_scan: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_incremental_scan: Option<OffsetDateTime>,
}
impl ScanState {
    /// The zero-valued state for a root that has never been scanned.
    pub fn empty(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            last_full_scan: None,
            last_incremental_scan: None,
        }
    }

    /// The most recent of both scan timestamps.
    pub fn latest(&self) -> Option<OffsetDateTime> {
        self.last_full_scan.max(self.last_incremental_scan)
    }
}
