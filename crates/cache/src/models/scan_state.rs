use super::{from_nanos, path_to_text, to_nanos};
use crate::error::Error;
use seekfile_index::ScanState;
use std::path::PathBuf;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ScanStateRow {
    pub root_path: String,
    pub last_full_scan: Option<i64>,
    pub last_incremental_scan: Option<i64>,
}
impl TryFrom<&ScanState> for ScanStateRow {
    type Error = Error;
    fn try_from(state: &ScanState) -> Result<Self, Self::Error> {
        Ok(Self {
            root_path: path_to_text(&state.root_path, "root path")?,
            last_full_scan: state.last_full_scan.map(|t| to_nanos(t, "last full scan")).transpose()?,
            last_incremental_scan: state
                .last_incremental_scan
                .map(|t| to_nanos(t, "last incremental scan"))
                .transpose()?,
        })
    }
}
impl TryFrom<ScanStateRow> for ScanState {
    type Error = Error;
    fn try_from(row: ScanStateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            root_path: PathBuf::from(row.root_path),
            last_full_scan: row.last_full_scan.map(|n| from_nanos(n, "last full scan")).transpose()?,
            last_incremental_scan: row
                .last_incremental_scan
                .map(|n| from_nanos(n, "last incremental scan"))
                .transpose()?,
        })
    }
}
