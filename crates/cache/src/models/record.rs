use super::{from_nanos, path_to_text, to_nanos};
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use seekfile_index::FileRecord;
use std::path::PathBuf;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub path: String,
    pub name: String,
    pub size: i64,
    pub mod_time: i64,
    pub root_path: String,
}
impl TryFrom<&FileRecord> for RecordRow {
    type Error = Error;
    fn try_from(record: &FileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            path: path_to_text(&record.path, "path")?,
            name: record.name.clone(),
            size: i64::try_from(record.size).or_raise(|| ErrorKind::InvalidData("size"))?,
            mod_time: to_nanos(record.modified, "modified")?,
            root_path: path_to_text(&record.root_path, "root path")?,
        })
    }
}
impl TryFrom<RecordRow> for FileRecord {
    type Error = Error;
    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            path: PathBuf::from(row.path),
            name: row.name,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("size"))?,
            modified: from_nanos(row.mod_time, "modified")?,
            root_path: PathBuf::from(row.root_path),
        })
    }
}
