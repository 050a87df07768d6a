mod record;
mod scan_state;

pub(crate) use self::record::RecordRow;
pub(crate) use self::scan_state::ScanStateRow;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use time::OffsetDateTime;

fn path_to_text(path: &Path, field: &'static str) -> Result<String> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData(field))?.to_string())
}

fn to_nanos(timestamp: OffsetDateTime, field: &'static str) -> Result<i64> {
    i64::try_from(timestamp.unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData(field))
}

fn from_nanos(nanos: i64, field: &'static str) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos)).or_raise(|| ErrorKind::InvalidData(field))
}
