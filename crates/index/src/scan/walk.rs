use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use time::OffsetDateTime;
use tokio::fs;

pub(crate) type WalkStream = Pin<Box<dyn Stream<Item = Result<WalkedFile>> + Send>>;

/// A regular file found by [`walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WalkedFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: OffsetDateTime,
}

impl WalkedFile {
    fn from_metadata(path: PathBuf, metadata: &Metadata) -> Result<Self> {
        let modified = metadata.modified().or_raise(|| ErrorKind::WalkSkipped(path.clone()))?;
        Ok(Self {
            size: metadata.len(),
            modified: OffsetDateTime::from(modified),
            path,
        })
    }
}

enum WalkEntry {
    File(WalkedFile),
    Descend(PathBuf),
    Skip,
}

async fn process_entry(entry: fs::DirEntry) -> Result<WalkEntry> {
    let path = entry.path();
    // Records are keyed and stored by UTF-8 path.
    if path.to_str().is_none() {
        exn::bail!(ErrorKind::WalkSkipped(path));
    }
    // Does not follow symlinks.
    let metadata = entry.metadata().await.or_raise(|| ErrorKind::WalkSkipped(path.clone()))?;
    if metadata.is_dir() {
        return Ok(WalkEntry::Descend(path));
    }
    if metadata.is_file() {
        return Ok(WalkEntry::File(WalkedFile::from_metadata(path, &metadata)?));
    }
    // Symlinks, sockets, devices, FIFOs.
    Ok(WalkEntry::Skip)
}

/// Depth-first walk yielding every regular file below `root`.
///
/// Entries that cannot be read, or whose path is not valid UTF-8, are yielded
/// as [`WalkSkipped`](ErrorKind::WalkSkipped) and the walk carries on. A
/// directory that no longer exists (including `root` itself) is silently
/// treated as empty.
pub(crate) fn walk(root: &Path) -> WalkStream {
    let mut stack = vec![root.to_path_buf()];
    Box::pin(stream! {
        'dirs: while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    yield Err::<WalkedFile, _>(err).or_raise(|| ErrorKind::WalkSkipped(current.clone()));
                    continue 'dirs;
                },
            };
            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    // Iteration cannot resume after a failed read.
                    Err(err) => {
                        yield Err::<WalkedFile, _>(err).or_raise(|| ErrorKind::WalkSkipped(current.clone()));
                        continue 'dirs;
                    },
                };
                match process_entry(entry).await {
                    Ok(WalkEntry::File(file)) => yield Ok(file),
                    Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(err) => yield Err(err),
                }
            }
        }
    })
}
