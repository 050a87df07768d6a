//! In-memory file metadata index.
//!
//! An [`Indexer`] keeps a searchable map of every regular file under a set
//! of root directories. Scans (full or incremental) run in the background,
//! one at a time, and write every change through to a pluggable
//! [`RecordStore`](store::RecordStore) so the index can be restored on the
//! next start with [`Indexer::load_from_store`].
//!
//! ```no_run
//! use seekfile_index::{Indexer, Query, ScanMode, SortField};
//! use seekfile_index::store::StoreHandle;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn largest_text_file(store: StoreHandle) -> seekfile_index::error::Result<()> {
//!     let indexer = Indexer::new(["/data"], store)?;
//!     indexer.load_from_store().await?;
//!     let token = CancellationToken::new();
//!     indexer.start_scan(&token, ScanMode::Incremental)?;
//!     indexer.wait_idle().await;
//!
//!     let query = Query::new().extension("txt").sort(SortField::Size).descending(true).limit(1);
//!     let result = indexer.search(&token, &query);
//!     println!("{} matches, largest: {:?}", result.total, result.files.first());
//!     Ok(())
//! }
//! ```

pub mod error;
mod index;
mod indexer;
mod path;
pub mod query;
mod record;
mod scan;
pub mod store;

pub use crate::indexer::Indexer;
pub use crate::path::normalize as normalize_path;
pub use crate::query::{Category, Query, SearchResult, SortField};
pub use crate::record::{FileRecord, ScanState};
pub use crate::scan::{ScanMode, ScanStatus};
