//! SQLite record store for the seekfile index.
//!
//! The database is a cache of what is on disk, not the source of truth: if it
//! is deleted, the next full scan rebuilds it. Two tables are kept:
//! - **file_records**: one row per indexed file, keyed by absolute path.
//! - **scan_state**: per-root timestamps of the last full and incremental
//!   scans.
//!
//! [`Repository`] implements [`RecordStore`](seekfile_index::store::RecordStore)
//! so it can be handed straight to an
//! [`Indexer`](seekfile_index::Indexer).

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::repo::Repository;
