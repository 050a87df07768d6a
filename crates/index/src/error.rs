//! Index Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Store implementations living in
//! other crates raise [`ErrorKind::StoreUnavailable`] on top of their own
//! error frames, so the original cause stays visible in the error tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
///
/// ### Construction Errors
/// - [`ErrorKind::NoRoots`]
/// - [`ErrorKind::InvalidRoot`]
///
/// ### Request Errors
/// - [`ErrorKind::InvalidScanMode`]
/// - [`ErrorKind::InvalidCategory`]
/// - [`ErrorKind::ScanInProgress`] - contention signal, not a failure.
///
/// ### Scan Errors (reported through the scan status)
/// - [`ErrorKind::StoreUnavailable`]
/// - [`ErrorKind::WalkSkipped`]
/// - [`ErrorKind::Cancelled`]
/// - [`ErrorKind::ScanAborted`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable root directory was supplied at construction.
    #[display("at least one scan root is required")]
    NoRoots,
    /// A root could not be resolved to an absolute directory.
    #[display("invalid scan root: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    /// The requested scan mode is not recognised.
    #[display("unknown scan mode: {_0:?}")]
    InvalidScanMode(#[error(not(source))] String),
    /// The requested file category is not recognised.
    #[display("unknown category: {_0:?}")]
    InvalidCategory(#[error(not(source))] String),
    /// Another scan is already running; it was neither queued nor replaced.
    #[display("scan already in progress")]
    ScanInProgress,
    /// The record store failed to read or write.
    #[display("record store unavailable")]
    StoreUnavailable,
    /// A directory entry could not be read during a walk and was skipped.
    #[display("skipped unreadable entry: {}", _0.display())]
    WalkSkipped(#[error(not(source))] PathBuf),
    /// The operation observed its cancellation token.
    #[display("scan cancelled")]
    Cancelled,
    /// The scan task could not run to completion: there was no async runtime
    /// to start it on, or it was dropped or panicked mid-pass.
    #[display("scan aborted")]
    ScanAborted,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ScanInProgress | Self::StoreUnavailable | Self::WalkSkipped(_) | Self::ScanAborted
        )
    }
}
