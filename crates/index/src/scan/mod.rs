//! Scan modes, directory walking, status tracking and scan execution.

mod run;
mod status;
mod walk;

pub(crate) use self::run::ScanPass;
pub use self::status::ScanStatus;
pub(crate) use self::status::StatusTracker;
use crate::error::{Error, ErrorKind};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a scan treats files that are already indexed.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Skip files whose size and modification time are unchanged.
    #[default]
    #[display("incremental")]
    Incremental,
    /// Rewrite every file found.
    #[display("full")]
    Full,
}

impl FromStr for ScanMode {
    type Err = Error;

    /// An empty string selects [`ScanMode::Incremental`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "incremental" => Ok(Self::Incremental),
            "full" => Ok(Self::Full),
            _ => Err(Error::from(ErrorKind::InvalidScanMode(s.to_string()))),
        }
    }
}
