//! Coarse file categories that expand to extension allow-lists.

use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::str::FromStr;

/// A named group of file extensions.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    #[display("documents")]
    Documents,
    #[display("images")]
    Images,
    #[display("audio")]
    Audio,
    #[display("video")]
    Video,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Documents, Self::Images, Self::Audio, Self::Video];

    /// Extensions (with leading dot, lowercase) that belong to this category.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Documents => &[".txt", ".md", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".csv"],
            Self::Images => &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".svg", ".webp", ".tiff"],
            Self::Audio => &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a", ".wma"],
            Self::Video => &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m4v"],
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "documents" => Ok(Self::Documents),
            "images" => Ok(Self::Images),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            _ => Err(Error::from(ErrorKind::InvalidCategory(s.to_string()))),
        }
    }
}

/// Resolve user-supplied category names to a sorted, de-duplicated list of
/// extensions.
///
/// A blank name or `all` anywhere in the list disables category filtering
/// altogether (an empty result). Unknown names are ignored.
pub fn resolve_categories<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
    let mut extensions = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("all") {
            return Vec::new();
        }
        if let Ok(category) = name.parse::<Category>() {
            extensions.extend_from_slice(category.extensions());
        }
    }
    extensions.sort_unstable();
    extensions.dedup();
    extensions
}
