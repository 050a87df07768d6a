//! Path normalization.
//!
//! Every path that enters the index is lexically cleaned first so that the
//! same file always maps to the same key, regardless of how the caller
//! spelled it. Normalization never touches the filesystem: symlinks are not
//! resolved and the path does not need to exist.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path.
///
/// - `.` components and repeated or trailing separators are dropped.
/// - `..` removes the previous normal component. At the root of an absolute
///   path it is discarded (`/..` is `/`); at the start of a relative path it
///   is kept.
/// - An empty result becomes `.`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use seekfile_index::normalize_path;
///
/// assert_eq!(normalize_path("/data//docs/./a.txt"), Path::new("/data/docs/a.txt"));
/// assert_eq!(normalize_path("/data/docs/../a.txt"), Path::new("/data/a.txt"));
/// assert_eq!(normalize_path("/../a.txt"), Path::new("/a.txt"));
/// assert_eq!(normalize_path("../a/./b/"), Path::new("../a/b"));
/// ```
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut anchor = PathBuf::new();
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Prefix(_) | Component::RootDir => anchor.push(component.as_os_str()),
            Component::CurDir => {},
            Component::Normal(_) => components.push(component),
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                },
                // Can't climb above the filesystem root.
                _ if anchor.has_root() => {},
                _ => components.push(component),
            },
        }
    }
    let mut normalized = anchor;
    normalized.extend(components.iter().map(|c| c.as_os_str()));
    if normalized.as_os_str().is_empty() {
        normalized.push(Component::CurDir.as_os_str());
    }
    normalized
}

/// Resolves a configured root to an absolute, normalized path.
///
/// Relative roots are resolved against the current working directory.
pub(crate) fn absolute_root(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let absolute = std::path::absolute(path).or_raise(|| ErrorKind::InvalidRoot(path.to_path_buf()))?;
    Ok(normalize(absolute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/data/a.txt", "/data/a.txt")]
    #[case("/data//a.txt", "/data/a.txt")]
    #[case("/data/./a.txt", "/data/a.txt")]
    #[case("/data/docs/", "/data/docs")]
    #[case("/data/docs/../a.txt", "/data/a.txt")]
    #[case("/data/../../a.txt", "/a.txt")]
    #[case("/", "/")]
    #[case("a/b/..", "a")]
    #[case("../a", "../a")]
    #[case("a/../..", "..")]
    #[case("", ".")]
    #[case("./", ".")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), PathBuf::from(expected));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("/data/./x/../y//z.txt");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_absolute_root_resolves_relative() {
        let resolved = absolute_root("some/relative/../dir").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/dir"));
    }
}
