use crate::error::{IndexError, IndexResult};

/// Normalize a repository-relative path into the form used as an index key.
///
/// Separators become `/`, empty and `.` components are dropped, and `..`
/// is rejected so that no key can point outside the working tree.
///
/// ```
/// use merkit_index::normalize_path;
///
/// assert_eq!(normalize_path("./sample//sub/file3.txt").unwrap(), "sample/sub/file3.txt");
/// assert!(normalize_path("../escape.txt").is_err());
/// ```
pub fn normalize_path(path: &str) -> IndexResult<String> {
    let mut parts = Vec::new();
    for component in path.split(['/', '\\']) {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(IndexError::InvalidPath(format!(
                    "{path}: parent components are not allowed"
                )))
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(IndexError::InvalidPath(format!("{path:?}: empty path")));
    }
    Ok(parts.join("/"))
}
