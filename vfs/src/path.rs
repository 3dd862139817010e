//! Path normalization for VFS lookups.

use crate::VfsError;

/// Normalize a VFS path.
///
/// - Replaces backslashes with forward slashes
/// - Collapses redundant separators (`a///b` → `a/b`)
/// - Drops `.` segments
/// - Rejects `..` segments (path traversal not allowed)
/// - Strips leading and trailing slashes
///
/// Returns `Err(VfsError::InvalidPath)` if the path is empty or contains `..`.
pub fn normalize(path: &str) -> Result<String, VfsError> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(VfsError::InvalidPath(format!(
                    "path traversal (..) not allowed in {path:?}"
                )));
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(VfsError::InvalidPath(format!("empty path {path:?}")));
    }

    Ok(segments.join("/"))
}

/// Split a normalized path into source name and remainder.
///
/// If there is only one segment, the remainder is empty.
pub(crate) fn split_source(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

/// Lower-cased extension of the last path segment, if any.
///
/// `"shaders/triangle.vert.SPV"` yields `Some("spv")`.
pub fn extension(path: &str) -> Option<String> {
    let file_name = path.rsplit(['/', '\\']).next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::simple("shaders/vert.spv", "shaders/vert.spv")]
    #[case::leading_slash("/shaders/vert.spv", "shaders/vert.spv")]
    #[case::trailing_slash("shaders/", "shaders")]
    #[case::redundant_slashes("shaders///bin//vert.spv", "shaders/bin/vert.spv")]
    #[case::dot_segments("./shaders/./vert.spv", "shaders/vert.spv")]
    #[case::backslashes("shaders\\bin\\vert.spv", "shaders/bin/vert.spv")]
    #[case::single_segment("vert.spv", "vert.spv")]
    fn normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).unwrap(), expected);
    }

    #[rstest]
    #[case::dotdot("shaders/../secret")]
    #[case::empty("")]
    #[case::only_slashes("///")]
    #[case::only_dots("./.")]
    fn rejects(#[case] raw: &str) {
        assert!(matches!(normalize(raw), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn split_source_with_rest() {
        assert_eq!(split_source("bin/shaders/vert.spv"), ("bin", "shaders/vert.spv"));
    }

    #[test]
    fn split_source_no_rest() {
        assert_eq!(split_source("bin"), ("bin", ""));
    }

    #[rstest]
    #[case("bin/vert.spv", Some("spv"))]
    #[case("triangle.vert.WGSL", Some("wgsl"))]
    #[case("bin\\frag.spv", Some("spv"))]
    #[case("Makefile", None)]
    #[case(".hidden", None)]
    #[case("dir.d/file", None)]
    fn extension_of(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(extension(path).as_deref(), expected);
    }
}
