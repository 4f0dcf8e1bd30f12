//! Relative path splitting and normalization.
//!
//! Every public operation addresses nodes by slash-separated paths relative
//! to the volume root. This module is the single place those paths are taken
//! apart: empty and `.` segments collapse, so `"./docs//readme"` and
//! `"docs/readme"` name the same node, and the empty path (or `"."`) names
//! the node the walk starts from.

/// Split a relative path into its segment names.
///
/// Empty segments and `.` segments are dropped, so the empty path and `"."`
/// both yield zero segments.
///
/// # Examples
///
/// ```
/// use shadowfs::path::split_path;
///
/// assert_eq!(split_path("docs/readme"), vec!["docs", "readme"]);
/// assert_eq!(split_path("./docs//readme"), vec!["docs", "readme"]);
/// assert!(split_path(".").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

/// Split a path into its parent directory path and leaf name.
///
/// Returns `None` for paths with no leaf segment (empty or `"."`), which can
/// never name a child to insert or remove.
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let segments = split_path(path);
    let (base, parents) = segments.split_last()?;
    Some((parents.join("/"), (*base).to_string()))
}

/// Join a directory path and a child name into a single relative path.
///
/// The empty directory path stands for the root, so joining under it yields
/// the bare name.
pub fn join(dir: &str, name: &str) -> String {
    if split_path(dir).is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
